//! Domain types shared by every bulker crate: tasks and their lifecycle,
//! tool definitions with command templates, run configuration and the
//! end-of-run report.
mod error;
pub use error::{ModelError, TemplateError};

mod domain;
pub use domain::*;

mod kind;
pub use kind::*;

mod config;
pub use config::*;
