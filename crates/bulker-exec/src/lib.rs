//! Process execution for bulker: per-tool strategies that stage input and
//! build argv, and a supervised child process that relays its output lines.
mod error;
pub use error::{ExecError, ExecResult};

mod util;

pub mod proc;
pub use proc::{LineSink, ProcExit, SpawnedProc};

pub mod strategy;
pub use strategy::{
    FileOutputStrategy, InlineStrategy, InputHandle, StagedStrategy, StagingArea, ToolStrategy,
};

pub mod router;
pub use router::{BuildContext, InlineBuilder, StagedBuilder, StrategyBuilder, StrategyRouter};

pub mod prelude {
    pub use crate::error::{ExecError, ExecResult};
    pub use crate::{
        FileOutputStrategy, InputHandle, LineSink, SpawnedProc, StagingArea, StrategyRouter,
        ToolStrategy,
    };
}
