mod run;
pub use run::{DEFAULT_GRACE_PERIOD, DEFAULT_POLL_INTERVAL, InputSource, RunConfig};
