//! Process-level helpers shared by the binary and integration tests

pub mod logging;

pub use logging::{init_logging, LoggingConfig};
