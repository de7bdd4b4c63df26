pub mod commands;
pub mod handlers;
pub mod output;

pub use commands::{CliArgs, Commands, OutputFormatArg, PlanArgs, RunArgs, TagArgs};
pub use output::{OutputFormat, OutputFormatter};
