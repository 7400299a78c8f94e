//! Command-line interface for fixloop.
//!
//! Provides the `run` command (one fix-and-verify cycle) and the
//! `metrics` command (artifact aggregation into result.json).

mod commands;

pub use commands::{parse_cli, run, run_with_cli, Cli, Commands};
