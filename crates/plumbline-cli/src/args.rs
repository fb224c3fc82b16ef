//! Command-line argument definitions for the Plumbline CLI.
//!
//! This module defines the [`Args`] structure parsed from the command line
//! using [`clap`]. Global options select the configuration file and logging
//! verbosity; the subcommand selects what to do.

use clap::{Parser, Subcommand, ValueEnum};

/// Command-line arguments for the Plumbline audit tool
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to configuration file (TOML)
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Log level (off, error, warn, info, debug, trace)
    #[arg(long, default_value = "info", global = true)]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Check diagram specifications against application code
    Check {
        /// Python file with the application classes
        code: String,

        /// One or more diagram specifications; their union is checked
        #[arg(required = true)]
        diagrams: Vec<String>,

        /// Fail instead of continuing when a file cannot be parsed
        #[arg(long)]
        strict: bool,

        /// Report format
        #[arg(long, value_enum, default_value_t = ReportFormat::Text)]
        format: ReportFormat,
    },

    /// Generate a diagram specification from application code
    Scaffold {
        /// Python file with the application classes
        code: String,

        /// Path of the generated specification
        #[arg(short, long, default_value = "diagram.py")]
        output: String,

        /// Diagram title, defaults to the code file name
        #[arg(long)]
        title: Option<String>,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ReportFormat {
    #[default]
    Text,
    #[cfg(feature = "json")]
    Json,
}
