//! Command-line interface for parentbridge.
//!
//! This module provides the CLI structure for the `pbnotify` binary.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use commands::{
    CheckCommand, ConfigCommand, InboxCommand, NotifyCommand, PrefsCommand, ReadCommand,
    SetPrefsCommand, StatusCommand, Switch,
};

/// pbnotify - Decide and deliver `ParentBridge` notifications
///
/// Manages per-user notification preferences, evaluates whether a
/// notification should fire right now, and keeps a log of delivered
/// notifications.
#[derive(Debug, Parser)]
#[command(name = "pbnotify")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to custom configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// The command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// View or change notification preferences
    #[command(subcommand)]
    Prefs(PrefsCommand),

    /// Check whether a notification would be delivered
    Check(CheckCommand),

    /// Send a notification through the delivery policy
    Notify(NotifyCommand),

    /// List a user's notifications
    Inbox(InboxCommand),

    /// Mark a notification as read
    Read(ReadCommand),

    /// Delete notifications older than the retention period
    Prune,

    /// Show storage status
    Status(StatusCommand),

    /// View or validate configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

impl Cli {
    /// Get the verbosity level based on flags.
    #[must_use]
    pub fn verbosity(&self) -> crate::logging::Verbosity {
        if self.quiet {
            crate::logging::Verbosity::Quiet
        } else {
            match self.verbose {
                0 => crate::logging::Verbosity::Normal,
                1 => crate::logging::Verbosity::Verbose,
                _ => crate::logging::Verbosity::Trace,
            }
        }
    }
}
