//! # CLI Interface
//!
//! Defines the command-line argument structure for the `tally` binary using
//! `clap` derive. Supports two subcommands: `demo` and `version`.

use clap::{Parser, Subcommand};

/// Tally friends ledger client.
///
/// A terminal front end for the Tally client library. The `demo` subcommand
/// drives a full scripted session — connect, resolve roles, deposit, record
/// and pay debts, transfer, withdraw, disconnect — against an in-process
/// ledger, so the whole lifecycle can be watched without a remote ledger.
#[derive(Parser, Debug)]
#[command(
    name = "tally",
    about = "Tally friends ledger client",
    version,
    propagate_version = true
)]
pub struct TallyCli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level subcommands for the tally binary.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a scripted end-to-end session against an in-process ledger.
    Demo(DemoArgs),
    /// Print version information and exit.
    Version,
}

/// Arguments for the `demo` subcommand.
#[derive(Parser, Debug)]
pub struct DemoArgs {
    /// Address that owns the demo ledger and connects first.
    #[arg(
        long,
        env = "TALLY_OWNER",
        default_value = "0xa11ce00000000000000000000000000000000001"
    )]
    pub owner: String,

    /// Address registered as the second member of the group.
    #[arg(
        long,
        env = "TALLY_FRIEND",
        default_value = "0xb0b0000000000000000000000000000000000002"
    )]
    pub friend: String,

    /// Emit logs as JSON lines instead of human-readable output.
    #[arg(long)]
    pub json_logs: bool,
}
