// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Tally Terminal Client
//!
//! Entry point for the `tally` binary. Parses CLI arguments, initializes
//! logging, and runs the selected subcommand.
//!
//! The binary supports two subcommands:
//!
//! - `demo`    — drive a full scripted session against an in-process ledger
//! - `version` — print build version information

mod cli;
mod logging;

use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;

use tally_client::{
    Address, Client, MemoryLedger, StaticProvider, View, WriteDraft,
};

use cli::{Commands, DemoArgs, TallyCli};
use logging::LogFormat;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = TallyCli::parse();

    match cli.command {
        Commands::Demo(args) => run_demo(args).await,
        Commands::Version => {
            print_version();
            Ok(())
        }
    }
}

/// Runs the scripted demo session: connect as the owner, build up the
/// group, move some value around, show a failure, and disconnect.
async fn run_demo(args: DemoArgs) -> Result<()> {
    let format = if args.json_logs {
        LogFormat::Json
    } else {
        LogFormat::Pretty
    };
    logging::init_logging("tally=info,tally_client=info", format);

    let owner = Address::parse(&args.owner).context("invalid --owner address")?;
    let friend = Address::parse(&args.friend).context("invalid --friend address")?;
    anyhow::ensure!(owner != friend, "--owner and --friend must be different addresses");

    tracing::info!(owner = %owner.short(), friend = %friend.short(), "starting demo ledger");

    let client = Client::new(Arc::new(StaticProvider::new(
        owner.clone(),
        MemoryLedger::new(owner.clone()),
    )));

    client
        .connect()
        .await
        .context("connecting to the identity provider")?;
    report_view(&client, "after connect");

    // A fresh ledger has an owner but no members — not even the owner.
    // Registration is itself a privileged write.
    submit(
        &client,
        "register the owner as a member",
        WriteDraft::AddMember {
            member: owner.to_string(),
        },
    )
    .await;
    report_view(&client, "after self-registration");

    submit(
        &client,
        "add the friend",
        WriteDraft::AddMember {
            member: friend.to_string(),
        },
    )
    .await;

    submit(
        &client,
        "deposit 1.5",
        WriteDraft::Deposit {
            amount: "1.5".into(),
        },
    )
    .await;

    submit(
        &client,
        "record a 0.25 debt owed by the friend",
        WriteDraft::RecordDebt {
            debtor: friend.to_string(),
            amount: "0.25".into(),
        },
    )
    .await;

    submit(
        &client,
        "transfer 0.5 to the friend",
        WriteDraft::Transfer {
            to: friend.to_string(),
            amount: "0.5".into(),
        },
    )
    .await;

    submit(
        &client,
        "withdraw 0.2",
        WriteDraft::Withdraw {
            amount: "0.2".into(),
        },
    )
    .await;

    // An overdraw, to show the revert surface. The operation fails, the
    // parameters stay put, and the displayed balance is untouched.
    submit(
        &client,
        "withdraw 100 (expected to revert)",
        WriteDraft::Withdraw {
            amount: "100".into(),
        },
    )
    .await;

    let (friend_balance, friend_is_member) = client
        .balance_and_status(&friend)
        .await
        .context("reading the friend's balance and status")?;

    let snapshot = client
        .snapshot()
        .context("no role snapshot published at end of demo")?;

    println!("Demo session complete.");
    println!("  Owner          : {}", owner);
    println!("  Owner balance  : {} ETH", snapshot.balance);
    println!(
        "  Friend         : {} (member: {})",
        friend, friend_is_member
    );
    println!("  Friend balance : {} ETH", friend_balance);
    println!("  Members        : {}", snapshot.members.len());
    for member in &snapshot.members {
        println!("    - {}", member);
    }

    client.disconnect();
    tracing::info!("demo session disconnected");
    Ok(())
}

/// Submits one draft and logs the outcome. Failures are part of the show,
/// not fatal.
async fn submit(client: &Client, what: &str, draft: WriteDraft) {
    match client.submit(&draft).await {
        Ok(outcome) => tracing::info!(step = what, ?outcome, "write finished"),
        Err(err) => tracing::warn!(step = what, error = %err, "write failed"),
    }
}

/// Logs the current view so the gate's decisions are visible as the demo
/// progresses.
fn report_view(client: &Client, when: &str) {
    let view = client.view();
    let label = match view {
        View::Unauthenticated => "unauthenticated",
        View::Resolving => "resolving",
        View::Unauthorized => "unauthorized",
        View::Authorized {
            can_manage_members: true,
        } => "authorized (owner)",
        View::Authorized {
            can_manage_members: false,
        } => "authorized",
    };
    tracing::info!(when, view = label, "access gate");
}

/// Prints version information to stdout.
fn print_version() {
    println!("tally {}", env!("CARGO_PKG_VERSION"));
}
