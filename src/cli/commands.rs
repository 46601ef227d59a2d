use std::io::BufRead;

use tokio::sync::{mpsc, oneshot};

use crate::app::{AppContext, DigestError, Result};
use crate::daemon::{Command, DaemonConfig, Request};

fn parse_age(age: Option<&str>) -> Result<Option<u64>> {
    age.map(DaemonConfig::parse_age)
        .transpose()
        .map_err(DigestError::Config)
}

pub async fn run(ctx: &AppContext, age: Option<&str>, dry_run: bool) -> Result<()> {
    let daemon = ctx.daemon(parse_age(age)?, dry_run)?;

    let (tx, rx) = mpsc::channel(16);
    // A plain thread, so a pending stdin read never holds up shutdown.
    std::thread::spawn(move || read_commands(tx));

    daemon.run(rx).await;
    Ok(())
}

pub async fn once(ctx: &AppContext, age: Option<&str>, dry_run: bool) -> Result<()> {
    let daemon = ctx.daemon(parse_age(age)?, dry_run)?;
    let digest = daemon.run_once().await?;

    if digest.is_empty() {
        println!("Nothing new");
    }
    Ok(())
}

/// Feed stdin lines to the daemon as commands and print the replies.
fn read_commands(tx: mpsc::Sender<Request>) {
    for line in std::io::stdin().lock().lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                tracing::warn!("Failed to read command: {}", e);
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        let Some(command) = Command::parse(&line) else {
            eprintln!("Unknown command: {}", line.trim());
            continue;
        };

        let (reply_tx, reply_rx) = oneshot::channel();
        if tx.blocking_send((command, reply_tx)).is_err() {
            break;
        }
        if let Ok(reply) = reply_rx.blocking_recv() {
            println!("{}", reply);
        }
    }
}

pub fn list_users(ctx: &AppContext) -> Result<()> {
    let users = ctx.users()?;

    if users.users().is_empty() {
        println!("No users");
        return Ok(());
    }

    for user in users.users() {
        println!("{}", user);
    }
    Ok(())
}

pub fn add_user(ctx: &AppContext, name: &str) -> Result<()> {
    let mut users = ctx.users()?;
    if users.add(name)? {
        println!("Added user: {}", name);
    } else {
        println!("User already tracked: {}", name);
    }
    Ok(())
}

pub fn remove_user(ctx: &AppContext, name: &str) -> Result<()> {
    let mut users = ctx.users()?;
    if users.remove(name)? {
        println!("Removed user: {}", name);
    } else {
        println!("User not tracked: {}", name);
    }
    Ok(())
}
