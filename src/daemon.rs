//! The long-running digest loop.
//!
//! Every `max_age_minutes` the daemon runs one cycle over the tracked users
//! and delivers whatever is new. Administrative commands arrive over a
//! channel; changing the age restarts the loop, abandoning a cycle that is
//! still collecting. A delivery already under way always finishes first.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Local;
use tokio::sync::{mpsc, oneshot};

use crate::app::Result;
use crate::config::UserList;
use crate::digest::{Digest, Pipeline};
use crate::transport::Transport;

/// A command and the channel its reply goes back on.
pub type Request = (Command, oneshot::Sender<String>);

/// Daemon configuration
#[derive(Debug, Clone)]
pub struct DaemonConfig {
    /// Window size and polling period, in minutes
    pub max_age_minutes: u64,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            max_age_minutes: 60,
        }
    }
}

impl DaemonConfig {
    /// Parse an age like "1h", "30m", "1d" or a bare number of minutes
    pub fn parse_age(s: &str) -> std::result::Result<u64, String> {
        let s = s.trim().to_lowercase();

        let minutes = if let Some(hours) = s.strip_suffix('h') {
            hours
                .parse::<u64>()
                .map(|h| h * 60)
                .map_err(|_| format!("Invalid hours: {}", hours))
        } else if let Some(minutes) = s.strip_suffix('m') {
            minutes
                .parse::<u64>()
                .map_err(|_| format!("Invalid minutes: {}", minutes))
        } else if let Some(days) = s.strip_suffix('d') {
            days.parse::<u64>()
                .map(|d| d * 1440)
                .map_err(|_| format!("Invalid days: {}", days))
        } else {
            s.parse::<u64>()
                .map_err(|_| format!("Invalid age: {}. Use format like '1h', '30m', '1d'", s))
        }?;

        if minutes == 0 {
            return Err("Age must be at least one minute".to_string());
        }
        Ok(minutes)
    }

    /// Format an age for display
    pub fn format_age(minutes: u64) -> String {
        if minutes >= 1440 && minutes.is_multiple_of(1440) {
            format!("{}d", minutes / 1440)
        } else if minutes >= 60 && minutes.is_multiple_of(60) {
            format!("{}h", minutes / 60)
        } else {
            format!("{}m", minutes)
        }
    }
}

/// Administrative commands, one per text line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `>add <name>`
    Add(String),
    /// `>remove <name>`
    Remove(String),
    /// `>age <minutes>`
    SetAge(u64),
    /// `ping`
    Ping,
}

impl Command {
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.trim();
        if line == "ping" {
            return Some(Command::Ping);
        }

        let (verb, rest) = line.split_once(char::is_whitespace)?;
        let arg = rest.split_whitespace().next()?;
        match verb {
            ">add" => Some(Command::Add(arg.to_string())),
            ">remove" => Some(Command::Remove(arg.to_string())),
            ">age" => arg.parse().ok().map(Command::SetAge),
            _ => None,
        }
    }
}

/// Daemon runner
pub struct Daemon {
    pipeline: Pipeline,
    transport: Arc<dyn Transport>,
    users: UserList,
    config: DaemonConfig,
}

impl Daemon {
    pub fn new(
        pipeline: Pipeline,
        transport: Arc<dyn Transport>,
        users: UserList,
        config: DaemonConfig,
    ) -> Self {
        Self {
            pipeline,
            transport,
            users,
            config,
        }
    }

    /// Run one cycle and deliver it. Returns what was delivered.
    pub async fn run_once(&self) -> Result<Digest> {
        let digest = self
            .pipeline
            .run_cycle(self.users.users().to_vec(), self.config.max_age_minutes)
            .await;
        if !digest.is_empty() {
            self.transport.deliver(&digest).await?;
        }
        Ok(digest)
    }

    /// Run until Ctrl-C or SIGTERM.
    pub async fn run(self, commands: mpsc::Receiver<Request>) {
        self.run_until(commands, shutdown_signal()).await
    }

    /// Run until `shutdown` resolves or is observed between steps.
    ///
    /// Collecting a digest can be interrupted by `>age`; delivering it
    /// cannot, so a restart never leaves half a digest in the chat.
    pub async fn run_until<F>(self, commands: mpsc::Receiver<Request>, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        let Daemon {
            pipeline,
            transport,
            users,
            config,
        } = self;
        let mut control = Control {
            commands,
            commands_open: true,
            users,
            age: config.max_age_minutes,
        };

        tokio::pin!(shutdown);

        tracing::info!(
            "reeldigest daemon started (age: {}, {} users)",
            DaemonConfig::format_age(control.age),
            control.users.users().len()
        );

        'cycles: loop {
            let started = Instant::now();
            let snapshot = control.users.users().to_vec();
            let age = control.age;

            let collect = collect_cycle(&pipeline, snapshot, age);
            let digest = match control.race(collect, shutdown.as_mut()).await {
                Step::Done(digest) => digest,
                Step::Restart => continue 'cycles,
                Step::Shutdown => break 'cycles,
            };

            if let Some(digest) = digest {
                deliver(transport.as_ref(), &digest).await;
            }
            tracing::info!(
                "{} cycle finished in {:.1}s",
                Local::now().format("%H:%M:%S"),
                started.elapsed().as_secs_f64()
            );

            let period = Duration::from_secs(age.saturating_mul(60));
            match control.race(tokio::time::sleep(period), shutdown.as_mut()).await {
                Step::Done(()) | Step::Restart => continue 'cycles,
                Step::Shutdown => break 'cycles,
            }
        }

        tracing::info!("Daemon shutting down...");
    }
}

/// How a raced step ended.
enum Step<T> {
    Done(T),
    Restart,
    Shutdown,
}

/// State the command handler mutates between cycles.
struct Control {
    commands: mpsc::Receiver<Request>,
    commands_open: bool,
    users: UserList,
    age: u64,
}

impl Control {
    /// Drive `work` while answering commands, until it finishes, a command
    /// asks for a restart, or `shutdown` fires.
    async fn race<T, W, F>(&mut self, work: W, mut shutdown: Pin<&mut F>) -> Step<T>
    where
        W: Future<Output = T>,
        F: Future<Output = ()>,
    {
        tokio::pin!(work);

        loop {
            tokio::select! {
                output = &mut work => return Step::Done(output),
                request = self.commands.recv(), if self.commands_open => {
                    let Some((command, reply)) = request else {
                        self.commands_open = false;
                        continue;
                    };
                    let outcome = handle(command, &mut self.users, &mut self.age);
                    let _ = reply.send(outcome.reply);
                    if outcome.restart {
                        tracing::info!("Restarting with age {}", DaemonConfig::format_age(self.age));
                        return Step::Restart;
                    }
                }
                _ = &mut shutdown => return Step::Shutdown,
            }
        }
    }
}

struct Outcome {
    reply: String,
    restart: bool,
}

impl Outcome {
    fn reply(reply: String) -> Self {
        Self {
            reply,
            restart: false,
        }
    }
}

fn handle(command: Command, users: &mut UserList, age: &mut u64) -> Outcome {
    match command {
        Command::Ping => Outcome::reply("pong".to_string()),
        Command::Add(name) => Outcome::reply(match users.add(&name) {
            Ok(true) => format!("Added {}", name),
            Ok(false) => format!("{} is already tracked", name),
            Err(e) => e.to_string(),
        }),
        Command::Remove(name) => Outcome::reply(match users.remove(&name) {
            Ok(true) => format!("Removed {}", name),
            Ok(false) => format!("{} is not tracked", name),
            Err(e) => e.to_string(),
        }),
        Command::SetAge(0) => Outcome::reply("Age must be at least one minute".to_string()),
        Command::SetAge(minutes) => {
            *age = minutes;
            Outcome {
                reply: format!("Age set to {}", DaemonConfig::format_age(minutes)),
                restart: true,
            }
        }
    }
}

async fn collect_cycle(pipeline: &Pipeline, users: Vec<String>, age: u64) -> Option<Digest> {
    if users.is_empty() {
        tracing::info!("No users to check");
        return None;
    }

    let digest = pipeline.run_cycle(users, age).await;
    (!digest.is_empty()).then_some(digest)
}

async fn deliver(transport: &dyn Transport, digest: &Digest) {
    if let Err(e) = transport.deliver(digest).await {
        tracing::error!("Delivery failed: {}", e);
    }
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = sigterm.recv() => {},
                    _ = tokio::signal::ctrl_c() => {},
                }
                return;
            }
            Err(e) => tracing::warn!("Failed to set up SIGTERM handler: {}", e),
        }
    }

    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
}
