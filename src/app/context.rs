use std::path::Path;
use std::sync::Arc;

use crate::app::error::Result;
use crate::config::{Config, UserList};
use crate::daemon::{Daemon, DaemonConfig};
use crate::digest::Pipeline;
use crate::fetcher::http_fetcher::HttpFetcher;
use crate::fetcher::parallel::ParallelFetcher;
use crate::fetcher::Fetcher;
use crate::transport::{ConsoleTransport, TelegramTransport, Transport};

/// Everything built from the configuration, shared by all commands.
pub struct AppContext {
    pub config: Config,
    pub http: Arc<HttpFetcher>,
    pub parallel_fetcher: Arc<ParallelFetcher>,
}

impl AppContext {
    pub fn new(config_path: Option<&Path>) -> Result<Self> {
        Self::with_config(Config::load(config_path)?)
    }

    pub fn with_config(config: Config) -> Result<Self> {
        let http = Arc::new(HttpFetcher::new(&config.fetch)?);
        let fetcher: Arc<dyn Fetcher + Send + Sync> = http.clone();
        let parallel_fetcher = Arc::new(ParallelFetcher::with_connections(
            fetcher,
            &config.fetch.host,
            config.fetch.max_connections,
        ));

        Ok(Self {
            config,
            http,
            parallel_fetcher,
        })
    }

    pub fn users(&self) -> Result<UserList> {
        Ok(UserList::load(&self.config.users_path()?)?)
    }

    pub fn pipeline(&self) -> Pipeline {
        Pipeline::new(self.parallel_fetcher.clone(), self.config.digest.message_limit)
    }

    /// Console output for dry runs, the Telegram bot otherwise.
    pub fn transport(&self, dry_run: bool) -> Result<Arc<dyn Transport>> {
        if dry_run {
            return Ok(Arc::new(ConsoleTransport));
        }
        let telegram = TelegramTransport::new(&self.config.telegram, self.http.client().clone())?;
        Ok(Arc::new(telegram))
    }

    pub fn daemon(&self, max_age_minutes: Option<u64>, dry_run: bool) -> Result<Daemon> {
        let config = DaemonConfig {
            max_age_minutes: max_age_minutes.unwrap_or(self.config.digest.max_age_minutes),
        };
        Ok(Daemon::new(
            self.pipeline(),
            self.transport(dry_run)?,
            self.users()?,
            config,
        ))
    }
}
