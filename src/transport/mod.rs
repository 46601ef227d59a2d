//! Where finished digests go.

pub mod console;
pub mod telegram;

pub use console::ConsoleTransport;
pub use telegram::TelegramTransport;

use async_trait::async_trait;

use crate::app::Result;
use crate::digest::Digest;

#[async_trait]
pub trait Transport: Send + Sync {
    /// Send every chunk in order, then the meme pictures.
    async fn deliver(&self, digest: &Digest) -> Result<()>;
}
