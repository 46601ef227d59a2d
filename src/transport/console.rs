use async_trait::async_trait;

use crate::app::Result;
use crate::digest::Digest;
use crate::transport::Transport;

/// Prints digests to stdout instead of sending them. Used for dry runs.
pub struct ConsoleTransport;

impl ConsoleTransport {
    pub fn render(digest: &Digest) -> String {
        let mut out = Vec::with_capacity(digest.chunks.len() + digest.memes.len());
        for (i, chunk) in digest.chunks.iter().enumerate() {
            out.push(format!("--- message {} ---\n{}", i + 1, chunk));
        }
        for meme in &digest.memes {
            out.push(format!(
                "--- meme: {} rated {} by {} ({} bytes) ---",
                meme.candidate.title,
                meme.candidate.rating,
                meme.candidate.member,
                meme.image.len()
            ));
        }
        out.join("\n")
    }
}

#[async_trait]
impl Transport for ConsoleTransport {
    async fn deliver(&self, digest: &Digest) -> Result<()> {
        println!("{}", Self::render(digest));
        Ok(())
    }
}
