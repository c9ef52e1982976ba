//! Publish sink
//!
//! Where replayed payloads go. The transport is supplied by the caller.

use std::io;

/// Receives every record that passes the channel filters during playback
pub trait PublishSink: Send + Sync {
    /// Publish `payload` on `channel`
    fn publish(&self, channel: &str, payload: &[u8]) -> io::Result<()>;
}

impl<F> PublishSink for F
where
    F: Fn(&str, &[u8]) -> io::Result<()> + Send + Sync,
{
    fn publish(&self, channel: &str, payload: &[u8]) -> io::Result<()> {
        self(channel, payload)
    }
}

/// Sink that only logs what would have been published
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl PublishSink for TracingSink {
    fn publish(&self, channel: &str, payload: &[u8]) -> io::Result<()> {
        tracing::trace!(channel, bytes = payload.len(), "publish");
        Ok(())
    }
}
