use tokio::sync::broadcast;
use tracing::debug;

/// Broadcasts paths whose cached listings are stale after a mutation.
#[derive(Clone)]
pub struct Revalidator {
    tx: broadcast::Sender<String>,
}

impl Default for Revalidator {
    fn default() -> Self {
        let (tx, _rx) = broadcast::channel(64);
        Self { tx }
    }
}

impl Revalidator {
    pub fn subscribe(&self) -> broadcast::Receiver<String> {
        self.tx.subscribe()
    }

    /// Fire-and-forget; nobody listening is not an error.
    pub fn revalidate(&self, path: &str) {
        let listeners = self.tx.send(path.to_owned()).unwrap_or(0);
        debug!(path, listeners, "revalidate");
    }
}
