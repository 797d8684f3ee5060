use std::sync::Arc;

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

/// Control handle for a running stream. Clones share state.
#[derive(Debug, Clone)]
pub struct StreamHandle {
    cancel: CancellationToken,
    paused: Arc<watch::Sender<bool>>,
}

impl StreamHandle {
    pub(crate) fn new(cancel: CancellationToken) -> Self {
        let (paused, _) = watch::channel(false);
        Self {
            cancel,
            paused: Arc::new(paused),
        }
    }

    /// Stop the stream for good.
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    /// Hold back delivery. Packets keep buffering in the transport channel.
    pub fn pause(&self) {
        self.paused.send_replace(true);
    }

    pub fn resume(&self) {
        self.paused.send_replace(false);
    }

    pub fn is_paused(&self) -> bool {
        *self.paused.borrow()
    }

    pub fn is_stopped(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Resolves once the stream is stopped.
    pub async fn stopped(&self) {
        self.cancel.cancelled().await;
    }

    /// Wait until not paused. `false` if the stream stopped meanwhile.
    pub(crate) async fn wait_resumed(&self) -> bool {
        let mut paused = self.paused.subscribe();
        loop {
            if self.cancel.is_cancelled() {
                return false;
            }
            if !*paused.borrow_and_update() {
                return true;
            }
            tokio::select! {
                () = self.cancel.cancelled() => return false,
                changed = paused.changed() => {
                    if changed.is_err() {
                        return false;
                    }
                }
            }
        }
    }
}
