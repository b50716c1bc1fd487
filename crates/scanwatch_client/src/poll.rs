use std::future::Future;
use std::sync::mpsc;
use std::time::Duration;

use scan_logging::scan_trace;
use tokio_util::sync::CancellationToken;

use crate::ClientEvent;

/// Runtime half of the poll loop: arms one-shot timers that report
/// [`ClientEvent::PollDue`]. Cancelling invalidates every timer armed so far.
#[derive(Debug)]
pub struct PollTimer {
    interval: Duration,
    token: CancellationToken,
}

impl PollTimer {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            token: CancellationToken::new(),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn cancel(&mut self) {
        self.token.cancel();
        self.token = CancellationToken::new();
    }

    /// Returns a future that sleeps for the interval and then reports the
    /// tick, unless the timer is cancelled first.
    pub fn arm(
        &self,
        scan_id: String,
        generation: u64,
        events: mpsc::Sender<ClientEvent>,
    ) -> impl Future<Output = ()> + Send + 'static {
        let token = self.token.clone();
        let interval = self.interval;
        async move {
            tokio::select! {
                _ = token.cancelled() => {
                    scan_trace!("Poll timer for {} (generation {}) cancelled", scan_id, generation);
                }
                _ = tokio::time::sleep(interval) => {
                    let _ = events.send(ClientEvent::PollDue { scan_id, generation });
                }
            }
        }
    }
}
