use dashmap::DashMap;
use std::{sync::Arc, time::Duration};
use tokio::time::{Instant, sleep};
use tracing::debug;

/// Fixed-window request counter per host. Callers over budget wait for the
/// next window instead of being rejected.
#[derive(Debug, Clone)]
pub struct Throttle {
    windows: Arc<DashMap<String, Window>>,
    max_requests: u32,
    window: Duration,
}

#[derive(Debug, Clone, Copy)]
struct Window {
    count: u32,
    started: Instant,
}

impl Throttle {
    /// `max_requests == 0` disables throttling.
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            windows: Arc::new(DashMap::new()),
            max_requests,
            window,
        }
    }

    pub fn per_minute(max_requests: u32) -> Self {
        Self::new(max_requests, Duration::from_secs(60))
    }

    /// Wait until a request to `host` fits in the budget, then count it.
    pub async fn acquire(&self, host: &str) {
        if self.max_requests == 0 {
            return;
        }

        loop {
            // the shard guard must be dropped before sleeping
            let wait = {
                let now = Instant::now();
                let mut entry = self.windows.entry(host.to_string()).or_insert(Window {
                    count: 0,
                    started: now,
                });
                let window = entry.value_mut();

                if now.duration_since(window.started) >= self.window {
                    window.count = 0;
                    window.started = now;
                }

                if window.count < self.max_requests {
                    window.count += 1;
                    None
                } else {
                    Some(window.started + self.window - now)
                }
            };

            match wait {
                None => return,
                Some(delay) => {
                    debug!("Throttling {} for {:?}", host, delay);
                    sleep(delay).await;
                }
            }
        }
    }
}
