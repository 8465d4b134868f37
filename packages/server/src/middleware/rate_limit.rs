use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::extract::{ConnectInfo, Request, State};
use axum::middleware::Next;
use axum::response::Response;
use dashmap::DashMap;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, warn};

use crate::config::LimiterConfig;
use crate::error::AppError;

/// How often idle clients are purged.
pub const CLEANUP_INTERVAL: Duration = Duration::from_secs(60);
/// Clients not seen for this long are forgotten.
pub const CLIENT_IDLE_TTL: Duration = Duration::from_secs(180);

#[derive(Debug)]
struct Bucket {
    tokens: f64,
    refilled_at: Instant,
    last_seen: Instant,
}

/// Per-client-IP token bucket limiter.
#[derive(Debug)]
pub struct RateLimiter {
    clients: DashMap<IpAddr, Bucket>,
    rps: f64,
    burst: f64,
}

impl RateLimiter {
    pub fn new(rps: f64, burst: u32) -> Self {
        Self {
            clients: DashMap::new(),
            rps,
            burst: f64::from(burst),
        }
    }

    pub fn from_config(config: &LimiterConfig) -> Self {
        Self::new(config.rps, config.burst)
    }

    /// Take one token for `ip`. On refusal returns the whole seconds until a token is available.
    pub fn acquire(&self, ip: IpAddr) -> Result<(), u64> {
        let now = Instant::now();
        let mut bucket = self.clients.entry(ip).or_insert_with(|| Bucket {
            tokens: self.burst,
            refilled_at: now,
            last_seen: now,
        });

        let elapsed = now.duration_since(bucket.refilled_at).as_secs_f64();
        bucket.tokens = (bucket.tokens + elapsed * self.rps).min(self.burst);
        bucket.refilled_at = now;
        bucket.last_seen = now;

        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            return Ok(());
        }

        let wait = if self.rps > 0.0 {
            ((1.0 - bucket.tokens) / self.rps).ceil() as u64
        } else {
            u64::MAX
        };
        Err(wait.max(1))
    }

    /// Forget clients idle for longer than `max_idle`. Returns how many were dropped.
    pub fn purge_idle(&self, max_idle: Duration) -> usize {
        let now = Instant::now();
        let before = self.clients.len();
        self.clients
            .retain(|_, bucket| now.duration_since(bucket.last_seen) <= max_idle);
        before.saturating_sub(self.clients.len())
    }

    pub fn tracked_clients(&self) -> usize {
        self.clients.len()
    }
}

/// Middleware rejecting requests with `429` once the client's bucket is empty.
///
/// Requests without connection info (e.g. routers driven in-process) pass through.
pub async fn limit_by_ip(
    State(limiter): State<Arc<RateLimiter>>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let Some(ConnectInfo(addr)) = req.extensions().get::<ConnectInfo<SocketAddr>>().copied()
    else {
        return Ok(next.run(req).await);
    };

    if let Err(retry_after) = limiter.acquire(addr.ip()) {
        warn!(client = %addr.ip(), retry_after, "Rate limit exceeded");
        return Err(AppError::RateLimited { retry_after });
    }
    Ok(next.run(req).await)
}

/// Periodically purge idle clients until `shutdown` fires.
pub fn spawn_cleanup_task(
    limiter: Arc<RateLimiter>,
    tracker: &TaskTracker,
    shutdown: CancellationToken,
) {
    tracker.spawn(async move {
        let mut ticker = tokio::time::interval(CLEANUP_INTERVAL);
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {
                    let removed = limiter.purge_idle(CLIENT_IDLE_TTL);
                    if removed > 0 {
                        debug!(removed, "Purged idle rate limiter clients");
                    }
                }
            }
        }
    });
}
