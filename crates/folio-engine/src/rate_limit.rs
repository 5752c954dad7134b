//! Per-content-type rate limiting.
//!
//! Each [`folio_models::ContentType`] gets two independent bounds: a sliding
//! 60 second window on request starts and a semaphore on in-flight requests.
//! [`RateLimiter::acquire`] satisfies both before returning a permit, polling
//! while either bound is exhausted. Limiters are plain values wired in by the
//! caller; there is no global instance.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedSemaphorePermit, Semaphore};
use tokio::time::{Duration, Instant};

use folio_models::ContentType;

use crate::config::{EngineConfig, TypeLimits};
use crate::error::{EngineError, EngineResult};

const WINDOW: Duration = Duration::from_secs(60);

struct TypeState {
    limits: TypeLimits,
    semaphore: Arc<Semaphore>,
    /// Start times of requests in the trailing window, oldest first
    window: Mutex<VecDeque<Instant>>,
}

/// Bounds provider traffic per content type.
pub struct RateLimiter {
    states: HashMap<ContentType, TypeState>,
    poll_interval: Duration,
    acquire_timeout: Duration,
}

impl RateLimiter {
    pub fn new(config: &EngineConfig) -> Self {
        let states = ContentType::all()
            .iter()
            .map(|&content_type| {
                let limits = config.limits_for(content_type);
                (
                    content_type,
                    TypeState {
                        limits,
                        semaphore: Arc::new(Semaphore::new(limits.max_concurrent)),
                        window: Mutex::new(VecDeque::new()),
                    },
                )
            })
            .collect();
        Self {
            states,
            poll_interval: config.acquire_poll_interval,
            acquire_timeout: config.acquire_timeout,
        }
    }

    /// Acquire a permit for one provider request of the given type.
    ///
    /// Blocks until both the concurrency slot and the per-minute window have
    /// room, or fails with [`EngineError::RateLimitTimeout`] after the
    /// configured deadline. The returned permit releases its concurrency slot
    /// when dropped; the window entry expires on its own.
    pub async fn acquire(&self, content_type: ContentType) -> EngineResult<RateLimitPermit> {
        let state = &self.states[&content_type];
        let deadline = Instant::now() + self.acquire_timeout;

        loop {
            if let Ok(permit) = state.semaphore.clone().try_acquire_owned() {
                let mut window = state.window.lock().await;
                let now = Instant::now();
                while window.front().is_some_and(|&t| now - t >= WINDOW) {
                    window.pop_front();
                }
                if window.len() < state.limits.requests_per_minute {
                    window.push_back(now);
                    return Ok(RateLimitPermit {
                        content_type,
                        _permit: permit,
                    });
                }
                // Window full; give the slot back while we wait.
                drop(window);
                drop(permit);
            }

            if Instant::now() + self.poll_interval > deadline {
                return Err(EngineError::RateLimitTimeout {
                    content_type,
                    waited_secs: self.acquire_timeout.as_secs(),
                });
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }

    /// Currently available concurrency slots for a type. Test observability.
    pub fn available_slots(&self, content_type: ContentType) -> usize {
        self.states[&content_type].semaphore.available_permits()
    }
}

/// Holds one concurrency slot; released on drop.
#[derive(Debug)]
pub struct RateLimitPermit {
    content_type: ContentType,
    _permit: OwnedSemaphorePermit,
}

impl RateLimitPermit {
    pub fn content_type(&self) -> ContentType {
        self.content_type
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(rpm: usize, concurrent: usize) -> EngineConfig {
        let limits = TypeLimits {
            requests_per_minute: rpm,
            max_concurrent: concurrent,
        };
        EngineConfig {
            image_limits: limits,
            video_limits: limits,
            project_text_limits: limits,
            portfolio_text_limits: limits,
            acquire_poll_interval: Duration::from_millis(100),
            acquire_timeout: Duration::from_secs(5),
            ..EngineConfig::default()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrency_bound() {
        let limiter = RateLimiter::new(&config(100, 2));

        let p1 = limiter.acquire(ContentType::Image).await.unwrap();
        let _p2 = limiter.acquire(ContentType::Image).await.unwrap();
        assert_eq!(limiter.available_slots(ContentType::Image), 0);

        // Third acquire blocks until a permit drops.
        let acquire = limiter.acquire(ContentType::Image);
        tokio::pin!(acquire);
        tokio::select! {
            biased;
            _ = &mut acquire => panic!("acquired past concurrency limit"),
            _ = tokio::time::sleep(Duration::from_millis(500)) => {}
        }

        drop(p1);
        let _p3 = acquire.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_window_bound() {
        let mut cfg = config(2, 10);
        cfg.acquire_timeout = Duration::from_secs(120);
        let limiter = RateLimiter::new(&cfg);

        drop(limiter.acquire(ContentType::Video).await.unwrap());
        drop(limiter.acquire(ContentType::Video).await.unwrap());

        // Window is full even though all slots are free.
        let acquire = limiter.acquire(ContentType::Video);
        tokio::pin!(acquire);
        tokio::select! {
            biased;
            _ = &mut acquire => panic!("acquired past window limit"),
            _ = tokio::time::sleep(Duration::from_secs(30)) => {}
        }

        // After the first entries age out of the 60 s window it succeeds.
        let permit = acquire.await.unwrap();
        assert_eq!(permit.content_type(), ContentType::Video);
    }

    #[tokio::test(start_paused = true)]
    async fn test_acquire_timeout() {
        let limiter = RateLimiter::new(&config(100, 1));
        let _held = limiter.acquire(ContentType::ProjectText).await.unwrap();

        let err = limiter.acquire(ContentType::ProjectText).await.unwrap_err();
        match err {
            EngineError::RateLimitTimeout { content_type, .. } => {
                assert_eq!(content_type, ContentType::ProjectText);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_permit_drop_releases_slot() {
        let limiter = RateLimiter::new(&config(100, 1));
        {
            let _permit = limiter.acquire(ContentType::PortfolioText).await.unwrap();
            assert_eq!(limiter.available_slots(ContentType::PortfolioText), 0);
        }
        assert_eq!(limiter.available_slots(ContentType::PortfolioText), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_types_are_independent() {
        let limiter = RateLimiter::new(&config(100, 1));
        let _image = limiter.acquire(ContentType::Image).await.unwrap();
        // A held image slot must not block video.
        let _video = limiter.acquire(ContentType::Video).await.unwrap();
    }
}
