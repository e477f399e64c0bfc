//! Sliding-window rate limiting, keyed by caller identity.
//!
//! The limiter is an injected component held in application state — never
//! process-wide static — so tests instantiate independent limiters.

use std::{
  collections::{HashMap, VecDeque},
  sync::{Arc, Mutex},
  time::{Duration, Instant},
};

use axum::{
  extract::{Request, State},
  middleware::Next,
  response::{IntoResponse, Response},
};
use serde::Deserialize;

use crate::error::ApiError;

#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
  pub max_requests: usize,
  pub window_secs:  u64,
}

/// Sliding-window counter: at most `max` requests per identity inside any
/// trailing `window`.
pub struct RateLimiter {
  max:    usize,
  window: Duration,
  hits:   Mutex<HashMap<String, VecDeque<Instant>>>,
}

impl RateLimiter {
  pub fn new(max: usize, window: Duration) -> Self {
    Self { max, window, hits: Mutex::new(HashMap::new()) }
  }

  pub fn from_config(config: &RateLimitConfig) -> Self {
    Self::new(config.max_requests, Duration::from_secs(config.window_secs))
  }

  /// Record one request for `identity`; `false` when over budget.
  pub fn try_acquire(&self, identity: &str) -> bool {
    let now = Instant::now();
    let mut hits = self.hits.lock().unwrap_or_else(|e| e.into_inner());
    let window = hits.entry(identity.to_string()).or_default();

    while window
      .front()
      .is_some_and(|&hit| now.duration_since(hit) >= self.window)
    {
      window.pop_front();
    }

    if window.len() >= self.max {
      return false;
    }
    window.push_back(now);
    true
  }
}

/// axum middleware applying the limiter to every route. Identity is the
/// `x-api-key` header when present.
pub async fn middleware(
  State(limiter): State<Arc<RateLimiter>>,
  req: Request,
  next: Next,
) -> Response {
  let identity = req
    .headers()
    .get("x-api-key")
    .and_then(|v| v.to_str().ok())
    .unwrap_or("anonymous")
    .to_string();

  if limiter.try_acquire(&identity) {
    next.run(req).await
  } else {
    tracing::warn!(identity, "rate limit exceeded");
    ApiError::RateLimited.into_response()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn allows_up_to_the_budget_then_rejects() {
    let limiter = RateLimiter::new(3, Duration::from_secs(60));
    assert!(limiter.try_acquire("a"));
    assert!(limiter.try_acquire("a"));
    assert!(limiter.try_acquire("a"));
    assert!(!limiter.try_acquire("a"));
  }

  #[test]
  fn identities_are_tracked_independently() {
    let limiter = RateLimiter::new(1, Duration::from_secs(60));
    assert!(limiter.try_acquire("a"));
    assert!(limiter.try_acquire("b"));
    assert!(!limiter.try_acquire("a"));
  }

  #[test]
  fn window_expiry_restores_budget() {
    let limiter = RateLimiter::new(1, Duration::from_millis(30));
    assert!(limiter.try_acquire("a"));
    assert!(!limiter.try_acquire("a"));
    std::thread::sleep(Duration::from_millis(40));
    assert!(limiter.try_acquire("a"));
  }

  #[test]
  fn instances_are_independent() {
    let one = RateLimiter::new(1, Duration::from_secs(60));
    let two = RateLimiter::new(1, Duration::from_secs(60));
    assert!(one.try_acquire("a"));
    assert!(two.try_acquire("a"));
  }
}
