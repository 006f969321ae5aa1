//! 弹性模块：提供滚动窗口调用配额限流器。
//!
//! # Resilience Module
//!
//! The remote model enforces a calls-per-minute quota that it does not report
//! back to us, so the matcher has to keep its own books.
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`RateLimiter`] | Rolling-window quota gate shared by every worker of a run |
//! | [`CallPermit`] | Slot handed out by the limiter; `record()` it once the call succeeded |
//!
//! ```rust
//! use column_matcher::resilience::{RateLimiter, RateLimiterConfig};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let limiter = RateLimiter::new(RateLimiterConfig::per_minute(10));
//! let permit = limiter.acquire().await;
//! // ... perform the external call ...
//! permit.record();
//! assert_eq!(limiter.snapshot().recorded, 1);
//! # }
//! ```

pub mod rate_limiter;

pub use rate_limiter::{CallPermit, RateLimiter, RateLimiterConfig, RateLimiterSnapshot};
