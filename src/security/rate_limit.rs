//! Path-scoped rate limiting.
//!
//! A rule set maps path patterns to token buckets. The first rule whose pattern
//! matches the request path decides; paths no rule matches are not limited.
//! The rule set sits behind an `ArcSwap` so it can be replaced as a whole;
//! buckets live exactly as long as the rule set that owns them.

use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use serde::{Deserialize, Serialize};

use crate::error::{BuildError, DispatchError, DispatchResult};
use crate::observability::metrics;
use crate::pipeline::{Middleware, Next, Outcome, Reply, RequestContext, Response};
use crate::routing::PathPattern;
use crate::security::token_bucket::{FixedWindowBucket, MeteredBucket, TokenBucket};

/// Refill strategy of a rule's bucket.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BucketStrategy {
    /// Reset to capacity once per interval.
    #[default]
    Fixed,
    /// One token per interval, starting empty.
    Metered,
}

/// One pattern → bucket binding.
#[derive(Debug, Clone)]
pub struct RateLimitRule {
    pattern: PathPattern,
    bucket: Arc<dyn TokenBucket>,
}

impl RateLimitRule {
    pub fn new(pattern: &str, bucket: Arc<dyn TokenBucket>) -> Result<Self, BuildError> {
        Ok(Self {
            pattern: PathPattern::parse(pattern)?,
            bucket,
        })
    }

    /// Build a rule with a freshly created bucket.
    ///
    /// Metered buckets need a running tokio runtime for their refill task.
    pub fn with_strategy(
        pattern: &str,
        strategy: BucketStrategy,
        capacity: u32,
        interval: Duration,
    ) -> Result<Self, BuildError> {
        if capacity == 0 || interval.is_zero() {
            return Err(BuildError::InvalidRule {
                pattern: pattern.to_string(),
                reason: "capacity and interval must be positive".to_string(),
            });
        }
        let bucket: Arc<dyn TokenBucket> = match strategy {
            BucketStrategy::Fixed => Arc::new(FixedWindowBucket::new(capacity, interval)),
            BucketStrategy::Metered => Arc::new(MeteredBucket::start(capacity, interval)?),
        };
        Self::new(pattern, bucket)
    }

    pub fn pattern(&self) -> &PathPattern {
        &self.pattern
    }

    pub fn bucket(&self) -> &Arc<dyn TokenBucket> {
        &self.bucket
    }
}

/// Replaceable rule set.
#[derive(Debug)]
pub struct RateLimiter {
    rules: ArcSwap<Vec<RateLimitRule>>,
}

impl RateLimiter {
    pub fn new(rules: Vec<RateLimitRule>) -> Self {
        Self {
            rules: ArcSwap::from_pointee(rules),
        }
    }

    /// Admit or reject a request for `path`.
    pub fn check(&self, path: &str) -> DispatchResult<()> {
        let rules = self.rules.load();
        match rules.iter().find(|r| r.pattern.matches(path)) {
            Some(rule) if !rule.bucket.try_acquire() => Err(DispatchError::RateLimited {
                pattern: rule.pattern.to_string(),
            }),
            _ => Ok(()),
        }
    }

    /// Swap in a new rule set. The old buckets are dropped once no in-flight check holds them.
    pub fn replace(&self, rules: Vec<RateLimitRule>) {
        tracing::info!(rules = rules.len(), "Rate limit rules replaced");
        self.rules.store(Arc::new(rules));
    }

    pub fn len(&self) -> usize {
        self.rules.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Middleware stage consulting a [`RateLimiter`]. Rejections short-circuit with 429.
#[derive(Debug)]
pub struct RateLimitStage {
    limiter: Arc<RateLimiter>,
}

impl RateLimitStage {
    pub fn new(limiter: Arc<RateLimiter>) -> Self {
        Self { limiter }
    }
}

impl Middleware for RateLimitStage {
    fn name(&self) -> &str {
        "rate_limit"
    }

    fn invoke(&self, ctx: &mut RequestContext, next: Next<'_>) -> DispatchResult<Outcome> {
        match self.limiter.check(ctx.request().path()) {
            Ok(()) => next.run(ctx),
            Err(DispatchError::RateLimited { pattern }) => {
                tracing::warn!(
                    request_id = ctx.request_id().unwrap_or("-"),
                    path = %ctx.request().path(),
                    rule = %pattern,
                    "Rate limit exceeded"
                );
                metrics::record_rate_limited(&pattern);
                Ok(Outcome::Ready(Reply::Response(Response::too_many_requests())))
            }
            Err(err) => Err(err),
        }
    }
}
