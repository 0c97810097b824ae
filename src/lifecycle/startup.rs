//! Startup orchestration.
//!
//! # Responsibilities
//! - Collect routes, controllers, middleware, interceptors and rate limit rules
//! - Freeze them into an immutable chain handed to the scheduler
//! - Start background tasks (session sentinel) on request
//!
//! # Design Decisions
//! - Fail fast: any registration error is fatal and returned immediately
//! - Stage order is fixed: path guard, user middleware (registration order),
//!   rate limiting, interceptors, routing
//! - Nothing registered here is mutable once `build` returns, except the
//!   rate limit rule set which is swapped whole

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::config::{AppConfig, RateLimitRuleConfig};
use crate::error::BuildError;
use crate::pipeline::{Chain, Interceptor, InterceptorRegistry, InterceptorStage, Middleware, RoutingStage};
use crate::routing::{Controller, Handler, MatchStrategy, Method, RouteTable, RouteTableBuilder};
use crate::scheduler::{Scheduler, SchedulingMode};
use crate::security::{PathGuard, RateLimitRule, RateLimitStage, RateLimiter};
use crate::session::{MemorySessionStore, Sentinel, SessionLock, SessionStore};

const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Collects everything the application serves with.
pub struct AppBuilder {
    routes: RouteTableBuilder,
    middleware: Vec<Arc<dyn Middleware>>,
    interceptors: InterceptorRegistry,
    rules: Vec<RateLimitRule>,
    sessions: Option<Arc<dyn SessionStore>>,
    sweep_interval: Duration,
    mode: SchedulingMode,
}

impl AppBuilder {
    pub fn new(strategy: MatchStrategy) -> Self {
        Self {
            routes: RouteTable::builder(strategy),
            middleware: Vec::new(),
            interceptors: InterceptorRegistry::new(),
            rules: Vec::new(),
            sessions: None,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
            mode: SchedulingMode::default(),
        }
    }

    /// Builder preloaded with everything the configuration file describes.
    ///
    /// Metered rate limit rules start their refill tasks here, so this must run
    /// inside a tokio runtime when any are configured.
    pub fn from_config(config: &AppConfig) -> Result<Self, BuildError> {
        let mut builder = Self::new(config.routing.strategy);
        builder.scheduling(config.scheduler.mode);
        for rule in rules_from_config(&config.rate_limit.rules)? {
            builder.rate_limit(rule);
        }
        if config.session.enabled {
            builder.session_store(
                Arc::new(MemorySessionStore::with_max_inactive(config.session.max_inactive())),
                config.session.sweep_interval(),
            );
        }
        Ok(builder)
    }

    /// Direct access for the verb helpers (`get`, `post`, ...).
    pub fn routes_mut(&mut self) -> &mut RouteTableBuilder {
        &mut self.routes
    }

    pub fn route(
        &mut self,
        method: Method,
        path_template: &str,
        handler: Handler,
    ) -> Result<&mut Self, BuildError> {
        self.routes.register(method, path_template, handler)?;
        Ok(self)
    }

    pub fn controller<C: Controller>(&mut self, controller: Arc<C>) -> Result<&mut Self, BuildError> {
        self.routes.controller(controller)?;
        Ok(self)
    }

    /// Append a stage. Stages run in the order they are added.
    pub fn middleware(&mut self, stage: Arc<dyn Middleware>) -> &mut Self {
        self.middleware.push(stage);
        self
    }

    pub fn interceptor(
        &mut self,
        pattern: &str,
        interceptor: Arc<dyn Interceptor>,
    ) -> Result<&mut Self, BuildError> {
        self.interceptors.add(pattern, interceptor)?;
        Ok(self)
    }

    pub fn interceptor_patterns(
        &mut self,
        patterns: &[&str],
        interceptor: Arc<dyn Interceptor>,
    ) -> Result<&mut Self, BuildError> {
        self.interceptors.add_patterns(patterns, interceptor)?;
        Ok(self)
    }

    /// Append a rule. Earlier rules take precedence.
    pub fn rate_limit(&mut self, rule: RateLimitRule) -> &mut Self {
        self.rules.push(rule);
        self
    }

    pub fn session_store(&mut self, store: Arc<dyn SessionStore>, sweep_interval: Duration) -> &mut Self {
        self.sessions = Some(store);
        self.sweep_interval = sweep_interval;
        self
    }

    pub fn scheduling(&mut self, mode: SchedulingMode) -> &mut Self {
        self.mode = mode;
        self
    }

    /// Freeze the configuration into a serving application.
    pub fn build(self) -> Application {
        let table = Arc::new(self.routes.build());
        let limiter = Arc::new(RateLimiter::new(self.rules));

        let mut stages: Vec<Arc<dyn Middleware>> = Vec::with_capacity(self.middleware.len() + 3);
        stages.push(Arc::new(PathGuard));
        stages.extend(self.middleware);
        stages.push(Arc::new(RateLimitStage::new(Arc::clone(&limiter))));
        let interceptors = self.interceptors.len();
        stages.push(Arc::new(InterceptorStage::new(self.interceptors)));
        let chain = Chain::new(stages, Arc::new(RoutingStage::new(Arc::clone(&table))));

        tracing::info!(
            routes = table.len(),
            stages = ?chain.stage_names(),
            interceptors,
            rate_limit_rules = limiter.len(),
            sessions = self.sessions.is_some(),
            mode = ?self.mode,
            "Application assembled"
        );

        let lock = SessionLock::new();
        let scheduler = Scheduler::new(chain, self.mode, lock.clone(), self.sessions.clone());
        Application {
            scheduler,
            table,
            limiter,
            lock,
            sessions: self.sessions,
            sweep_interval: self.sweep_interval,
        }
    }
}

impl Default for AppBuilder {
    fn default() -> Self {
        Self::new(MatchStrategy::default())
    }
}

/// The frozen application: shared, read-only apart from the rate limit rule set.
pub struct Application {
    scheduler: Scheduler,
    table: Arc<RouteTable>,
    limiter: Arc<RateLimiter>,
    lock: SessionLock,
    sessions: Option<Arc<dyn SessionStore>>,
    sweep_interval: Duration,
}

impl Application {
    pub fn builder(strategy: MatchStrategy) -> AppBuilder {
        AppBuilder::new(strategy)
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn routes(&self) -> &RouteTable {
        &self.table
    }

    pub fn sessions(&self) -> Option<&Arc<dyn SessionStore>> {
        self.sessions.as_ref()
    }

    pub fn session_lock(&self) -> &SessionLock {
        &self.lock
    }

    /// Start the session sentinel. `None` when no session store is configured.
    pub fn spawn_sentinel(&self, shutdown: broadcast::Receiver<()>) -> Option<JoinHandle<()>> {
        let store = Arc::clone(self.sessions.as_ref()?);
        let sentinel = Sentinel::new(store, self.lock.clone(), self.sweep_interval);
        Some(tokio::spawn(sentinel.run(shutdown)))
    }

    /// Swap the whole rate limit rule set.
    pub fn replace_rate_limits(&self, rules: Vec<RateLimitRule>) {
        self.limiter.replace(rules);
    }

    /// Swap the rule set for one built from configuration entries.
    pub fn reload_rate_limits(&self, rules: &[RateLimitRuleConfig]) -> Result<(), BuildError> {
        self.limiter.replace(rules_from_config(rules)?);
        Ok(())
    }
}

fn rules_from_config(rules: &[RateLimitRuleConfig]) -> Result<Vec<RateLimitRule>, BuildError> {
    rules
        .iter()
        .map(|r| RateLimitRule::with_strategy(&r.pattern, r.strategy, r.capacity, r.interval()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{Request, RequestContext};
    use crate::security::BucketStrategy;

    fn ok() -> Handler {
        Handler::new(|_ctx: &mut RequestContext| "ok")
    }

    #[test]
    fn duplicate_route_fails_fast() {
        let mut b = AppBuilder::default();
        b.route(Method::Get, "/a", ok()).unwrap();
        assert!(matches!(
            b.route(Method::Get, "/a/", ok()),
            Err(BuildError::DuplicateRoute { .. })
        ));
    }

    #[test]
    fn stages_in_fixed_order() {
        let mut b = AppBuilder::default();
        b.middleware(Arc::new(crate::pipeline::from_fn(
            "user",
            |ctx: &mut RequestContext, next: crate::pipeline::Next<'_>| next.run(ctx),
        )));
        let app = b.build();
        assert_eq!(
            app.scheduler().chain().stage_names(),
            vec!["path_guard", "user", "rate_limit", "interceptors", "routing"]
        );
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn rate_limits_can_be_replaced() {
        let mut b = AppBuilder::default();
        b.route(Method::Get, "/hit", ok()).unwrap();
        b.rate_limit(
            RateLimitRule::with_strategy("/hit", BucketStrategy::Fixed, 1, Duration::from_secs(60)).unwrap(),
        );
        let app = b.build();
        let s = app.scheduler();

        assert_eq!(s.handle(Request::new("GET", "/hit")).await.status, 200);
        assert_eq!(s.handle(Request::new("GET", "/hit")).await.status, 429);

        app.reload_rate_limits(&[RateLimitRuleConfig {
            pattern: "/hit".into(),
            strategy: BucketStrategy::Fixed,
            capacity: 5,
            interval_ms: 60_000,
        }])
        .unwrap();
        assert_eq!(s.handle(Request::new("GET", "/hit")).await.status, 200);
    }

    #[test]
    fn sentinel_needs_a_store() {
        let app = AppBuilder::default().build();
        let (_tx, rx) = broadcast::channel(1);
        assert!(app.spawn_sentinel(rx).is_none());
    }
}
