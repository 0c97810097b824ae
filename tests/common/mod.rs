//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use dispatch_core::error::{DispatchError, DispatchResult};
use dispatch_core::pipeline::{from_fn, Interceptor, Middleware, Next, Outcome, Reply, RequestContext};
use dispatch_core::scheduler::SchedulingMode;

pub const MODES: [SchedulingMode; 2] = [SchedulingMode::Task, SchedulingMode::Continuation];

/// Ordered record of side effects, shared between stages and handlers.
#[derive(Clone, Default)]
pub struct Journal(Arc<Mutex<Vec<String>>>);

impl Journal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, entry: impl Into<String>) {
        self.0.lock().unwrap().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.0.lock().unwrap().clear();
    }
}

/// Stage recording `<name>-before` and `<name>-after` around `next`.
pub fn recording_stage(name: &'static str, journal: &Journal) -> Arc<dyn Middleware> {
    let journal = journal.clone();
    Arc::new(from_fn(name, move |ctx: &mut RequestContext, next: Next<'_>| {
        journal.push(format!("{name}-before"));
        let journal = journal.clone();
        next.run(ctx)?.map(ctx, move |_ctx, reply| {
            journal.push(format!("{name}-after"));
            Ok(reply)
        })
    }))
}

/// Stage that records itself and answers without calling `next`.
pub fn short_circuit_stage(name: &'static str, journal: &Journal) -> Arc<dyn Middleware> {
    let journal = journal.clone();
    Arc::new(from_fn(name, move |_ctx: &mut RequestContext, _next: Next<'_>| {
        journal.push(format!("{name}-before"));
        Ok(Outcome::ready(format!("answered by {name}")))
    }))
}

/// Phase in which a [`RecordingInterceptor`] returns an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    None,
    Pre,
    Post,
}

/// Interceptor recording every phase it runs.
pub struct RecordingInterceptor {
    pub order: i32,
    pub pass: bool,
    pub fault: Fault,
    pub journal: Journal,
}

impl RecordingInterceptor {
    pub fn new(order: i32, pass: bool, journal: &Journal) -> Arc<Self> {
        Arc::new(Self {
            order,
            pass,
            fault: Fault::None,
            journal: journal.clone(),
        })
    }

    pub fn failing(order: i32, fault: Fault, journal: &Journal) -> Arc<Self> {
        Arc::new(Self {
            order,
            pass: true,
            fault,
            journal: journal.clone(),
        })
    }
}

impl Interceptor for RecordingInterceptor {
    fn order(&self) -> i32 {
        self.order
    }

    fn pre_handle(&self, _ctx: &mut RequestContext) -> DispatchResult<bool> {
        self.journal.push(format!("pre-{}", self.order));
        if self.fault == Fault::Pre {
            return Err(DispatchError::handler(format!("pre-{} failed", self.order)));
        }
        Ok(self.pass)
    }

    fn post_handle(&self, _ctx: &mut RequestContext, reply: Reply) -> DispatchResult<Reply> {
        self.journal.push(format!("post-{}", self.order));
        if self.fault == Fault::Post {
            return Err(DispatchError::handler(format!("post-{} failed", self.order)));
        }
        Ok(match reply {
            Reply::Text(s) => Reply::Text(format!("{s}+{}", self.order)),
            other => other,
        })
    }

    fn after_completion(&self, _ctx: &mut RequestContext, error: Option<&DispatchError>) {
        let tag = if error.is_some() { "err" } else { "ok" };
        self.journal.push(format!("after-{}:{tag}", self.order));
    }
}
