//! Interceptor phases and their ordering.

use std::sync::Arc;

use dispatch_core::error::{BuildError, DispatchError, DispatchResult};
use dispatch_core::lifecycle::{AppBuilder, Application};
use dispatch_core::pipeline::{Outcome, Reply, Request, RequestContext};
use dispatch_core::routing::Handler;
use dispatch_core::SchedulingMode;

mod common;
use common::{Fault, Journal, RecordingInterceptor, MODES};

fn app(journal: &Journal, passes: [bool; 3], mode: SchedulingMode) -> Application {
    let mut b = AppBuilder::default();
    b.scheduling(mode);
    // Registered out of order on purpose; execution follows `order`.
    b.interceptor("/api/**", RecordingInterceptor::new(2, passes[2], journal))
        .unwrap()
        .interceptor("/**", RecordingInterceptor::new(0, passes[0], journal))
        .unwrap()
        .interceptor("/api/*", RecordingInterceptor::new(1, passes[1], journal))
        .unwrap();

    let ok = journal.clone();
    let failing = journal.clone();
    b.routes_mut()
        .get(
            "/api/items",
            Handler::new(move |_ctx: &mut RequestContext| {
                ok.push("handler");
                "items"
            }),
        )
        .unwrap()
        .get(
            "/api/broken",
            Handler::new(move |_ctx: &mut RequestContext| -> DispatchResult<Outcome> {
                failing.push("handler");
                Err(DispatchError::handler("exploded"))
            }),
        )
        .unwrap();
    b.build()
}

#[tokio::test(flavor = "multi_thread")]
async fn all_pass_runs_post_handlers_descending() {
    for mode in MODES {
        let journal = Journal::new();
        let app = app(&journal, [true, true, true], mode);

        let resp = app.scheduler().handle(Request::new("GET", "/api/items/")).await;
        assert_eq!(resp.status, 200);
        assert_eq!(resp.body_str(), "items+2+1+0");
        assert_eq!(
            journal.entries(),
            vec![
                "pre-0", "pre-1", "pre-2", "handler", "post-2", "post-1", "post-0", "after-2:ok",
                "after-1:ok", "after-0:ok",
            ]
        );
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn rejection_stops_and_cleans_up_entered_only() {
    for mode in MODES {
        let journal = Journal::new();
        let app = app(&journal, [true, false, true], mode);

        app.scheduler().handle(Request::new("GET", "/api/items")).await;
        assert_eq!(
            journal.entries(),
            vec!["pre-0", "pre-1", "after-1:ok", "after-0:ok"]
        );
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn handler_error_reaches_after_completion() {
    let journal = Journal::new();
    let app = app(&journal, [true, true, true], SchedulingMode::Task);

    let resp = app.scheduler().handle(Request::new("GET", "/api/broken")).await;
    assert_eq!(resp.status, 500);
    assert_eq!(
        journal.entries(),
        vec!["pre-0", "pre-1", "pre-2", "handler", "after-2:err", "after-1:err", "after-0:err"]
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn patterns_scope_interceptors() {
    let journal = Journal::new();
    let app = app(&journal, [true, true, true], SchedulingMode::Continuation);

    let resp = app.scheduler().handle(Request::new("GET", "/elsewhere")).await;
    assert_eq!(resp.status, 404);
    assert_eq!(journal.entries(), vec!["pre-0", "after-0:err"]);
}

#[test]
fn duplicate_order_is_a_build_error() {
    let journal = Journal::new();
    let mut b = AppBuilder::default();
    b.interceptor("/a", RecordingInterceptor::new(7, true, &journal)).unwrap();
    assert!(matches!(
        b.interceptor("/b", RecordingInterceptor::new(7, true, &journal)),
        Err(BuildError::DuplicateInterceptorOrder(7))
    ));
}

#[test]
fn malformed_pattern_is_a_build_error() {
    let journal = Journal::new();
    let mut b = AppBuilder::default();
    assert!(matches!(
        b.interceptor("/api/{id", RecordingInterceptor::new(0, true, &journal)),
        Err(BuildError::InvalidPattern { .. })
    ));
}

/// Interceptors on `/**` in front of deferred routes.
fn deferred_app(
    journal: &Journal,
    interceptors: Vec<Arc<RecordingInterceptor>>,
    mode: SchedulingMode,
) -> Application {
    let mut b = AppBuilder::default();
    b.scheduling(mode);
    for interceptor in interceptors {
        b.interceptor("/**", interceptor).unwrap();
    }

    let ok = journal.clone();
    let failing = journal.clone();
    b.routes_mut()
        .get(
            "/later",
            Handler::new(move |_ctx: &mut RequestContext| {
                let journal = ok.clone();
                Outcome::deferred(async move {
                    tokio::task::yield_now().await;
                    journal.push("handler");
                    Ok(Reply::Text("later".into()))
                })
            }),
        )
        .unwrap()
        .get(
            "/later/broken",
            Handler::new(move |_ctx: &mut RequestContext| {
                let journal = failing.clone();
                Outcome::deferred(async move {
                    tokio::task::yield_now().await;
                    journal.push("handler");
                    Err::<Reply, _>(DispatchError::handler("exploded later"))
                })
            }),
        )
        .unwrap();
    b.build()
}

#[tokio::test(flavor = "multi_thread")]
async fn deferred_reply_is_post_processed_after_it_resolves() {
    for mode in MODES {
        let journal = Journal::new();
        let interceptors = vec![
            RecordingInterceptor::new(0, true, &journal),
            RecordingInterceptor::new(1, true, &journal),
        ];
        let app = deferred_app(&journal, interceptors, mode);

        let resp = app.scheduler().handle(Request::new("GET", "/later")).await;
        assert_eq!(resp.status, 200, "{mode:?}");
        assert_eq!(resp.body_str(), "later+1+0");
        assert_eq!(
            journal.entries(),
            vec!["pre-0", "pre-1", "handler", "post-1", "post-0", "after-1:ok", "after-0:ok"],
            "{mode:?}"
        );
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn deferred_failure_skips_post_handle() {
    for mode in MODES {
        let journal = Journal::new();
        let interceptors = vec![
            RecordingInterceptor::new(0, true, &journal),
            RecordingInterceptor::new(1, true, &journal),
        ];
        let app = deferred_app(&journal, interceptors, mode);

        let resp = app.scheduler().handle(Request::new("GET", "/later/broken")).await;
        assert_eq!(resp.status, 500, "{mode:?}");
        assert_eq!(
            journal.entries(),
            vec!["pre-0", "pre-1", "handler", "after-1:err", "after-0:err"],
            "{mode:?}"
        );
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn pre_handle_error_cleans_up_entered_interceptors() {
    for mode in MODES {
        let journal = Journal::new();
        let interceptors = vec![
            RecordingInterceptor::new(0, true, &journal),
            RecordingInterceptor::failing(1, Fault::Pre, &journal),
            RecordingInterceptor::new(2, true, &journal),
        ];
        let app = deferred_app(&journal, interceptors, mode);

        let resp = app.scheduler().handle(Request::new("GET", "/later")).await;
        assert_eq!(resp.status, 500, "{mode:?}");
        assert_eq!(
            journal.entries(),
            vec!["pre-0", "pre-1", "after-1:err", "after-0:err"],
            "{mode:?}"
        );
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn post_handle_error_stops_the_unwind() {
    for mode in MODES {
        let journal = Journal::new();
        let interceptors = vec![
            RecordingInterceptor::new(0, true, &journal),
            RecordingInterceptor::failing(1, Fault::Post, &journal),
            RecordingInterceptor::new(2, true, &journal),
        ];
        let app = deferred_app(&journal, interceptors, mode);

        let resp = app.scheduler().handle(Request::new("GET", "/later")).await;
        assert_eq!(resp.status, 500, "{mode:?}");
        assert_eq!(
            journal.entries(),
            vec![
                "pre-0", "pre-1", "pre-2", "handler", "post-2", "post-1", "after-2:err",
                "after-1:err", "after-0:err",
            ],
            "{mode:?}"
        );
    }
}
