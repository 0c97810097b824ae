//! Middleware ordering and short-circuit behaviour, in both scheduling modes.

use std::sync::Arc;

use dispatch_core::lifecycle::AppBuilder;
use dispatch_core::pipeline::{Outcome, Reply, Request, RequestContext};
use dispatch_core::routing::{Handler, MatchStrategy};

mod common;
use common::{recording_stage, short_circuit_stage, Journal, MODES};

fn handler(journal: &Journal, deferred: bool) -> Handler {
    let journal = journal.clone();
    Handler::new(move |_ctx: &mut RequestContext| {
        journal.push("handler");
        if deferred {
            Outcome::deferred(async { Ok(Reply::Text("deferred".into())) })
        } else {
            Outcome::ready("ready")
        }
    })
}

#[tokio::test(flavor = "multi_thread")]
async fn stages_unwind_in_reverse_order() {
    for mode in MODES {
        for deferred in [false, true] {
            let journal = Journal::new();
            let mut b = AppBuilder::new(MatchStrategy::Trie);
            b.scheduling(mode)
                .middleware(recording_stage("A", &journal))
                .middleware(recording_stage("B", &journal))
                .middleware(recording_stage("C", &journal));
            b.routes_mut().get("/work", handler(&journal, deferred)).unwrap();
            let app = b.build();

            let resp = app.scheduler().handle(Request::new("GET", "/work")).await;
            assert_eq!(resp.status, 200, "{mode:?} deferred={deferred}");
            assert_eq!(
                journal.entries(),
                vec!["A-before", "B-before", "C-before", "handler", "C-after", "B-after", "A-after"],
                "{mode:?} deferred={deferred}"
            );
        }
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn short_circuit_skips_the_rest() {
    for mode in MODES {
        let journal = Journal::new();
        let mut b = AppBuilder::new(MatchStrategy::Linear);
        b.scheduling(mode)
            .middleware(recording_stage("A", &journal))
            .middleware(short_circuit_stage("B", &journal))
            .middleware(recording_stage("C", &journal));
        b.routes_mut().get("/work", handler(&journal, false)).unwrap();
        let app = b.build();

        let resp = app.scheduler().handle(Request::new("GET", "/work")).await;
        assert_eq!(resp.body_str(), "answered by B");
        assert_eq!(journal.entries(), vec!["A-before", "B-before", "A-after"]);
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn committed_response_wins() {
    let mut b = AppBuilder::default();
    b.routes_mut()
        .get(
            "/commit",
            Handler::new(|ctx: &mut RequestContext| {
                let mut resp = dispatch_core::Response::text("committed");
                resp.status = 202;
                ctx.write(resp)?;
                Ok::<_, dispatch_core::DispatchError>("ignored")
            }),
        )
        .unwrap();
    let app = Arc::new(b.build());

    let resp = app.scheduler().handle(Request::new("GET", "/commit")).await;
    assert_eq!(resp.status, 202);
    assert_eq!(resp.body_str(), "committed");
}

#[tokio::test(flavor = "multi_thread")]
async fn path_traversal_never_reaches_routing() {
    let journal = Journal::new();
    let mut b = AppBuilder::default();
    b.middleware(recording_stage("A", &journal));
    b.routes_mut().get("/files/{*rest}", handler(&journal, false)).unwrap();
    let app = b.build();

    let resp = app.scheduler().handle(Request::new("GET", "/files/../etc/passwd")).await;
    assert_eq!(resp.status, 400);
    assert!(journal.entries().is_empty());
}
