//! Property tests for the next/abort protocol.

use std::sync::Arc;

use bytes::Bytes;
use proptest::prelude::*;
use switchyard_core::{handler, ChainState, Context, Handler, Request};

/// Builds a chain of `len` handlers. Handler `i` records itself, aborts if
/// `i == abort_at`, and calls `next` (possibly several times) regardless.
fn build(len: usize, abort_at: Option<usize>, extra_nexts: usize) -> Vec<Handler> {
    (0..len)
        .map(|i| {
            handler(move |ctx: &mut Context| {
                ctx.get_mut::<Vec<usize>>("ran").unwrap().push(i);
                if abort_at == Some(i) {
                    ctx.abort();
                }
                for _ in 0..=extra_nexts {
                    ctx.next();
                }
            })
        })
        .collect()
}

fn execute(handlers: Vec<Handler>) -> Context {
    let mut ctx = Context::new(Request::new(Bytes::new())).with_handlers(Arc::from(handlers));
    ctx.set("ran", Vec::<usize>::new());
    ctx.run();
    ctx
}

proptest! {
    #[test]
    fn every_handler_runs_once_in_order(len in 0usize..12, extra in 0usize..3) {
        let ctx = execute(build(len, None, extra));
        let ran = ctx.get::<Vec<usize>>("ran").unwrap().clone();

        prop_assert_eq!(ran, (0..len).collect::<Vec<_>>());
        prop_assert_eq!(ctx.state(), ChainState::Completed);
    }

    #[test]
    fn abort_stops_after_current(len in 1usize..12, at in 0usize..12, extra in 0usize..3) {
        let at = at % len;
        let ctx = execute(build(len, Some(at), extra));
        let ran = ctx.get::<Vec<usize>>("ran").unwrap().clone();

        prop_assert_eq!(ran, (0..=at).collect::<Vec<_>>());
        prop_assert!(ctx.is_aborted());
        prop_assert_eq!(ctx.index(), at + 1);
        prop_assert_eq!(ctx.state(), ChainState::Aborted);
    }
}
