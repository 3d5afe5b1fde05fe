//! Nested traversals started from inside a visitor
//!
//! Visitors run behind the trampoline's panic guard, so they only record
//! what they observe; every check happens after the traversal returns.

mod common;

use std::sync::Arc;

use clang_visit_bridge::{Boxed, CallerIdentity, ChildVisitResult, Dispatcher};
use common::{Node, TreeLibrary};
use parking_lot::Mutex;

const TOP: u32 = 0;
const R: u32 = 1;
const C1: u32 = 2;
const C2: u32 = 3;
const L: u32 = 4;

fn name(id: u32) -> &'static str {
    match id {
        R => "R",
        C1 => "C1",
        C2 => "C2",
        L => "L",
        _ => "?",
    }
}

fn library() -> TreeLibrary {
    TreeLibrary::new(&[(TOP, &[R]), (R, &[C1, C2]), (C1, &[L])])
}

/// What a visitor saw on one call
#[derive(Debug, Clone, PartialEq)]
struct Seen {
    visitor: &'static str,
    node: &'static str,
    parent: u32,
    identity: CallerIdentity,
    depth_1: usize,
    depth_2: usize,
}

type Log = Arc<Mutex<Vec<Seen>>>;

fn record(
    log: &Log,
    dispatcher: &Dispatcher<TreeLibrary>,
    visitor: &'static str,
    cursor: &Node,
    parent: &Node,
    identity: CallerIdentity,
) {
    log.lock().push(Seen {
        visitor,
        node: name(cursor.id),
        parent: parent.id,
        identity,
        depth_1: dispatcher.registry().depth(CallerIdentity(1)),
        depth_2: dispatcher.registry().depth(CallerIdentity(2)),
    });
}

#[test]
fn test_nested_traversal_under_same_identity() {
    common::init_logging();

    let dispatcher = Arc::new(Dispatcher::new(library()));
    let log: Log = Arc::new(Mutex::new(Vec::new()));
    let identity = CallerIdentity(1);

    let outer_dispatcher = Arc::clone(&dispatcher);
    let outer_log = Arc::clone(&log);
    let v1 = move |cursor: Boxed<Node>, parent: Boxed<Node>, id: CallerIdentity| {
        record(&outer_log, &outer_dispatcher, "V1", &cursor, &parent, id);

        match cursor.id {
            R => ChildVisitResult::Recurse,
            C1 => {
                let inner_log = Arc::clone(&outer_log);
                let inner_dispatcher = Arc::clone(&outer_dispatcher);
                outer_dispatcher.visit_children(
                    &cursor,
                    id,
                    move |leaf: Boxed<Node>, parent: Boxed<Node>, id: CallerIdentity| {
                        record(&inner_log, &inner_dispatcher, "V2", &leaf, &parent, id);
                        ChildVisitResult::Continue
                    },
                );
                ChildVisitResult::Continue
            }
            _ => ChildVisitResult::Continue,
        }
    };

    let root = Boxed::new(Node { id: TOP });
    let count = dispatcher.visit_children(&root, identity, v1);

    assert_eq!(count, 0);

    let seen = log.lock().clone();
    let order: Vec<String> = seen.iter().map(|s| format!("{}({})", s.visitor, s.node)).collect();
    assert_eq!(order, vec!["V1(R)", "V1(C1)", "V2(L)", "V1(C2)"]);

    assert!(seen.iter().all(|s| s.identity == identity));
    assert_eq!(seen.iter().map(|s| s.depth_1).collect::<Vec<_>>(), vec![1, 1, 2, 1]);
    assert_eq!(seen[2].parent, C1);
    assert_eq!(dispatcher.registry().depth(identity), 0);
}

#[test]
fn test_nested_break_only_stops_inner_traversal() {
    let dispatcher = Arc::new(Dispatcher::new(library()));
    let events = Arc::new(Mutex::new(Vec::new()));
    let inner_counts = Arc::new(Mutex::new(Vec::new()));
    let identity = CallerIdentity(5);

    let outer_dispatcher = Arc::clone(&dispatcher);
    let outer_events = Arc::clone(&events);
    let counts = Arc::clone(&inner_counts);
    let root = Boxed::new(Node { id: R });
    let count = dispatcher.visit_children(&root, identity, move |cursor: Boxed<Node>, _: Boxed<Node>, id: CallerIdentity| {
        if cursor.id == C1 {
            let inner_events = Arc::clone(&outer_events);
            let stopped = outer_dispatcher.visit_children(&cursor, id, move |leaf: Boxed<Node>, _: Boxed<Node>, _: CallerIdentity| {
                inner_events.lock().push(leaf.id);
                ChildVisitResult::Break
            });
            counts.lock().push(stopped);
        }
        outer_events.lock().push(cursor.id);
        ChildVisitResult::Continue
    });

    assert_eq!(count, 0);
    assert_eq!(*inner_counts.lock(), vec![1]);
    assert_eq!(*events.lock(), vec![L, C1, C2]);
    assert_eq!(dispatcher.registry().depth(identity), 0);
}

#[test]
fn test_nested_traversal_under_other_identity() {
    let dispatcher = Arc::new(Dispatcher::new(library()));
    let log: Log = Arc::new(Mutex::new(Vec::new()));

    let outer_dispatcher = Arc::clone(&dispatcher);
    let outer_log = Arc::clone(&log);
    let root = Boxed::new(Node { id: R });
    dispatcher.visit_children(&root, CallerIdentity(1), move |cursor: Boxed<Node>, parent: Boxed<Node>, id: CallerIdentity| {
        record(&outer_log, &outer_dispatcher, "V1", &cursor, &parent, id);

        if cursor.id == C1 {
            let inner_log = Arc::clone(&outer_log);
            let inner_dispatcher = Arc::clone(&outer_dispatcher);
            outer_dispatcher.visit_children(&cursor, CallerIdentity(2), move |leaf: Boxed<Node>, parent: Boxed<Node>, id: CallerIdentity| {
                record(&inner_log, &inner_dispatcher, "V2", &leaf, &parent, id);
                ChildVisitResult::Continue
            });
        }
        ChildVisitResult::Continue
    });

    let seen = log.lock().clone();
    let inner: Vec<&Seen> = seen.iter().filter(|s| s.visitor == "V2").collect();
    assert_eq!(inner.len(), 1, "inner visitor must run exactly once");
    assert_eq!(inner[0].node, "L");
    assert_eq!(inner[0].identity, CallerIdentity(2));
    assert_eq!((inner[0].depth_1, inner[0].depth_2), (1, 1));

    let outer: Vec<&Seen> = seen.iter().filter(|s| s.visitor == "V1").collect();
    assert_eq!(outer.iter().map(|s| s.node).collect::<Vec<_>>(), vec!["C1", "C2"]);
    assert!(outer.iter().all(|s| s.identity == CallerIdentity(1)));
    assert!(outer.iter().all(|s| (s.depth_1, s.depth_2) == (1, 0)));

    assert_eq!(dispatcher.registry().depth(CallerIdentity(1)), 0);
    assert_eq!(dispatcher.registry().depth(CallerIdentity(2)), 0);
}

#[test]
fn test_failed_check_inside_visitor_stops_traversal() {
    let dispatcher = Dispatcher::new(library());
    let visited = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&visited);

    let root = Boxed::new(Node { id: R });
    let count = dispatcher.visit_children(&root, CallerIdentity(9), move |cursor: Boxed<Node>, _: Boxed<Node>, _: CallerIdentity| {
        sink.lock().push(cursor.id);
        assert_ne!(cursor.id, C1, "visitor rejects C1");
        ChildVisitResult::Continue
    });

    // The panic is contained and reported to the library as Break
    assert_eq!(count, 1);
    assert_eq!(*visited.lock(), vec![C1]);
    assert_eq!(dispatcher.registry().depth(CallerIdentity(9)), 0);
}
