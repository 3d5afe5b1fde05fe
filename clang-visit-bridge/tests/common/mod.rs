//! In-process stand-in for a by-value traversal library
//!
//! `TreeLibrary` walks a fixed tree of `Node` records and calls its visitor
//! through a plain `extern "C"` function pointer, passing records by value
//! the same way libclang does. `Label` plays the role of a string record:
//! every label owns a counted sub-resource that its release hook gives back.

#![allow(dead_code)]

use std::collections::HashMap;
use std::os::raw::{c_uint, c_void};
use std::sync::atomic::{AtomicI64, Ordering};

use clang_visit_bridge::{Boxed, ChildVisitResult, NativeTraversal, NativeVisitor, Record};

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Node {
    pub id: u32,
}

impl Record for Node {
    const KIND: &'static str = "fixture.node";
}

static LIVE_LABELS: AtomicI64 = AtomicI64::new(0);

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct Label {
    pub id: u32,
}

impl Label {
    fn issue(id: u32) -> Self {
        LIVE_LABELS.fetch_add(1, Ordering::SeqCst);
        Self { id }
    }
}

impl Record for Label {
    const KIND: &'static str = "fixture.label";

    fn release(&mut self) {
        LIVE_LABELS.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Labels issued and not yet released
pub fn live_labels() -> i64 {
    LIVE_LABELS.load(Ordering::SeqCst)
}

/// Fixed tree keyed by node id
pub struct TreeLibrary {
    children: HashMap<u32, Vec<u32>>,
}

impl TreeLibrary {
    /// Build from `(parent, children)` pairs
    pub fn new(edges: &[(u32, &[u32])]) -> Self {
        let children = edges
            .iter()
            .map(|(parent, kids)| (*parent, kids.to_vec()))
            .collect();
        Self { children }
    }

    /// `root` with `width` leaf children numbered `root * 1000 + 1..`
    pub fn flat(root: u32, width: u32) -> Self {
        let kids: Vec<u32> = (1..=width).map(|i| root * 1000 + i).collect();
        Self::new(&[(root, &kids)])
    }

    /// Accessor that allocates, like a spelling query
    pub fn label(&self, node: &Node) -> Boxed<Label> {
        Boxed::new(Label::issue(node.id))
    }

    /// Returns true when the visitor asked to stop
    fn walk(&self, parent: Node, visitor: NativeVisitor<Node>, client_data: *mut c_void) -> bool {
        let Some(kids) = self.children.get(&parent.id) else {
            return false;
        };

        for &id in kids {
            let child = Node { id };
            match ChildVisitResult::from_raw(visitor(child, parent, client_data)) {
                ChildVisitResult::Break => return true,
                ChildVisitResult::Continue => {}
                ChildVisitResult::Recurse => {
                    if self.walk(child, visitor, client_data) {
                        return true;
                    }
                }
            }
        }
        false
    }
}

impl NativeTraversal for TreeLibrary {
    type Node = Node;

    unsafe fn visit_children(
        &self,
        root: Node,
        visitor: NativeVisitor<Node>,
        client_data: *mut c_void,
    ) -> c_uint {
        self.walk(root, visitor, client_data) as c_uint
    }
}

/// Route bridge logs to the test harness
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}
