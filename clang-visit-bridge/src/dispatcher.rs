//! Traversal driver
//!
//! [`Dispatcher`] ties a wrapped library to its visitor registry. Every call
//! to [`Dispatcher::visit_children`] registers the visitor under the caller's
//! identity, hands the trampoline to the library's traversal entry point,
//! and pops the registration once the entry point returns:
//!
//! ```text
//! Idle --push--> Registered --native call--> Active --return, pop--> Done
//! ```
//!
//! The pop is tied to a guard, so it also runs when the traversal is cut
//! short by a `Break` or by a panic on the Rust side.

use std::os::raw::{c_uint, c_void};
use std::sync::Arc;

use crate::boxer::{Boxed, Record};
use crate::registry::{SharedVisitor, VisitorRegistry};
use crate::trampoline::{trampoline, NativeVisitor, TraversalContext};
use crate::types::{BridgeError, CallerIdentity, Result};
use crate::visitor::{ForeignVisitor, RawVisitor, Visitor};

/// Traversal entry point of a wrapped library
pub trait NativeTraversal {
    /// Record type the library passes by value to its visitor
    type Node: Record;

    /// Walk the children of `root`, calling `visitor` for each one
    ///
    /// # Safety
    /// `client_data` must be passed through to `visitor` untouched, and the
    /// visitor must only be called before this function returns.
    unsafe fn visit_children(
        &self,
        root: Self::Node,
        visitor: NativeVisitor<Self::Node>,
        client_data: *mut c_void,
    ) -> c_uint;
}

/// Drives traversals of a wrapped library on behalf of many callers
pub struct Dispatcher<L: NativeTraversal> {
    library: L,
    registry: VisitorRegistry<L::Node>,
}

impl<L: NativeTraversal> Dispatcher<L> {
    /// Create a dispatcher with an empty registry
    pub fn new(library: L) -> Self {
        Self {
            library,
            registry: VisitorRegistry::new(),
        }
    }

    /// The wrapped library
    pub fn library(&self) -> &L {
        &self.library
    }

    /// The visitor registry
    pub fn registry(&self) -> &VisitorRegistry<L::Node> {
        &self.registry
    }

    /// Visit the children of `root` under `identity`
    ///
    /// The visitor may itself call `visit_children` again, under the same
    /// identity or another one. Returns the entry point's result unchanged.
    pub fn visit_children<V>(&self, root: &Boxed<L::Node>, identity: CallerIdentity, visitor: V) -> u32
    where
        V: Visitor<L::Node> + 'static,
    {
        self.visit_children_shared(root, identity, Arc::new(visitor))
    }

    /// Same as [`Dispatcher::visit_children`] with an already shared visitor
    pub fn visit_children_shared(
        &self,
        root: &Boxed<L::Node>,
        identity: CallerIdentity,
        visitor: SharedVisitor<L::Node>,
    ) -> u32 {
        let registration = self.registry.register(identity, visitor);
        let context = TraversalContext {
            entry: Arc::clone(registration.entry()),
        };

        log::trace!("visit_children for {} (depth {})", identity, context.entry.depth());

        // SAFETY: context outlives the native call and is only read by the
        // trampoline during it
        let count = unsafe {
            self.library
                .visit_children(root.get(), trampoline::<L::Node>, context.as_client_data())
        };

        drop(registration);
        count
    }

    /// Visit the children of a root handed over by a foreign caller
    ///
    /// The root stays owned by the caller. Every visited cursor and parent
    /// is handed to `callback` as an owning pointer.
    ///
    /// # Safety
    /// `root` must be null or point to a live record of the node kind.
    pub unsafe fn visit_children_raw(
        &self,
        root: *const L::Node,
        callback: ForeignVisitor<L::Node>,
        identity: CallerIdentity,
    ) -> Result<u32> {
        if root.is_null() {
            return Err(BridgeError::InvalidArgument(
                "null root passed to visit_children".to_string(),
            ));
        }

        let root = Boxed::new(*root);
        Ok(self.visit_children(&root, identity, RawVisitor::new(callback)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ChildVisitResult;
    use parking_lot::Mutex;

    #[derive(Debug, Clone, Copy, PartialEq)]
    #[repr(C)]
    struct Slot(u32);

    impl Record for Slot {
        const KIND: &'static str = "test.dispatcher-slot";
    }

    /// Library whose root `Slot(n)` has children `Slot(1)..=Slot(n)`
    struct FlatLibrary;

    impl NativeTraversal for FlatLibrary {
        type Node = Slot;

        unsafe fn visit_children(
            &self,
            root: Slot,
            visitor: NativeVisitor<Slot>,
            client_data: *mut c_void,
        ) -> c_uint {
            for child in 1..=root.0 {
                if visitor(Slot(child), root, client_data) == ChildVisitResult::Break.as_raw() {
                    return 1;
                }
            }
            0
        }
    }

    #[test]
    fn test_visits_every_child_and_pops() {
        let dispatcher = Dispatcher::new(FlatLibrary);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);

        let root = Boxed::new(Slot(3));
        let count = dispatcher.visit_children(
            &root,
            CallerIdentity(1),
            move |cursor: Boxed<Slot>, parent: Boxed<Slot>, _: CallerIdentity| {
                sink.lock().push((cursor.0, parent.0));
                ChildVisitResult::Continue
            },
        );

        assert_eq!(count, 0);
        assert_eq!(*seen.lock(), vec![(1, 3), (2, 3), (3, 3)]);
        assert_eq!(dispatcher.registry().depth(CallerIdentity(1)), 0);
    }

    #[test]
    fn test_break_stops_and_still_pops() {
        let dispatcher = Dispatcher::new(FlatLibrary);
        let root = Boxed::new(Slot(5));
        let count = dispatcher.visit_children(
            &root,
            CallerIdentity(2),
            |cursor: Boxed<Slot>, _: Boxed<Slot>, _: CallerIdentity| {
                if cursor.0 == 2 {
                    ChildVisitResult::Break
                } else {
                    ChildVisitResult::Continue
                }
            },
        );

        assert_eq!(count, 1);
        assert_eq!(dispatcher.registry().depth(CallerIdentity(2)), 0);
    }

    #[test]
    fn test_raw_entry_rejects_null_root() {
        unsafe extern "C" fn never(_: *mut Slot, _: *mut Slot, _: *mut c_void) -> std::os::raw::c_int {
            0
        }

        let dispatcher = Dispatcher::new(FlatLibrary);
        let result = unsafe { dispatcher.visit_children_raw(std::ptr::null(), never, CallerIdentity(3)) };
        assert!(matches!(result, Err(BridgeError::InvalidArgument(_))));
    }
}
