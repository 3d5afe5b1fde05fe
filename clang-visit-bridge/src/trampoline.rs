//! Trampoline handed to the wrapped library as its literal callback
//!
//! The wrapped library calls the trampoline with records by value and the
//! client data pointer it was given at traversal start. The trampoline boxes
//! both records, reads the caller identity from the client data, resolves
//! the active visitor for that identity and forwards to it. The visitor's
//! result code goes back to the library unchanged.
//!
//! The library may re-enter the trampoline before a previous invocation
//! returns (nested traversals started from a visitor). This is sound because
//! the active visitor is re-resolved on every call and nothing is cached
//! between calls.

use std::os::raw::{c_int, c_void};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use crate::boxer::{Boxed, Record};
use crate::registry::IdentityEntry;
use crate::types::ChildVisitResult;

/// By-value visitor signature of the wrapped library
pub type NativeVisitor<N> = extern "C" fn(cursor: N, parent: N, client_data: *mut c_void) -> c_int;

/// Client data for one traversal
///
/// Lives on the stack of the traversal driver for the duration of the
/// native call; the wrapped library only ever sees it as an opaque pointer.
pub(crate) struct TraversalContext<N: Record> {
    pub(crate) entry: Arc<IdentityEntry<N>>,
}

impl<N: Record> TraversalContext<N> {
    pub(crate) fn as_client_data(&self) -> *mut c_void {
        self as *const Self as *mut c_void
    }
}

/// The callback registered with the wrapped library
#[allow(improper_ctypes_definitions)]
pub(crate) extern "C" fn trampoline<N: Record>(
    cursor: N,
    parent: N,
    client_data: *mut c_void,
) -> c_int {
    let cursor = Boxed::new(cursor);
    let parent = Boxed::new(parent);

    if client_data.is_null() {
        log::error!("Trampoline invoked without client data, stopping traversal");
        return ChildVisitResult::Break.as_raw();
    }

    // SAFETY: client_data is the TraversalContext installed by the driver,
    // which outlives the native call that is invoking us
    let context = unsafe { &*(client_data as *const TraversalContext<N>) };
    let identity = context.entry.identity();

    let visitor = match context.entry.top() {
        Some(visitor) => visitor,
        None => {
            log::error!("No active visitor for identity {}, stopping traversal", identity);
            return ChildVisitResult::Break.as_raw();
        }
    };

    // Unwinding must not cross into the wrapped library
    match panic::catch_unwind(AssertUnwindSafe(|| visitor.visit(cursor, parent, identity))) {
        Ok(result) => result.as_raw(),
        Err(_) => {
            log::error!("Visitor for identity {} panicked, stopping traversal", identity);
            ChildVisitResult::Break.as_raw()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::VisitorRegistry;
    use crate::types::CallerIdentity;
    use std::ptr;

    #[derive(Debug, Clone, Copy)]
    #[repr(C)]
    struct Node(u32);

    impl Record for Node {
        const KIND: &'static str = "test.trampoline-node";
    }

    #[test]
    fn test_forwards_to_active_visitor() {
        let registry = VisitorRegistry::<Node>::new();
        let id = CallerIdentity(12);
        let seen = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let _registration = registry.register(
            id,
            Arc::new(move |cursor: Boxed<Node>, parent: Boxed<Node>, identity: CallerIdentity| {
                sink.lock().push((identity, cursor.0, parent.0));
                if cursor.0 > parent.0 {
                    ChildVisitResult::Recurse
                } else {
                    ChildVisitResult::Continue
                }
            }),
        );

        let context = TraversalContext { entry: registry.find_or_create(id) };
        let code = trampoline(Node(2), Node(1), context.as_client_data());
        assert_eq!(code, ChildVisitResult::Recurse.as_raw());
        let code = trampoline(Node(1), Node(2), context.as_client_data());
        assert_eq!(code, ChildVisitResult::Continue.as_raw());

        assert_eq!(*seen.lock(), vec![(CallerIdentity(12), 2, 1), (CallerIdentity(12), 1, 2)]);
    }

    #[test]
    fn test_breaks_without_visitor_or_context() {
        let registry = VisitorRegistry::<Node>::new();
        let context = TraversalContext { entry: registry.find_or_create(CallerIdentity(1)) };

        let code = trampoline(Node(1), Node(0), context.as_client_data());
        assert_eq!(code, ChildVisitResult::Break.as_raw());

        let code = trampoline(Node(1), Node(0), ptr::null_mut());
        assert_eq!(code, ChildVisitResult::Break.as_raw());
    }

    #[test]
    fn test_panicking_visitor_stops_traversal() {
        let registry = VisitorRegistry::<Node>::new();
        let id = CallerIdentity(13);
        let _registration = registry.register(
            id,
            Arc::new(|_: Boxed<Node>, _: Boxed<Node>, _: CallerIdentity| -> ChildVisitResult {
                panic!("visitor failure")
            }),
        );

        let context = TraversalContext { entry: registry.find_or_create(id) };
        let code = trampoline(Node(1), Node(0), context.as_client_data());
        assert_eq!(code, ChildVisitResult::Break.as_raw());
    }
}
