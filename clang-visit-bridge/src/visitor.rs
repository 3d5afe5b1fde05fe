//! Visitor capability
//!
//! A visitor is the caller-supplied logic run once per node during a
//! traversal. Inside Rust it is a typed closure, so captured state travels
//! with it. Foreign callers that can only provide a bare function pointer
//! are wrapped in [`RawVisitor`].

use std::os::raw::{c_int, c_void};

use crate::boxer::{Boxed, Record};
use crate::types::{CallerIdentity, ChildVisitResult};

/// Callback invoked for every node the wrapped library visits
///
/// Both records are freshly boxed for this call and owned by the visitor.
pub trait Visitor<N: Record>: Send + Sync {
    fn visit(&self, cursor: Boxed<N>, parent: Boxed<N>, identity: CallerIdentity)
        -> ChildVisitResult;
}

impl<N, F> Visitor<N> for F
where
    N: Record,
    F: Fn(Boxed<N>, Boxed<N>, CallerIdentity) -> ChildVisitResult + Send + Sync,
{
    fn visit(
        &self,
        cursor: Boxed<N>,
        parent: Boxed<N>,
        identity: CallerIdentity,
    ) -> ChildVisitResult {
        self(cursor, parent, identity)
    }
}

/// Pointer-only visitor signature used by foreign callers
///
/// `client_data` points at the caller identity as a signed 64-bit integer
/// and is only valid for the duration of the call.
pub type ForeignVisitor<N> =
    unsafe extern "C" fn(cursor: *mut N, parent: *mut N, client_data: *mut c_void) -> c_int;

/// Adapts a foreign function pointer to [`Visitor`]
///
/// Ownership of both boxed records passes to the foreign callback, which
/// must release them through the matching disposer.
pub struct RawVisitor<N: Record> {
    callback: ForeignVisitor<N>,
}

impl<N: Record> RawVisitor<N> {
    pub fn new(callback: ForeignVisitor<N>) -> Self {
        Self { callback }
    }
}

impl<N: Record> Visitor<N> for RawVisitor<N> {
    fn visit(
        &self,
        cursor: Boxed<N>,
        parent: Boxed<N>,
        identity: CallerIdentity,
    ) -> ChildVisitResult {
        let mut token = identity.token() as i64;
        let client_data = &mut token as *mut i64 as *mut c_void;

        // SAFETY: the foreign side promised the signature when registering
        let code = unsafe { (self.callback)(cursor.into_raw(), parent.into_raw(), client_data) };
        ChildVisitResult::from_raw(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::boxer::dispose_raw;

    #[derive(Debug, Clone, Copy)]
    #[repr(C)]
    struct Leaf(u32);

    impl Record for Leaf {
        const KIND: &'static str = "test.leaf";
    }

    unsafe extern "C" fn foreign_visit(
        cursor: *mut Leaf,
        parent: *mut Leaf,
        client_data: *mut c_void,
    ) -> c_int {
        let uid = *(client_data as *const i64);
        let code = if (*cursor).0 == 1 && (*parent).0 == 0 && uid == 9 { 2 } else { 0 };
        dispose_raw(cursor);
        dispose_raw(parent);
        code
    }

    #[test]
    fn test_closure_is_a_visitor() {
        let visitor = |cursor: Boxed<Leaf>, _parent: Boxed<Leaf>, _id: CallerIdentity| {
            if cursor.0 % 2 == 0 {
                ChildVisitResult::Recurse
            } else {
                ChildVisitResult::Continue
            }
        };
        let result = visitor.visit(Boxed::new(Leaf(4)), Boxed::new(Leaf(0)), CallerIdentity(1));
        assert_eq!(result, ChildVisitResult::Recurse);
    }

    #[test]
    fn test_raw_visitor_forwards_pointers_and_identity() {
        let visitor = RawVisitor::new(foreign_visit);
        let result = visitor.visit(Boxed::new(Leaf(1)), Boxed::new(Leaf(0)), CallerIdentity(9));
        assert_eq!(result, ChildVisitResult::Recurse);

        let result = visitor.visit(Boxed::new(Leaf(1)), Boxed::new(Leaf(0)), CallerIdentity(8));
        assert_eq!(result, ChildVisitResult::Break);
    }
}
