//! Identity registry and per-identity visitor stacks
//!
//! Each caller identity owns a LIFO stack of pending visitors. A traversal
//! pushes its visitor before calling into the wrapped library and pops it
//! once the library returns, so a visitor that starts a nested traversal
//! under the same identity gets its own frame and the outer visitor becomes
//! active again afterwards.
//!
//! Entries are created on first use and live as long as the registry. Their
//! number is bounded by the concurrently active execution contexts, not by
//! traversal volume, so lookup is a linear scan.
//!
//! Locking: the entry list is guarded for find-or-create, and every entry
//! guards its own stack. Visitors are cloned out of the stack before they
//! run, so no lock is held while user code executes. A single identity's
//! stack is expected to be driven by one thread of control at a time; two
//! threads interleaving pushes under the same identity get a consistent but
//! meaningless order.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::boxer::Record;
use crate::types::CallerIdentity;
use crate::visitor::Visitor;

/// Visitor as stored in a stack frame
pub type SharedVisitor<N> = Arc<dyn Visitor<N>>;

/// Registry record for one caller identity
pub struct IdentityEntry<N: Record> {
    identity: CallerIdentity,
    frames: Mutex<Vec<SharedVisitor<N>>>,
}

impl<N: Record> IdentityEntry<N> {
    fn new(identity: CallerIdentity) -> Self {
        Self {
            identity,
            frames: Mutex::new(Vec::new()),
        }
    }

    /// Identity this entry belongs to
    pub fn identity(&self) -> CallerIdentity {
        self.identity
    }

    /// Make `visitor` the active one
    pub fn push(&self, visitor: SharedVisitor<N>) {
        let mut frames = self.frames.lock();
        frames.push(visitor);
        log::trace!("push visitor for {} (depth {})", self.identity, frames.len());
    }

    /// Remove the active visitor, exposing the one beneath
    ///
    /// Popping an empty stack is a caller bug: it is logged and ignored.
    pub fn pop(&self) -> Option<SharedVisitor<N>> {
        let mut frames = self.frames.lock();
        match frames.pop() {
            Some(visitor) => {
                log::trace!("pop visitor for {} (depth {})", self.identity, frames.len());
                Some(visitor)
            }
            None => {
                log::error!(
                    "Visitor stack underflow: pop on empty stack for identity {}",
                    self.identity
                );
                None
            }
        }
    }

    /// Drop the frame pushed at `depth` and anything left above it
    ///
    /// A frame that is already gone is left alone, so frames beneath it
    /// survive.
    fn unwind_to(&self, depth: usize) {
        let mut frames = self.frames.lock();
        let current = frames.len();
        if current < depth {
            log::warn!(
                "Visitor frame at depth {} for identity {} already removed (depth {}), skipping pop",
                depth,
                self.identity,
                current
            );
            return;
        }
        if current > depth {
            log::warn!(
                "Unbalanced visitor stack for identity {}: expected depth {}, found {}",
                self.identity,
                depth,
                current
            );
        }
        frames.truncate(depth - 1);
        log::trace!("pop visitor for {} (depth {})", self.identity, frames.len());
    }

    /// Currently active visitor, if any
    pub fn top(&self) -> Option<SharedVisitor<N>> {
        self.frames.lock().last().cloned()
    }

    /// Number of pending visitors
    pub fn depth(&self) -> usize {
        self.frames.lock().len()
    }
}

/// Registry of identity entries
pub struct VisitorRegistry<N: Record> {
    entries: Mutex<Vec<Arc<IdentityEntry<N>>>>,
}

impl<N: Record> VisitorRegistry<N> {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
        }
    }

    /// Find the entry for `identity`, creating it with an empty stack
    ///
    /// Concurrent first uses of the same identity resolve to one entry.
    pub fn find_or_create(&self, identity: CallerIdentity) -> Arc<IdentityEntry<N>> {
        let mut entries = self.entries.lock();
        if let Some(entry) = entries.iter().find(|entry| entry.identity == identity) {
            return Arc::clone(entry);
        }

        log::debug!("Registering caller identity {}", identity);
        let entry = Arc::new(IdentityEntry::new(identity));
        entries.push(Arc::clone(&entry));
        entry
    }

    /// Push a visitor for `identity`
    pub fn push(&self, identity: CallerIdentity, visitor: SharedVisitor<N>) {
        self.find_or_create(identity).push(visitor);
    }

    /// Pop the active visitor for `identity`
    pub fn pop(&self, identity: CallerIdentity) -> Option<SharedVisitor<N>> {
        self.find_or_create(identity).pop()
    }

    /// Active visitor for `identity`
    pub fn top(&self, identity: CallerIdentity) -> Option<SharedVisitor<N>> {
        self.find_or_create(identity).top()
    }

    /// Stack depth for `identity`
    pub fn depth(&self, identity: CallerIdentity) -> usize {
        self.find_or_create(identity).depth()
    }

    /// Number of identities seen so far
    pub fn identity_count(&self) -> usize {
        self.entries.lock().len()
    }

    /// Push a visitor and get a guard that pops it when dropped
    pub fn register(&self, identity: CallerIdentity, visitor: SharedVisitor<N>) -> Registration<N> {
        let entry = self.find_or_create(identity);
        entry.push(visitor);
        let depth = entry.depth();
        Registration { entry, depth }
    }
}

impl<N: Record> Default for VisitorRegistry<N> {
    fn default() -> Self {
        Self::new()
    }
}

/// Pending visitor registration
///
/// Pops its own frame when dropped, on every exit path of the traversal it
/// brackets. Frames pushed beneath it are never touched.
pub struct Registration<N: Record> {
    entry: Arc<IdentityEntry<N>>,
    depth: usize,
}

impl<N: Record> Registration<N> {
    /// Entry the visitor was pushed onto
    pub fn entry(&self) -> &Arc<IdentityEntry<N>> {
        &self.entry
    }
}

impl<N: Record> Drop for Registration<N> {
    fn drop(&mut self) {
        self.entry.unwind_to(self.depth);
    }
}
