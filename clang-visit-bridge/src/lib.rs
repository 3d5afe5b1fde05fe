//! Clang Visit Bridge Library
//!
//! A bridge between a native tree-traversal library that hands records to its
//! visitor *by value* and callers that can only deal in pointers and
//! primitives.
//!
//! # Features
//!
//! - Owning heap handles for every by-value record that crosses the boundary
//! - Per-caller-identity visitor stacks, so visitors may start nested
//!   traversals of their own
//! - Concurrent traversals under distinct identities
//! - Runtime-loaded libclang with a boxing forwarding layer and a C ABI
//!
//! # Example
//!
//! ```ignore
//! use clang_visit_bridge::clang::{self, ClangDispatcher, Index};
//! use clang_visit_bridge::{CallerIdentity, ChildVisitResult, Dispatcher, LoaderConfig};
//!
//! let libclang = clang::load(&LoaderConfig::new())?;
//! let index = Index::new(libclang, false, false)?;
//! let unit = index.parse("header.h".as_ref(), &[], 0)?;
//!
//! let dispatcher: ClangDispatcher = Dispatcher::new(libclang);
//! for line in clang::dump_children(&dispatcher, &unit, CallerIdentity(1)) {
//!     println!("{}", line);
//! }
//! ```

pub mod boxer;
pub mod clang;
pub mod config;
pub mod dispatcher;
pub mod ledger;
pub mod registry;
pub mod types;
pub mod visitor;

mod trampoline;

// Re-export main types
pub use boxer::{dispose_raw, Boxed, Record};
pub use config::{LoaderConfig, LIBCLANG_PATH_ENV};
pub use dispatcher::{Dispatcher, NativeTraversal};
pub use ledger::KindStats;
pub use registry::{IdentityEntry, Registration, SharedVisitor, VisitorRegistry};
pub use trampoline::NativeVisitor;
pub use types::{BridgeError, CallerIdentity, ChildVisitResult, Result};
pub use visitor::{ForeignVisitor, RawVisitor, Visitor};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
