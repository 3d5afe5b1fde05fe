//! Core types for the visit bridge
//!
//! This module defines the small vocabulary shared by every layer of the
//! bridge: caller identities, the visitor result code understood by the
//! wrapped library, and the library error type.

use std::fmt;
use std::os::raw::c_int;
use std::path::PathBuf;

/// Result type for bridge operations
pub type Result<T> = std::result::Result<T, BridgeError>;

/// Opaque token identifying one logical execution context
///
/// Every traversal is started under an identity. Visitors registered under
/// one identity are never observed by traversals running under another.
/// The bridge imposes no structure on the value beyond uniqueness per
/// context; callers usually derive it from a thread or isolate index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CallerIdentity(pub u64);

impl CallerIdentity {
    /// Create an identity from a raw token
    pub const fn new(token: u64) -> Self {
        Self(token)
    }

    /// Get the raw token
    pub const fn token(self) -> u64 {
        self.0
    }
}

impl From<u64> for CallerIdentity {
    fn from(token: u64) -> Self {
        Self(token)
    }
}

impl From<i64> for CallerIdentity {
    fn from(token: i64) -> Self {
        // Foreign callers hand us `long long`; keep the bit pattern
        Self(token as u64)
    }
}

impl fmt::Display for CallerIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// What the wrapped library should do after a visitor returns
///
/// Values match libclang's `CXChildVisitResult`, so the code can be handed
/// back across the boundary unchanged.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChildVisitResult {
    /// Terminate the traversal
    Break = 0,
    /// Continue with the next sibling, skipping children
    Continue = 1,
    /// Descend into the children of the current node
    Recurse = 2,
}

impl ChildVisitResult {
    /// Convert a raw code returned by a foreign visitor
    ///
    /// Unknown codes stop the traversal.
    pub fn from_raw(code: c_int) -> Self {
        match code {
            1 => ChildVisitResult::Continue,
            2 => ChildVisitResult::Recurse,
            0 => ChildVisitResult::Break,
            other => {
                log::warn!("Unknown visitor result code {}, treating as Break", other);
                ChildVisitResult::Break
            }
        }
    }

    /// Raw code as passed back to the wrapped library
    pub fn as_raw(self) -> c_int {
        self as c_int
    }
}

impl fmt::Display for ChildVisitResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChildVisitResult::Break => write!(f, "Break"),
            ChildVisitResult::Continue => write!(f, "Continue"),
            ChildVisitResult::Recurse => write!(f, "Recurse"),
        }
    }
}

/// Errors that can occur while loading or driving the wrapped library
///
/// Stack underflow is not listed: it is logged and absorbed by the
/// registry, never returned.
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    #[error("libclang not found (searched: {searched:?})")]
    LibraryNotFound { searched: Vec<PathBuf> },

    #[error("Failed to load library {path:?}: {source}")]
    LibraryLoad {
        path: PathBuf,
        #[source]
        source: libloading::Error,
    },

    #[error("Symbol missing from wrapped library: {0}")]
    SymbolMissing(String),

    #[error("Wrapped library has not been loaded")]
    LibraryNotLoaded,

    #[error("Failed to parse translation unit: {0}")]
    TranslationUnitParse(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
