//! libclang binding
//!
//! Runtime-loaded libclang, the by-value records it trades in, a forwarding
//! layer that boxes every returned record, owned index and translation unit
//! handles, and the C-ABI surface for foreign callers.

pub mod exports;
pub mod ffi;
pub mod forward;
pub mod library;
pub mod unit;

use std::sync::Arc;

use parking_lot::Mutex;

pub use ffi::{CXCursor, CXSourceLocation, CXSourceRange, CXString, CXType};
pub use forward::{Evaluated, FileLocation};
pub use library::{load, loaded, require, Clang};
pub use unit::{Diagnostic, Index, Severity, TranslationUnit};

use crate::boxer::Boxed;
use crate::dispatcher::Dispatcher;
use crate::types::{CallerIdentity, ChildVisitResult};

/// Dispatcher over the process-wide libclang
pub type ClangDispatcher = Dispatcher<&'static Clang>;

/// One line per top-level cursor of `unit`: `Cursor- kind: <kind>, name: <name>`
pub fn dump_children(dispatcher: &ClangDispatcher, unit: &TranslationUnit<'_>, identity: CallerIdentity) -> Vec<String> {
    let clang: &'static Clang = *dispatcher.library();
    let lines = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&lines);

    let root = unit.cursor();
    dispatcher.visit_children(
        &root,
        identity,
        move |cursor: Boxed<CXCursor>, _parent: Boxed<CXCursor>, _: CallerIdentity| {
            let kind = clang.string_text(&clang.cursor_kind_spelling(clang.cursor_kind(&cursor)));
            let name = clang.string_text(&clang.cursor_spelling(&cursor));
            sink.lock().push(format!("Cursor- kind: {}, name: {}", kind, name));
            ChildVisitResult::Continue
        },
    );

    let lines = std::mem::take(&mut *lines.lock());
    lines
}
