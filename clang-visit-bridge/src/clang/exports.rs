//! C-ABI surface for foreign callers
//!
//! Callers that can only pass primitives and pointers (a binding generator
//! driven from another runtime, for example) use these functions instead of
//! libclang's by-value API. Every record comes back as an owning pointer that
//! must be released with the matching `clang_dispose*_wrap` function.
//!
//! All functions need the process-wide library (`bridge_load_libclang`).
//! Without it they log an error and return null, zero or -1.
//! `clang_visitChildren_wrap` reports failure as [`VISIT_FAILED`].

#![allow(non_snake_case)]

use std::ffi::CStr;
use std::os::raw::{c_char, c_int, c_longlong, c_uint, c_ulonglong};
use std::ptr;

use crate::boxer::{dispose_raw, Boxed, Record};
use crate::config::LoaderConfig;
use crate::dispatcher::Dispatcher;
use crate::types::{CallerIdentity, Result};
use crate::visitor::ForeignVisitor;

use super::ffi::*;
use super::library::{self, Clang};
use super::ClangDispatcher;

fn library_or_log() -> Option<&'static Clang> {
    match library::require() {
        Ok(clang) => Some(clang),
        Err(e) => {
            log::error!("{}; call bridge_load_libclang first", e);
            None
        }
    }
}

/// Apply `f` to the record behind `input` and box the result
unsafe fn forward<T: Record, R: Record>(
    input: *const T,
    f: impl FnOnce(&'static Clang, &T) -> Boxed<R>,
) -> *mut R {
    match (library_or_log(), input.as_ref()) {
        (Some(clang), Some(record)) => f(clang, record).into_raw(),
        _ => ptr::null_mut(),
    }
}

/// Apply `f` to the record behind `input`, `fallback` when unavailable
unsafe fn query<T: Record, V>(input: *const T, fallback: V, f: impl FnOnce(&'static Clang, &T) -> V) -> V {
    match (library_or_log(), input.as_ref()) {
        (Some(clang), Some(record)) => f(clang, record),
        _ => fallback,
    }
}

// ===== Library and dispatcher lifecycle =====

/// Load libclang from `path`, or from the default locations when null
///
/// Returns 1 on success, 0 on failure.
#[no_mangle]
pub unsafe extern "C" fn bridge_load_libclang(path: *const c_char) -> c_int {
    let mut config = LoaderConfig::new();
    if !path.is_null() {
        config = config.with_library_path(CStr::from_ptr(path).to_string_lossy().into_owned());
    }

    match library::load(&config) {
        Ok(_) => 1,
        Err(e) => {
            log::error!("Failed to load libclang: {}", e);
            0
        }
    }
}

/// Create a dispatcher owning its own visitor registry
#[no_mangle]
pub extern "C" fn bridge_dispatcher_new() -> *mut ClangDispatcher {
    match library_or_log() {
        Some(clang) => Box::into_raw(Box::new(Dispatcher::new(clang))),
        None => ptr::null_mut(),
    }
}

/// Release a dispatcher created by `bridge_dispatcher_new`
#[no_mangle]
pub unsafe extern "C" fn bridge_dispatcher_free(dispatcher: *mut ClangDispatcher) {
    if !dispatcher.is_null() {
        drop(Box::from_raw(dispatcher));
    }
}

// ===== Disposers =====

#[no_mangle]
pub unsafe extern "C" fn clang_disposeString_wrap(string: *mut CXString) {
    dispose_raw(string);
}

#[no_mangle]
pub unsafe extern "C" fn clang_disposeCursor_wrap(cursor: *mut CXCursor) {
    dispose_raw(cursor);
}

#[no_mangle]
pub unsafe extern "C" fn clang_disposeType_wrap(ty: *mut CXType) {
    dispose_raw(ty);
}

#[no_mangle]
pub unsafe extern "C" fn clang_disposeSourceLocation_wrap(location: *mut CXSourceLocation) {
    dispose_raw(location);
}

#[no_mangle]
pub unsafe extern "C" fn clang_disposeSourceRange_wrap(range: *mut CXSourceRange) {
    dispose_raw(range);
}

// ===== Traversal =====

/// Returned by `clang_visitChildren_wrap` when no traversal ran
///
/// libclang only ever returns 0 (completed) or 1 (stopped by a visitor), so
/// this value cannot be mistaken for a traversal result.
pub const VISIT_FAILED: c_uint = c_uint::MAX;

fn traversal_status(result: Result<c_uint>) -> c_uint {
    match result {
        Ok(code) => code,
        Err(e) => {
            log::error!("clang_visitChildren_wrap: {}", e);
            VISIT_FAILED
        }
    }
}

/// Visit the children of `parent` with a pointer-taking visitor
///
/// `uid` identifies the calling execution context. The visitor receives
/// owning cursor pointers and a pointer to `uid` as client data.
///
/// Returns libclang's result: 0 when the traversal completed, nonzero when a
/// visitor stopped it. A null `dispatcher` or `parent` returns
/// [`VISIT_FAILED`] without calling the visitor.
#[no_mangle]
pub unsafe extern "C" fn clang_visitChildren_wrap(
    dispatcher: *const ClangDispatcher,
    parent: *const CXCursor,
    visitor: ForeignVisitor<CXCursor>,
    uid: c_longlong,
) -> c_uint {
    let Some(dispatcher) = dispatcher.as_ref() else {
        log::error!("clang_visitChildren_wrap called with a null dispatcher");
        return VISIT_FAILED;
    };

    traversal_status(dispatcher.visit_children_raw(parent, visitor, CallerIdentity::from(uid)))
}

// ===== Forwarding wrappers =====

#[no_mangle]
pub unsafe extern "C" fn clang_getCString_wrap(string: *const CXString) -> *const c_char {
    query(string, ptr::null(), |clang, s| (clang.fns.get_c_string)(*s))
}

#[no_mangle]
pub unsafe extern "C" fn clang_getCursorKind_wrap(cursor: *const CXCursor) -> CXCursorKind {
    query(cursor, 0, |clang, c| clang.cursor_kind(c))
}

#[no_mangle]
pub extern "C" fn clang_getCursorKindSpelling_wrap(kind: CXCursorKind) -> *mut CXString {
    match library_or_log() {
        Some(clang) => clang.cursor_kind_spelling(kind).into_raw(),
        None => ptr::null_mut(),
    }
}

#[no_mangle]
pub unsafe extern "C" fn clang_getCursorType_wrap(cursor: *const CXCursor) -> *mut CXType {
    forward(cursor, |clang, c| clang.cursor_type(c))
}

#[no_mangle]
pub unsafe extern "C" fn clang_getTypeSpelling_wrap(ty: *const CXType) -> *mut CXString {
    forward(ty, |clang, t| clang.type_spelling(t))
}

#[no_mangle]
pub extern "C" fn clang_getTypeKindSpelling_wrap(kind: CXTypeKind) -> *mut CXString {
    match library_or_log() {
        Some(clang) => clang.type_kind_spelling(kind).into_raw(),
        None => ptr::null_mut(),
    }
}

#[no_mangle]
pub unsafe extern "C" fn clang_getResultType_wrap(function_type: *const CXType) -> *mut CXType {
    forward(function_type, |clang, t| clang.result_type(t))
}

#[no_mangle]
pub unsafe extern "C" fn clang_getPointeeType_wrap(pointer_type: *const CXType) -> *mut CXType {
    forward(pointer_type, |clang, t| clang.pointee_type(t))
}

#[no_mangle]
pub unsafe extern "C" fn clang_getCanonicalType_wrap(ty: *const CXType) -> *mut CXType {
    forward(ty, |clang, t| clang.canonical_type(t))
}

#[no_mangle]
pub unsafe extern "C" fn clang_Type_getNamedType_wrap(elaborated_type: *const CXType) -> *mut CXType {
    forward(elaborated_type, |clang, t| clang.named_type(t))
}

#[no_mangle]
pub unsafe extern "C" fn clang_getTypeDeclaration_wrap(ty: *const CXType) -> *mut CXCursor {
    forward(ty, |clang, t| clang.type_declaration(t))
}

#[no_mangle]
pub unsafe extern "C" fn clang_getTypedefDeclUnderlyingType_wrap(cursor: *const CXCursor) -> *mut CXType {
    forward(cursor, |clang, c| clang.typedef_underlying_type(c))
}

#[no_mangle]
pub unsafe extern "C" fn clang_getCursorSpelling_wrap(cursor: *const CXCursor) -> *mut CXString {
    forward(cursor, |clang, c| clang.cursor_spelling(c))
}

#[no_mangle]
pub unsafe extern "C" fn clang_getTranslationUnitCursor_wrap(unit: CXTranslationUnit) -> *mut CXCursor {
    match library_or_log() {
        Some(clang) if !unit.is_null() => clang.translation_unit_cursor(unit).into_raw(),
        _ => ptr::null_mut(),
    }
}

#[no_mangle]
pub unsafe extern "C" fn clang_formatDiagnostic_wrap(diagnostic: CXDiagnostic, options: c_int) -> *mut CXString {
    match library_or_log() {
        Some(clang) if !diagnostic.is_null() => clang.format_diagnostic(diagnostic, options as c_uint).into_raw(),
        _ => ptr::null_mut(),
    }
}

#[no_mangle]
pub unsafe extern "C" fn clang_Cursor_getNumArguments_wrap(cursor: *const CXCursor) -> c_int {
    query(cursor, -1, |clang, c| clang.num_arguments(c))
}

#[no_mangle]
pub unsafe extern "C" fn clang_Cursor_getArgument_wrap(cursor: *const CXCursor, index: c_uint) -> *mut CXCursor {
    forward(cursor, |clang, c| clang.argument(c, index))
}

#[no_mangle]
pub unsafe extern "C" fn clang_getNumArgTypes_wrap(ty: *const CXType) -> c_int {
    query(ty, -1, |clang, t| clang.num_arg_types(t))
}

#[no_mangle]
pub unsafe extern "C" fn clang_getArgType_wrap(ty: *const CXType, index: c_uint) -> *mut CXType {
    forward(ty, |clang, t| clang.arg_type(t, index))
}

#[no_mangle]
pub unsafe extern "C" fn clang_getEnumConstantDeclValue_wrap(cursor: *const CXCursor) -> c_longlong {
    query(cursor, 0, |clang, c| clang.enum_constant_value(c))
}

/// Non-zero if the ranges are the same, zero if they differ
#[no_mangle]
pub unsafe extern "C" fn clang_equalRanges_wrap(a: *const CXSourceRange, b: *const CXSourceRange) -> c_uint {
    match (library_or_log(), a.as_ref(), b.as_ref()) {
        (Some(clang), Some(a), Some(b)) => clang.equal_ranges(a, b) as c_uint,
        _ => 0,
    }
}

#[no_mangle]
pub unsafe extern "C" fn clang_Cursor_getCommentRange_wrap(cursor: *const CXCursor) -> *mut CXSourceRange {
    forward(cursor, |clang, c| clang.comment_range(c))
}

#[no_mangle]
pub unsafe extern "C" fn clang_Cursor_getRawCommentText_wrap(cursor: *const CXCursor) -> *mut CXString {
    forward(cursor, |clang, c| clang.raw_comment_text(c))
}

#[no_mangle]
pub unsafe extern "C" fn clang_Cursor_getBriefCommentText_wrap(cursor: *const CXCursor) -> *mut CXString {
    forward(cursor, |clang, c| clang.brief_comment_text(c))
}

#[no_mangle]
pub unsafe extern "C" fn clang_getCursorLocation_wrap(cursor: *const CXCursor) -> *mut CXSourceLocation {
    forward(cursor, |clang, c| clang.cursor_location(c))
}

#[no_mangle]
pub unsafe extern "C" fn clang_getFileLocation_wrap(
    location: *const CXSourceLocation,
    file: *mut CXFile,
    line: *mut c_uint,
    column: *mut c_uint,
    offset: *mut c_uint,
) {
    query(location, (), |clang, l| clang.file_location_raw(l, file, line, column, offset))
}

#[no_mangle]
pub unsafe extern "C" fn clang_getFileName_wrap(file: CXFile) -> *mut CXString {
    match library_or_log() {
        Some(clang) if !file.is_null() => clang.file_name(file).into_raw(),
        _ => ptr::null_mut(),
    }
}

#[no_mangle]
pub unsafe extern "C" fn clang_getNumElements_wrap(ty: *const CXType) -> c_ulonglong {
    query(ty, 0, |clang, t| clang.num_elements(t) as c_ulonglong)
}

#[no_mangle]
pub unsafe extern "C" fn clang_getArrayElementType_wrap(ty: *const CXType) -> *mut CXType {
    forward(ty, |clang, t| clang.array_element_type(t))
}

#[no_mangle]
pub unsafe extern "C" fn clang_Cursor_isMacroFunctionLike_wrap(cursor: *const CXCursor) -> c_uint {
    query(cursor, 0, |clang, c| clang.is_macro_function_like(c) as c_uint)
}

#[no_mangle]
pub unsafe extern "C" fn clang_Cursor_isMacroBuiltin_wrap(cursor: *const CXCursor) -> c_uint {
    query(cursor, 0, |clang, c| clang.is_macro_builtin(c) as c_uint)
}

/// Opaque evaluation handle, released with libclang's own dispose call
#[no_mangle]
pub unsafe extern "C" fn clang_Cursor_Evaluate_wrap(cursor: *const CXCursor) -> CXEvalResult {
    query(cursor, ptr::null_mut(), |clang, c| clang.evaluate_raw(c))
}

#[no_mangle]
pub unsafe extern "C" fn clang_Cursor_isAnonymous_wrap(cursor: *const CXCursor) -> c_uint {
    query(cursor, 0, |clang, c| clang.is_anonymous(c) as c_uint)
}

#[no_mangle]
pub unsafe extern "C" fn clang_Cursor_isAnonymousRecordDecl_wrap(cursor: *const CXCursor) -> c_uint {
    query(cursor, 0, |clang, c| clang.is_anonymous_record_decl(c) as c_uint)
}

#[no_mangle]
pub unsafe extern "C" fn clang_getCursorUSR_wrap(cursor: *const CXCursor) -> *mut CXString {
    forward(cursor, |clang, c| clang.cursor_usr(c))
}

#[no_mangle]
pub unsafe extern "C" fn clang_getFieldDeclBitWidth_wrap(cursor: *const CXCursor) -> c_int {
    query(cursor, -1, |clang, c| clang.field_bit_width(c))
}

#[cfg(test)]
mod tests {
    use super::*;

    // These run in a process where libclang is never loaded

    #[test]
    fn test_null_inputs_are_tolerated() {
        unsafe {
            assert!(clang_getCursorType_wrap(ptr::null()).is_null());
            assert_eq!(clang_Cursor_getNumArguments_wrap(ptr::null()), -1);
            assert_eq!(clang_equalRanges_wrap(ptr::null(), ptr::null()), 0);
            clang_disposeString_wrap(ptr::null_mut());
            clang_disposeCursor_wrap(ptr::null_mut());
            bridge_dispatcher_free(ptr::null_mut());
        }
    }

    #[test]
    fn test_visit_children_without_dispatcher() {
        unsafe extern "C" fn visitor(_: *mut CXCursor, _: *mut CXCursor, _: *mut std::os::raw::c_void) -> c_int {
            1
        }

        let status = unsafe { clang_visitChildren_wrap(ptr::null(), ptr::null(), visitor, 1) };
        assert_eq!(status, VISIT_FAILED);
        assert_ne!(status, 0);
    }

    #[test]
    fn test_traversal_status_separates_failure_from_results() {
        use crate::types::BridgeError;

        assert_eq!(traversal_status(Ok(0)), 0);
        assert_eq!(traversal_status(Ok(1)), 1);

        let failed = traversal_status(Err(BridgeError::InvalidArgument("null parent cursor".into())));
        assert_eq!(failed, VISIT_FAILED);
    }
}
