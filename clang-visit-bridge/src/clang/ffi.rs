//! libclang record layouts and opaque handle types
//!
//! Layouts follow `clang-c/Index.h`. Only the records that libclang passes
//! by value are defined here; everything else is an opaque pointer.

use std::ffi::CStr;
use std::os::raw::{c_char, c_int, c_uint, c_ulong, c_void};

use crate::boxer::Record;

use super::library;

pub type CXIndex = *mut c_void;
pub type CXTranslationUnit = *mut c_void;
pub type CXDiagnostic = *mut c_void;
pub type CXFile = *mut c_void;
pub type CXEvalResult = *mut c_void;
pub type CXClientData = *mut c_void;

pub type CXCursorKind = c_int;
pub type CXTypeKind = c_int;

/// libclang's by-value visitor signature
pub type CXCursorVisitor =
    extern "C" fn(cursor: CXCursor, parent: CXCursor, client_data: CXClientData) -> c_int;

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct CXCursor {
    pub kind: CXCursorKind,
    pub xdata: c_int,
    pub data: [*const c_void; 3],
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct CXType {
    pub kind: CXTypeKind,
    pub data: [*mut c_void; 2],
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct CXString {
    pub data: *const c_void,
    pub private_flags: c_uint,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct CXSourceLocation {
    pub ptr_data: [*const c_void; 2],
    pub int_data: c_uint,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct CXSourceRange {
    pub ptr_data: [*const c_void; 2],
    pub begin_int_data: c_uint,
    pub end_int_data: c_uint,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct CXUnsavedFile {
    pub filename: *const c_char,
    pub contents: *const c_char,
    pub length: c_ulong,
}

impl Record for CXCursor {
    const KIND: &'static str = "cursor";
}

impl Record for CXType {
    const KIND: &'static str = "type";
}

impl Record for CXSourceLocation {
    const KIND: &'static str = "source-location";
}

impl Record for CXSourceRange {
    const KIND: &'static str = "source-range";
}

impl Record for CXString {
    const KIND: &'static str = "string";

    fn release(&mut self) {
        match library::loaded() {
            Some(clang) => unsafe { (clang.fns.dispose_string)(*self) },
            None => log::warn!("libclang unloaded before string release, buffer leaked"),
        }
    }
}

impl CXString {
    /// Copy the text out of the string, empty for null data
    pub fn to_string_lossy(&self) -> String {
        let Some(clang) = library::loaded() else {
            return String::new();
        };

        // SAFETY: the returned pointer stays valid until the string is disposed
        unsafe {
            let text = (clang.fns.get_c_string)(*self);
            if text.is_null() {
                String::new()
            } else {
                CStr::from_ptr(text).to_string_lossy().into_owned()
            }
        }
    }
}

// Cursor kinds used by this crate
pub const CX_CURSOR_STRUCT_DECL: CXCursorKind = 2;
pub const CX_CURSOR_UNION_DECL: CXCursorKind = 3;
pub const CX_CURSOR_ENUM_DECL: CXCursorKind = 5;
pub const CX_CURSOR_FIELD_DECL: CXCursorKind = 6;
pub const CX_CURSOR_ENUM_CONSTANT_DECL: CXCursorKind = 7;
pub const CX_CURSOR_FUNCTION_DECL: CXCursorKind = 8;
pub const CX_CURSOR_VAR_DECL: CXCursorKind = 9;
pub const CX_CURSOR_PARM_DECL: CXCursorKind = 10;
pub const CX_CURSOR_TYPEDEF_DECL: CXCursorKind = 20;
pub const CX_CURSOR_MACRO_DEFINITION: CXCursorKind = 501;

// Translation unit flags
pub const CX_TRANSLATION_UNIT_NONE: c_uint = 0x0;
pub const CX_TRANSLATION_UNIT_DETAILED_PREPROCESSING_RECORD: c_uint = 0x01;
pub const CX_TRANSLATION_UNIT_SKIP_FUNCTION_BODIES: c_uint = 0x40;

// Diagnostic severities
pub const CX_DIAGNOSTIC_IGNORED: c_int = 0;
pub const CX_DIAGNOSTIC_NOTE: c_int = 1;
pub const CX_DIAGNOSTIC_WARNING: c_int = 2;
pub const CX_DIAGNOSTIC_ERROR: c_int = 3;
pub const CX_DIAGNOSTIC_FATAL: c_int = 4;

// Evaluation result kinds
pub const CX_EVAL_INT: c_int = 1;
pub const CX_EVAL_FLOAT: c_int = 2;
