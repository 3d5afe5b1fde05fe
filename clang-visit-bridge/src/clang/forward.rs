//! Forwarding wrapper layer
//!
//! One method per wrapped libclang operation. Records go in by reference
//! (a `Boxed` derefs to one) and every record coming back by value is boxed,
//! so the caller always receives an owning handle.

use std::os::raw::c_uint;
use std::ptr;

use crate::boxer::Boxed;

use super::ffi::*;
use super::library::Clang;

/// Position of a source location inside its file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileLocation {
    pub file: Option<String>,
    pub line: u32,
    pub column: u32,
    pub offset: u32,
}

/// Value of an evaluated cursor, for the kinds the bridge understands
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Evaluated {
    Int(i64),
    Float(f64),
    Other,
}

impl Clang {
    /// Text of a boxed string
    pub fn string_text(&self, string: &CXString) -> String {
        string.to_string_lossy()
    }

    pub fn cursor_kind(&self, cursor: &CXCursor) -> CXCursorKind {
        unsafe { (self.fns.get_cursor_kind)(*cursor) }
    }

    pub fn cursor_kind_spelling(&self, kind: CXCursorKind) -> Boxed<CXString> {
        Boxed::new(unsafe { (self.fns.get_cursor_kind_spelling)(kind) })
    }

    pub fn cursor_type(&self, cursor: &CXCursor) -> Boxed<CXType> {
        Boxed::new(unsafe { (self.fns.get_cursor_type)(*cursor) })
    }

    pub fn type_spelling(&self, ty: &CXType) -> Boxed<CXString> {
        Boxed::new(unsafe { (self.fns.get_type_spelling)(*ty) })
    }

    pub fn type_kind_spelling(&self, kind: CXTypeKind) -> Boxed<CXString> {
        Boxed::new(unsafe { (self.fns.get_type_kind_spelling)(kind) })
    }

    pub fn result_type(&self, function_type: &CXType) -> Boxed<CXType> {
        Boxed::new(unsafe { (self.fns.get_result_type)(*function_type) })
    }

    pub fn pointee_type(&self, pointer_type: &CXType) -> Boxed<CXType> {
        Boxed::new(unsafe { (self.fns.get_pointee_type)(*pointer_type) })
    }

    pub fn canonical_type(&self, ty: &CXType) -> Boxed<CXType> {
        Boxed::new(unsafe { (self.fns.get_canonical_type)(*ty) })
    }

    pub fn named_type(&self, elaborated_type: &CXType) -> Boxed<CXType> {
        Boxed::new(unsafe { (self.fns.type_get_named_type)(*elaborated_type) })
    }

    pub fn type_declaration(&self, ty: &CXType) -> Boxed<CXCursor> {
        Boxed::new(unsafe { (self.fns.get_type_declaration)(*ty) })
    }

    pub fn typedef_underlying_type(&self, cursor: &CXCursor) -> Boxed<CXType> {
        Boxed::new(unsafe { (self.fns.get_typedef_decl_underlying_type)(*cursor) })
    }

    /// Name of a parameter, struct, typedef and so on
    pub fn cursor_spelling(&self, cursor: &CXCursor) -> Boxed<CXString> {
        Boxed::new(unsafe { (self.fns.get_cursor_spelling)(*cursor) })
    }

    /// # Safety
    /// `unit` must be a live translation unit.
    pub unsafe fn translation_unit_cursor(&self, unit: CXTranslationUnit) -> Boxed<CXCursor> {
        Boxed::new((self.fns.get_translation_unit_cursor)(unit))
    }

    /// # Safety
    /// `diagnostic` must be a live diagnostic.
    pub unsafe fn format_diagnostic(&self, diagnostic: CXDiagnostic, options: c_uint) -> Boxed<CXString> {
        Boxed::new((self.fns.format_diagnostic)(diagnostic, options))
    }

    pub fn default_diagnostic_display_options(&self) -> c_uint {
        unsafe { (self.fns.default_diagnostic_display_options)() }
    }

    /// Number of arguments of a function cursor, -1 for other kinds
    pub fn num_arguments(&self, cursor: &CXCursor) -> i32 {
        unsafe { (self.fns.cursor_get_num_arguments)(*cursor) }
    }

    pub fn argument(&self, cursor: &CXCursor, index: u32) -> Boxed<CXCursor> {
        Boxed::new(unsafe { (self.fns.cursor_get_argument)(*cursor, index) })
    }

    /// Number of argument types of a function type, -1 for other kinds
    pub fn num_arg_types(&self, ty: &CXType) -> i32 {
        unsafe { (self.fns.get_num_arg_types)(*ty) }
    }

    pub fn arg_type(&self, ty: &CXType, index: u32) -> Boxed<CXType> {
        Boxed::new(unsafe { (self.fns.get_arg_type)(*ty, index) })
    }

    pub fn enum_constant_value(&self, cursor: &CXCursor) -> i64 {
        unsafe { (self.fns.get_enum_constant_decl_value)(*cursor) }
    }

    pub fn equal_ranges(&self, a: &CXSourceRange, b: &CXSourceRange) -> bool {
        unsafe { (self.fns.equal_ranges)(*a, *b) != 0 }
    }

    pub fn comment_range(&self, cursor: &CXCursor) -> Boxed<CXSourceRange> {
        Boxed::new(unsafe { (self.fns.cursor_get_comment_range)(*cursor) })
    }

    pub fn raw_comment_text(&self, cursor: &CXCursor) -> Boxed<CXString> {
        Boxed::new(unsafe { (self.fns.cursor_get_raw_comment_text)(*cursor) })
    }

    /// First paragraph of a doc comment
    pub fn brief_comment_text(&self, cursor: &CXCursor) -> Boxed<CXString> {
        Boxed::new(unsafe { (self.fns.cursor_get_brief_comment_text)(*cursor) })
    }

    pub fn cursor_location(&self, cursor: &CXCursor) -> Boxed<CXSourceLocation> {
        Boxed::new(unsafe { (self.fns.get_cursor_location)(*cursor) })
    }

    pub fn is_from_main_file(&self, location: &CXSourceLocation) -> bool {
        unsafe { (self.fns.location_is_from_main_file)(*location) != 0 }
    }

    /// Raw out-parameter form, as exposed across the C boundary
    ///
    /// # Safety
    /// Every non-null out pointer must be valid for writes.
    pub unsafe fn file_location_raw(
        &self,
        location: &CXSourceLocation,
        file: *mut CXFile,
        line: *mut c_uint,
        column: *mut c_uint,
        offset: *mut c_uint,
    ) {
        (self.fns.get_file_location)(*location, file, line, column, offset)
    }

    pub fn file_location(&self, location: &CXSourceLocation) -> FileLocation {
        let mut file: CXFile = ptr::null_mut();
        let (mut line, mut column, mut offset) = (0, 0, 0);
        unsafe { self.file_location_raw(location, &mut file, &mut line, &mut column, &mut offset) };

        let file = if file.is_null() {
            None
        } else {
            let name = unsafe { self.file_name(file) };
            Some(self.string_text(&name))
        };

        FileLocation {
            file,
            line,
            column,
            offset,
        }
    }

    /// # Safety
    /// `file` must be a live file handle.
    pub unsafe fn file_name(&self, file: CXFile) -> Boxed<CXString> {
        Boxed::new((self.fns.get_file_name)(file))
    }

    pub fn num_elements(&self, ty: &CXType) -> i64 {
        unsafe { (self.fns.get_num_elements)(*ty) }
    }

    pub fn array_element_type(&self, ty: &CXType) -> Boxed<CXType> {
        Boxed::new(unsafe { (self.fns.get_array_element_type)(*ty) })
    }

    pub fn is_macro_function_like(&self, cursor: &CXCursor) -> bool {
        unsafe { (self.fns.cursor_is_macro_function_like)(*cursor) != 0 }
    }

    pub fn is_macro_builtin(&self, cursor: &CXCursor) -> bool {
        unsafe { (self.fns.cursor_is_macro_builtin)(*cursor) != 0 }
    }

    /// Raw evaluation handle; the caller disposes it
    pub fn evaluate_raw(&self, cursor: &CXCursor) -> CXEvalResult {
        unsafe { (self.fns.cursor_evaluate)(*cursor) }
    }

    /// Evaluate a cursor, `None` when libclang cannot
    pub fn evaluate(&self, cursor: &CXCursor) -> Option<Evaluated> {
        let result = self.evaluate_raw(cursor);
        if result.is_null() {
            return None;
        }

        let value = unsafe {
            match (self.fns.eval_result_get_kind)(result) {
                CX_EVAL_INT => Evaluated::Int((self.fns.eval_result_get_as_long_long)(result)),
                CX_EVAL_FLOAT => Evaluated::Float((self.fns.eval_result_get_as_double)(result)),
                _ => Evaluated::Other,
            }
        };
        unsafe { (self.fns.eval_result_dispose)(result) };
        Some(value)
    }

    pub fn is_anonymous(&self, cursor: &CXCursor) -> bool {
        unsafe { (self.fns.cursor_is_anonymous)(*cursor) != 0 }
    }

    pub fn is_anonymous_record_decl(&self, cursor: &CXCursor) -> bool {
        unsafe { (self.fns.cursor_is_anonymous_record_decl)(*cursor) != 0 }
    }

    pub fn cursor_usr(&self, cursor: &CXCursor) -> Boxed<CXString> {
        Boxed::new(unsafe { (self.fns.get_cursor_usr)(*cursor) })
    }

    /// Bit width of a bit-field, -1 otherwise
    pub fn field_bit_width(&self, cursor: &CXCursor) -> i32 {
        unsafe { (self.fns.get_field_decl_bit_width)(*cursor) }
    }
}
