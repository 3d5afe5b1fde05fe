//! Index and translation unit lifecycle
//!
//! Both are opaque libclang handles with explicit dispose calls; here they
//! are owned values released on drop. Parse failures come back from libclang
//! as a null unit and are reported as errors instead of being masked.

use std::ffi::CString;
use std::os::raw::{c_char, c_int};
use std::path::Path;
use std::ptr;

use serde::Serialize;

use crate::boxer::Boxed;
use crate::types::{BridgeError, Result};

use super::ffi::*;
use super::library::Clang;

/// Severity of a parse diagnostic
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum Severity {
    Ignored,
    Note,
    Warning,
    Error,
    Fatal,
}

impl Severity {
    fn from_raw(raw: c_int) -> Self {
        match raw {
            CX_DIAGNOSTIC_IGNORED => Severity::Ignored,
            CX_DIAGNOSTIC_NOTE => Severity::Note,
            CX_DIAGNOSTIC_WARNING => Severity::Warning,
            CX_DIAGNOSTIC_ERROR => Severity::Error,
            CX_DIAGNOSTIC_FATAL => Severity::Fatal,
            _ => Severity::Error,
        }
    }

    pub fn is_error(self) -> bool {
        self >= Severity::Error
    }
}

/// Formatted parse diagnostic
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
}

/// A libclang index, the root of every parse
pub struct Index<'c> {
    clang: &'c Clang,
    raw: CXIndex,
}

impl<'c> Index<'c> {
    /// Create an index; `display_diagnostics` lets libclang print them itself
    pub fn new(clang: &'c Clang, exclude_pch_declarations: bool, display_diagnostics: bool) -> Result<Self> {
        let raw = unsafe {
            (clang.fns.create_index)(exclude_pch_declarations as c_int, display_diagnostics as c_int)
        };
        if raw.is_null() {
            return Err(BridgeError::TranslationUnitParse("clang_createIndex returned null".to_string()));
        }
        Ok(Self { clang, raw })
    }

    /// Parse a source file with the given compiler arguments and flags
    pub fn parse(&self, path: &Path, args: &[String], options: u32) -> Result<TranslationUnit<'_>> {
        // libclang only reports a null unit for missing files
        std::fs::metadata(path)?;

        let path_str = path
            .to_str()
            .ok_or_else(|| BridgeError::InvalidArgument(format!("Invalid UTF-8 in path: {:?}", path)))?;
        let c_path = CString::new(path_str)
            .map_err(|e| BridgeError::InvalidArgument(format!("Failed to convert path to C string: {}", e)))?;

        let c_args = args
            .iter()
            .map(|arg| CString::new(arg.as_str()))
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| BridgeError::InvalidArgument(format!("Invalid compiler argument: {}", e)))?;
        let arg_ptrs: Vec<*const c_char> = c_args.iter().map(|arg| arg.as_ptr()).collect();

        log::debug!("Parsing {:?} with {} compiler argument(s)", path, args.len());

        let raw = unsafe {
            (self.clang.fns.parse_translation_unit)(
                self.raw,
                c_path.as_ptr(),
                if arg_ptrs.is_empty() { ptr::null() } else { arg_ptrs.as_ptr() },
                arg_ptrs.len() as c_int,
                ptr::null_mut(),
                0,
                options,
            )
        };

        if raw.is_null() {
            return Err(BridgeError::TranslationUnitParse(format!("{}", path.display())));
        }

        Ok(TranslationUnit {
            clang: self.clang,
            raw,
            _index: self,
        })
    }
}

impl Drop for Index<'_> {
    fn drop(&mut self) {
        unsafe { (self.clang.fns.dispose_index)(self.raw) };
    }
}

/// A parsed translation unit
pub struct TranslationUnit<'i> {
    clang: &'i Clang,
    raw: CXTranslationUnit,
    _index: &'i Index<'i>,
}

impl TranslationUnit<'_> {
    /// Raw handle for the C-ABI surface
    pub fn as_raw(&self) -> CXTranslationUnit {
        self.raw
    }

    /// Root cursor of the unit
    pub fn cursor(&self) -> Boxed<CXCursor> {
        unsafe { self.clang.translation_unit_cursor(self.raw) }
    }

    /// All diagnostics, formatted with libclang's default options
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        let options = self.clang.default_diagnostic_display_options();
        let count = unsafe { (self.clang.fns.get_num_diagnostics)(self.raw) };

        (0..count)
            .map(|i| unsafe {
                let diagnostic = (self.clang.fns.get_diagnostic)(self.raw, i);
                let severity = Severity::from_raw((self.clang.fns.get_diagnostic_severity)(diagnostic));
                let message = self.clang.string_text(&self.clang.format_diagnostic(diagnostic, options));
                (self.clang.fns.dispose_diagnostic)(diagnostic);
                Diagnostic { severity, message }
            })
            .collect()
    }
}

impl Drop for TranslationUnit<'_> {
    fn drop(&mut self) {
        unsafe { (self.clang.fns.dispose_translation_unit)(self.raw) };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_mapping() {
        assert_eq!(Severity::from_raw(CX_DIAGNOSTIC_WARNING), Severity::Warning);
        assert_eq!(Severity::from_raw(CX_DIAGNOSTIC_FATAL), Severity::Fatal);
        assert_eq!(Severity::from_raw(99), Severity::Error);

        assert!(Severity::Fatal.is_error());
        assert!(Severity::Error.is_error());
        assert!(!Severity::Warning.is_error());
    }
}
