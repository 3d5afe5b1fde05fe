//! Runtime loading of libclang
//!
//! libclang is opened with `libloading` instead of being linked, so the
//! bridge builds and its core runs without LLVM installed. The library is
//! loaded at most once per process and stays loaded: boxed strings need it
//! to release their buffers, and foreign callers reach it through the C-ABI
//! surface without holding a handle.

use std::os::raw::{c_char, c_int, c_longlong, c_uint, c_void};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use libloading::Library;
use parking_lot::{const_mutex, Mutex};

use crate::config::LoaderConfig;
use crate::dispatcher::NativeTraversal;
use crate::trampoline::NativeVisitor;
use crate::types::{BridgeError, Result};

use super::ffi::*;

/// Typed entry points resolved from the shared library
pub(crate) struct Functions {
    pub create_index: unsafe extern "C" fn(c_int, c_int) -> CXIndex,
    pub dispose_index: unsafe extern "C" fn(CXIndex),
    pub parse_translation_unit: unsafe extern "C" fn(
        CXIndex,
        *const c_char,
        *const *const c_char,
        c_int,
        *mut CXUnsavedFile,
        c_uint,
        c_uint,
    ) -> CXTranslationUnit,
    pub dispose_translation_unit: unsafe extern "C" fn(CXTranslationUnit),
    pub get_num_diagnostics: unsafe extern "C" fn(CXTranslationUnit) -> c_uint,
    pub get_diagnostic: unsafe extern "C" fn(CXTranslationUnit, c_uint) -> CXDiagnostic,
    pub dispose_diagnostic: unsafe extern "C" fn(CXDiagnostic),
    pub get_diagnostic_severity: unsafe extern "C" fn(CXDiagnostic) -> c_int,
    pub default_diagnostic_display_options: unsafe extern "C" fn() -> c_uint,
    pub format_diagnostic: unsafe extern "C" fn(CXDiagnostic, c_uint) -> CXString,
    pub get_c_string: unsafe extern "C" fn(CXString) -> *const c_char,
    pub dispose_string: unsafe extern "C" fn(CXString),
    pub get_cursor_kind: unsafe extern "C" fn(CXCursor) -> CXCursorKind,
    pub get_cursor_kind_spelling: unsafe extern "C" fn(CXCursorKind) -> CXString,
    pub get_cursor_type: unsafe extern "C" fn(CXCursor) -> CXType,
    pub get_type_spelling: unsafe extern "C" fn(CXType) -> CXString,
    pub get_type_kind_spelling: unsafe extern "C" fn(CXTypeKind) -> CXString,
    pub get_result_type: unsafe extern "C" fn(CXType) -> CXType,
    pub get_pointee_type: unsafe extern "C" fn(CXType) -> CXType,
    pub get_canonical_type: unsafe extern "C" fn(CXType) -> CXType,
    pub type_get_named_type: unsafe extern "C" fn(CXType) -> CXType,
    pub get_type_declaration: unsafe extern "C" fn(CXType) -> CXCursor,
    pub get_typedef_decl_underlying_type: unsafe extern "C" fn(CXCursor) -> CXType,
    pub get_cursor_spelling: unsafe extern "C" fn(CXCursor) -> CXString,
    pub get_translation_unit_cursor: unsafe extern "C" fn(CXTranslationUnit) -> CXCursor,
    pub visit_children: unsafe extern "C" fn(CXCursor, CXCursorVisitor, CXClientData) -> c_uint,
    pub cursor_get_num_arguments: unsafe extern "C" fn(CXCursor) -> c_int,
    pub cursor_get_argument: unsafe extern "C" fn(CXCursor, c_uint) -> CXCursor,
    pub get_num_arg_types: unsafe extern "C" fn(CXType) -> c_int,
    pub get_arg_type: unsafe extern "C" fn(CXType, c_uint) -> CXType,
    pub get_enum_constant_decl_value: unsafe extern "C" fn(CXCursor) -> c_longlong,
    pub equal_ranges: unsafe extern "C" fn(CXSourceRange, CXSourceRange) -> c_uint,
    pub cursor_get_comment_range: unsafe extern "C" fn(CXCursor) -> CXSourceRange,
    pub cursor_get_raw_comment_text: unsafe extern "C" fn(CXCursor) -> CXString,
    pub cursor_get_brief_comment_text: unsafe extern "C" fn(CXCursor) -> CXString,
    pub get_cursor_location: unsafe extern "C" fn(CXCursor) -> CXSourceLocation,
    pub location_is_from_main_file: unsafe extern "C" fn(CXSourceLocation) -> c_int,
    pub get_file_location: unsafe extern "C" fn(
        CXSourceLocation,
        *mut CXFile,
        *mut c_uint,
        *mut c_uint,
        *mut c_uint,
    ),
    pub get_file_name: unsafe extern "C" fn(CXFile) -> CXString,
    pub get_num_elements: unsafe extern "C" fn(CXType) -> c_longlong,
    pub get_array_element_type: unsafe extern "C" fn(CXType) -> CXType,
    pub cursor_is_macro_function_like: unsafe extern "C" fn(CXCursor) -> c_uint,
    pub cursor_is_macro_builtin: unsafe extern "C" fn(CXCursor) -> c_uint,
    pub cursor_evaluate: unsafe extern "C" fn(CXCursor) -> CXEvalResult,
    pub eval_result_get_kind: unsafe extern "C" fn(CXEvalResult) -> c_int,
    pub eval_result_get_as_long_long: unsafe extern "C" fn(CXEvalResult) -> c_longlong,
    pub eval_result_get_as_double: unsafe extern "C" fn(CXEvalResult) -> f64,
    pub eval_result_dispose: unsafe extern "C" fn(CXEvalResult),
    pub cursor_is_anonymous: unsafe extern "C" fn(CXCursor) -> c_uint,
    pub cursor_is_anonymous_record_decl: unsafe extern "C" fn(CXCursor) -> c_uint,
    pub get_cursor_usr: unsafe extern "C" fn(CXCursor) -> CXString,
    pub get_field_decl_bit_width: unsafe extern "C" fn(CXCursor) -> c_int,
}

/// Handle to a loaded libclang
pub struct Clang {
    path: PathBuf,
    pub(crate) fns: Functions,
    // Must outlive every function pointer above
    _library: Library,
}

static LIBRARY: OnceLock<Clang> = OnceLock::new();
static LOAD_LOCK: Mutex<()> = const_mutex(());

/// Load libclang once for the whole process
///
/// Later calls return the library loaded first, whatever their config.
pub fn load(config: &LoaderConfig) -> Result<&'static Clang> {
    if let Some(clang) = LIBRARY.get() {
        return Ok(clang);
    }

    let _guard = LOAD_LOCK.lock();
    if let Some(clang) = LIBRARY.get() {
        return Ok(clang);
    }

    let clang = Clang::open(config)?;
    Ok(LIBRARY.get_or_init(|| clang))
}

/// The process-wide library, if loaded
pub fn loaded() -> Option<&'static Clang> {
    LIBRARY.get()
}

/// The process-wide library, or an error if nothing loaded it yet
pub fn require() -> Result<&'static Clang> {
    loaded().ok_or(BridgeError::LibraryNotLoaded)
}

unsafe fn symbol<T: Copy>(library: &Library, name: &str) -> Result<T> {
    let mut bytes = Vec::with_capacity(name.len() + 1);
    bytes.extend_from_slice(name.as_bytes());
    bytes.push(0);

    library
        .get::<T>(&bytes)
        .map(|sym| *sym)
        .map_err(|_| BridgeError::SymbolMissing(name.to_string()))
}

impl Clang {
    /// Try every candidate path from `config` until one opens
    fn open(config: &LoaderConfig) -> Result<Self> {
        let candidates = config.candidates();
        let mut explicit_error = None;

        for candidate in &candidates {
            log::debug!("Trying libclang at {:?}", candidate);

            // SAFETY: loading runs the library's initializers; libclang has
            // no unusual requirements there
            match unsafe { Library::new(candidate) } {
                Ok(library) => {
                    let clang = Self::from_library(library, candidate)?;
                    log::info!("Loaded libclang from {:?}", candidate);
                    return Ok(clang);
                }
                Err(source) => {
                    log::trace!("Could not open {:?}: {}", candidate, source);
                    if config.library_path.as_ref() == Some(candidate) {
                        explicit_error = Some(source);
                    }
                }
            }
        }

        // An explicit file that fails to open is reported with its loader error
        match (explicit_error, &config.library_path) {
            (Some(source), Some(path)) => Err(BridgeError::LibraryLoad {
                path: path.clone(),
                source,
            }),
            _ => Err(BridgeError::LibraryNotFound { searched: candidates }),
        }
    }

    fn from_library(library: Library, path: &Path) -> Result<Self> {
        // SAFETY: every signature matches clang-c/Index.h
        let fns = unsafe {
            Functions {
                create_index: symbol(&library, "clang_createIndex")?,
                dispose_index: symbol(&library, "clang_disposeIndex")?,
                parse_translation_unit: symbol(&library, "clang_parseTranslationUnit")?,
                dispose_translation_unit: symbol(&library, "clang_disposeTranslationUnit")?,
                get_num_diagnostics: symbol(&library, "clang_getNumDiagnostics")?,
                get_diagnostic: symbol(&library, "clang_getDiagnostic")?,
                dispose_diagnostic: symbol(&library, "clang_disposeDiagnostic")?,
                get_diagnostic_severity: symbol(&library, "clang_getDiagnosticSeverity")?,
                default_diagnostic_display_options: symbol(
                    &library,
                    "clang_defaultDiagnosticDisplayOptions",
                )?,
                format_diagnostic: symbol(&library, "clang_formatDiagnostic")?,
                get_c_string: symbol(&library, "clang_getCString")?,
                dispose_string: symbol(&library, "clang_disposeString")?,
                get_cursor_kind: symbol(&library, "clang_getCursorKind")?,
                get_cursor_kind_spelling: symbol(&library, "clang_getCursorKindSpelling")?,
                get_cursor_type: symbol(&library, "clang_getCursorType")?,
                get_type_spelling: symbol(&library, "clang_getTypeSpelling")?,
                get_type_kind_spelling: symbol(&library, "clang_getTypeKindSpelling")?,
                get_result_type: symbol(&library, "clang_getResultType")?,
                get_pointee_type: symbol(&library, "clang_getPointeeType")?,
                get_canonical_type: symbol(&library, "clang_getCanonicalType")?,
                type_get_named_type: symbol(&library, "clang_Type_getNamedType")?,
                get_type_declaration: symbol(&library, "clang_getTypeDeclaration")?,
                get_typedef_decl_underlying_type: symbol(
                    &library,
                    "clang_getTypedefDeclUnderlyingType",
                )?,
                get_cursor_spelling: symbol(&library, "clang_getCursorSpelling")?,
                get_translation_unit_cursor: symbol(&library, "clang_getTranslationUnitCursor")?,
                visit_children: symbol(&library, "clang_visitChildren")?,
                cursor_get_num_arguments: symbol(&library, "clang_Cursor_getNumArguments")?,
                cursor_get_argument: symbol(&library, "clang_Cursor_getArgument")?,
                get_num_arg_types: symbol(&library, "clang_getNumArgTypes")?,
                get_arg_type: symbol(&library, "clang_getArgType")?,
                get_enum_constant_decl_value: symbol(&library, "clang_getEnumConstantDeclValue")?,
                equal_ranges: symbol(&library, "clang_equalRanges")?,
                cursor_get_comment_range: symbol(&library, "clang_Cursor_getCommentRange")?,
                cursor_get_raw_comment_text: symbol(&library, "clang_Cursor_getRawCommentText")?,
                cursor_get_brief_comment_text: symbol(
                    &library,
                    "clang_Cursor_getBriefCommentText",
                )?,
                get_cursor_location: symbol(&library, "clang_getCursorLocation")?,
                location_is_from_main_file: symbol(&library, "clang_Location_isFromMainFile")?,
                get_file_location: symbol(&library, "clang_getFileLocation")?,
                get_file_name: symbol(&library, "clang_getFileName")?,
                get_num_elements: symbol(&library, "clang_getNumElements")?,
                get_array_element_type: symbol(&library, "clang_getArrayElementType")?,
                cursor_is_macro_function_like: symbol(
                    &library,
                    "clang_Cursor_isMacroFunctionLike",
                )?,
                cursor_is_macro_builtin: symbol(&library, "clang_Cursor_isMacroBuiltin")?,
                cursor_evaluate: symbol(&library, "clang_Cursor_Evaluate")?,
                eval_result_get_kind: symbol(&library, "clang_EvalResult_getKind")?,
                eval_result_get_as_long_long: symbol(&library, "clang_EvalResult_getAsLongLong")?,
                eval_result_get_as_double: symbol(&library, "clang_EvalResult_getAsDouble")?,
                eval_result_dispose: symbol(&library, "clang_EvalResult_dispose")?,
                cursor_is_anonymous: symbol(&library, "clang_Cursor_isAnonymous")?,
                cursor_is_anonymous_record_decl: symbol(
                    &library,
                    "clang_Cursor_isAnonymousRecordDecl",
                )?,
                get_cursor_usr: symbol(&library, "clang_getCursorUSR")?,
                get_field_decl_bit_width: symbol(&library, "clang_getFieldDeclBitWidth")?,
            }
        };

        Ok(Self {
            path: path.to_path_buf(),
            fns,
            _library: library,
        })
    }

    /// File the library was loaded from
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl NativeTraversal for &Clang {
    type Node = CXCursor;

    unsafe fn visit_children(
        &self,
        root: CXCursor,
        visitor: NativeVisitor<CXCursor>,
        client_data: *mut c_void,
    ) -> c_uint {
        (self.fns.visit_children)(root, visitor, client_data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_library_is_reported() {
        let config = LoaderConfig {
            library_path: None,
            search_paths: vec![PathBuf::from("/nonexistent/llvm")],
            use_env: false,
            file_names: vec!["libclang-does-not-exist.so".to_string()],
        };

        match Clang::open(&config) {
            Err(BridgeError::LibraryNotFound { searched }) => {
                assert!(searched.contains(&PathBuf::from("/nonexistent/llvm/libclang-does-not-exist.so")));
            }
            Err(other) => panic!("unexpected error: {}", other),
            Ok(_) => panic!("nonexistent library should not load"),
        }
    }

    #[test]
    fn test_require_without_load() {
        // Unit tests never load libclang
        assert!(matches!(require(), Err(BridgeError::LibraryNotLoaded)));
    }

    #[test]
    fn test_explicit_path_reports_loader_error() {
        let config = LoaderConfig::new()
            .with_library_path("/nonexistent/libclang-explicit.so")
            .with_env_lookup(false)
            .with_file_names(vec!["libclang-does-not-exist.so".to_string()]);

        match Clang::open(&config) {
            Err(BridgeError::LibraryLoad { path, .. }) => {
                assert_eq!(path, PathBuf::from("/nonexistent/libclang-explicit.so"));
            }
            Err(other) => panic!("unexpected error: {}", other),
            Ok(_) => panic!("nonexistent library should not load"),
        }
    }
}
