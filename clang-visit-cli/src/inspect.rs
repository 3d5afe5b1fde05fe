//! Header inspection
//!
//! Every header is parsed on a rayon worker under its own caller identity.
//! Top-level declarations of the main file are collected with one traversal;
//! members (struct fields, enum constants, function parameters) with a
//! nested traversal under the same identity, started from inside the outer
//! visitor.

use anyhow::{Context, Result};
use clang_visit_bridge::clang::ffi::*;
use clang_visit_bridge::clang::{self, Clang, ClangDispatcher, Diagnostic, Evaluated, Index, Severity};
use clang_visit_bridge::{Boxed, CallerIdentity, ChildVisitResult};
use parking_lot::Mutex;
use rayon::prelude::*;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// What to collect for every header
#[derive(Debug, Clone, Default)]
pub struct InspectOptions {
    pub clang_args: Vec<String>,
    pub members: bool,
    pub comments: bool,
    pub dump: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Position {
    pub line: u32,
    pub column: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Member {
    pub kind: String,
    pub name: String,
    pub type_spelling: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bit_width: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Declaration {
    pub kind: String,
    pub name: String,
    pub type_spelling: String,
    pub position: Position,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub members: Vec<Member>,
}

/// Result of inspecting one header
#[derive(Debug, Clone, Serialize)]
pub struct HeaderReport {
    pub path: PathBuf,
    pub identity: u64,
    pub declarations: Vec<Declaration>,
    pub diagnostics: Vec<Diagnostic>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub cursors: Vec<String>,
}

/// Header that could not be inspected
#[derive(Debug, Clone, Serialize)]
pub struct Failure {
    pub path: PathBuf,
    pub error: String,
}

/// Declaration kinds reported at top level
pub fn declaration_label(kind: CXCursorKind) -> Option<&'static str> {
    match kind {
        CX_CURSOR_FUNCTION_DECL => Some("function"),
        CX_CURSOR_STRUCT_DECL => Some("struct"),
        CX_CURSOR_UNION_DECL => Some("union"),
        CX_CURSOR_ENUM_DECL => Some("enum"),
        CX_CURSOR_TYPEDEF_DECL => Some("typedef"),
        CX_CURSOR_VAR_DECL => Some("variable"),
        CX_CURSOR_MACRO_DEFINITION => Some("macro"),
        _ => None,
    }
}

/// Member kind expected below a declaration of `parent` kind
pub fn member_kind(parent: CXCursorKind) -> Option<(CXCursorKind, &'static str)> {
    match parent {
        CX_CURSOR_STRUCT_DECL | CX_CURSOR_UNION_DECL => Some((CX_CURSOR_FIELD_DECL, "field")),
        CX_CURSOR_ENUM_DECL => Some((CX_CURSOR_ENUM_CONSTANT_DECL, "constant")),
        CX_CURSOR_FUNCTION_DECL => Some((CX_CURSOR_PARM_DECL, "parameter")),
        _ => None,
    }
}

fn optional_text(text: String) -> Option<String> {
    if text.trim().is_empty() {
        None
    } else {
        Some(text)
    }
}

/// Inspect every header, splitting successes from failures
pub fn inspect_headers(
    dispatcher: &Arc<ClangDispatcher>,
    headers: &[PathBuf],
    options: &InspectOptions,
) -> (Vec<HeaderReport>, Vec<Failure>) {
    let results: Vec<std::result::Result<HeaderReport, Failure>> = headers
        .par_iter()
        .enumerate()
        .map(|(index, path)| {
            let identity = CallerIdentity((index + 1) as u64);
            inspect_header(dispatcher, path, identity, options).map_err(|e| Failure {
                path: path.clone(),
                error: format!("{:#}", e),
            })
        })
        .collect();

    let mut reports = Vec::new();
    let mut failures = Vec::new();
    for result in results {
        match result {
            Ok(report) => reports.push(report),
            Err(failure) => {
                log::warn!("Failed to inspect {}: {}", failure.path.display(), failure.error);
                failures.push(failure);
            }
        }
    }

    (reports, failures)
}

/// Parse one header and collect its declarations under `identity`
pub fn inspect_header(
    dispatcher: &Arc<ClangDispatcher>,
    path: &Path,
    identity: CallerIdentity,
    options: &InspectOptions,
) -> Result<HeaderReport> {
    let clang: &'static Clang = *dispatcher.library();
    log::info!("Inspecting {} as {}", path.display(), identity);

    let index = Index::new(clang, false, false).context("Failed to create libclang index")?;
    let unit = index
        .parse(
            path,
            &options.clang_args,
            CX_TRANSLATION_UNIT_DETAILED_PREPROCESSING_RECORD | CX_TRANSLATION_UNIT_SKIP_FUNCTION_BODIES,
        )
        .with_context(|| format!("Failed to parse header: {:?}", path))?;

    let diagnostics: Vec<Diagnostic> = unit
        .diagnostics()
        .into_iter()
        .filter(|d| d.severity >= Severity::Warning)
        .collect();
    for diagnostic in diagnostics.iter().filter(|d| d.severity.is_error()) {
        log::warn!("{}", diagnostic.message);
    }

    let declarations = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&declarations);
    let nested = Arc::clone(dispatcher);
    let members = options.members;
    let comments = options.comments;

    let root = unit.cursor();
    dispatcher.visit_children(
        &root,
        identity,
        move |cursor: Boxed<CXCursor>, _parent: Boxed<CXCursor>, id: CallerIdentity| {
            if let Some(declaration) = describe(&nested, &cursor, id, members, comments) {
                sink.lock().push(declaration);
            }
            ChildVisitResult::Continue
        },
    );

    let cursors = if options.dump {
        clang::dump_children(dispatcher, &unit, identity)
    } else {
        Vec::new()
    };

    let declarations = std::mem::take(&mut *declarations.lock());
    log::debug!("{}: {} declaration(s)", path.display(), declarations.len());

    Ok(HeaderReport {
        path: path.to_path_buf(),
        identity: identity.token(),
        declarations,
        diagnostics,
        cursors,
    })
}

fn describe(
    dispatcher: &Arc<ClangDispatcher>,
    cursor: &Boxed<CXCursor>,
    identity: CallerIdentity,
    members: bool,
    comments: bool,
) -> Option<Declaration> {
    let clang: &'static Clang = *dispatcher.library();

    let location = clang.cursor_location(cursor);
    if !clang.is_from_main_file(&location) {
        return None;
    }

    let kind = clang.cursor_kind(cursor);
    let label = declaration_label(kind)?;
    if kind == CX_CURSOR_MACRO_DEFINITION && clang.is_macro_builtin(cursor) {
        return None;
    }

    let name = if clang.is_anonymous(cursor) {
        "(anonymous)".to_string()
    } else {
        clang.string_text(&clang.cursor_spelling(cursor))
    };

    let type_spelling = match kind {
        CX_CURSOR_MACRO_DEFINITION => String::new(),
        CX_CURSOR_TYPEDEF_DECL => clang.string_text(&clang.type_spelling(&clang.typedef_underlying_type(cursor))),
        _ => clang.string_text(&clang.type_spelling(&clang.cursor_type(cursor))),
    };

    let kind_name = if kind == CX_CURSOR_MACRO_DEFINITION && clang.is_macro_function_like(cursor) {
        "macro (function-like)".to_string()
    } else {
        label.to_string()
    };

    let value = if kind == CX_CURSOR_VAR_DECL {
        match clang.evaluate(cursor) {
            Some(Evaluated::Int(v)) => Some(v.to_string()),
            Some(Evaluated::Float(v)) => Some(v.to_string()),
            _ => None,
        }
    } else {
        None
    };

    let comment = if comments {
        optional_text(clang.string_text(&clang.brief_comment_text(cursor)))
    } else {
        None
    };

    let position = clang.file_location(&location);
    let members = if members {
        collect_members(dispatcher, cursor, identity, kind)
    } else {
        Vec::new()
    };

    Some(Declaration {
        kind: kind_name,
        name,
        type_spelling,
        position: Position {
            line: position.line,
            column: position.column,
        },
        value,
        comment,
        members,
    })
}

/// Nested traversal below a declaration, under the caller's identity
fn collect_members(
    dispatcher: &Arc<ClangDispatcher>,
    parent: &Boxed<CXCursor>,
    identity: CallerIdentity,
    parent_kind: CXCursorKind,
) -> Vec<Member> {
    let Some((wanted, label)) = member_kind(parent_kind) else {
        return Vec::new();
    };

    let clang: &'static Clang = *dispatcher.library();
    let found = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&found);

    dispatcher.visit_children(
        parent,
        identity,
        move |cursor: Boxed<CXCursor>, _parent: Boxed<CXCursor>, _: CallerIdentity| {
            if clang.cursor_kind(&cursor) != wanted {
                return ChildVisitResult::Continue;
            }

            let value = (wanted == CX_CURSOR_ENUM_CONSTANT_DECL).then(|| clang.enum_constant_value(&cursor));
            let bit_width = Some(clang.field_bit_width(&cursor)).filter(|width| *width >= 0);

            sink.lock().push(Member {
                kind: label.to_string(),
                name: clang.string_text(&clang.cursor_spelling(&cursor)),
                type_spelling: clang.string_text(&clang.type_spelling(&clang.cursor_type(&cursor))),
                value,
                bit_width: if wanted == CX_CURSOR_FIELD_DECL { bit_width } else { None },
            });
            ChildVisitResult::Continue
        },
    );

    let members = std::mem::take(&mut *found.lock());
    members
}
