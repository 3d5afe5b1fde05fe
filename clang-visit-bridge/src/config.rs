//! Loader configuration
//!
//! This module defines how the bridge locates the libclang shared library.
//! Callers either point at an exact file, or let the loader walk a list of
//! directories and well-known file names.

use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

/// Environment variable consulted for the libclang location
pub const LIBCLANG_PATH_ENV: &str = "LIBCLANG_PATH";

/// Configuration for locating libclang
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoaderConfig {
    /// Exact library file, or a directory containing it
    #[serde(default)]
    pub library_path: Option<PathBuf>,

    /// Extra directories to search, in order
    #[serde(default)]
    pub search_paths: Vec<PathBuf>,

    /// Whether to consult LIBCLANG_PATH
    #[serde(default = "default_true")]
    pub use_env: bool,

    /// Library file names tried in every directory
    #[serde(default = "default_file_names")]
    pub file_names: Vec<String>,
}

fn default_true() -> bool {
    true
}

fn default_file_names() -> Vec<String> {
    if cfg!(target_os = "windows") {
        vec!["libclang.dll".to_string()]
    } else if cfg!(target_os = "macos") {
        vec!["libclang.dylib".to_string()]
    } else {
        vec!["libclang.so".to_string(), "libclang.so.1".to_string()]
    }
}

fn default_system_dirs() -> Vec<PathBuf> {
    let dirs: &[&str] = if cfg!(target_os = "windows") {
        &["C:\\Program Files\\LLVM\\bin"]
    } else if cfg!(target_os = "macos") {
        &[
            "/Library/Developer/CommandLineTools/usr/lib",
            "/Applications/Xcode.app/Contents/Developer/Toolchains/XcodeDefault.xctoolchain/usr/lib",
            "/opt/homebrew/opt/llvm/lib",
            "/usr/local/opt/llvm/lib",
        ]
    } else {
        &["/usr/lib", "/usr/lib64", "/usr/local/lib", "/usr/lib/x86_64-linux-gnu"]
    };
    dirs.iter().map(PathBuf::from).collect()
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            library_path: None,
            search_paths: Vec::new(),
            use_env: true,
            file_names: default_file_names(),
        }
    }
}

impl LoaderConfig {
    /// Create a loader configuration with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method: load exactly this file (or search this directory)
    pub fn with_library_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.library_path = Some(path.into());
        self
    }

    /// Builder method: add a search directory
    pub fn add_search_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.search_paths.push(path.into());
        self
    }

    /// Builder method: enable or disable the LIBCLANG_PATH lookup
    pub fn with_env_lookup(mut self, enabled: bool) -> Self {
        self.use_env = enabled;
        self
    }

    /// Builder method: replace the candidate file names
    pub fn with_file_names(mut self, names: Vec<String>) -> Self {
        self.file_names = names;
        self
    }

    /// Ordered list of paths the loader should try
    ///
    /// Explicit path first, then LIBCLANG_PATH, then configured search
    /// directories, then well-known system directories, and finally the
    /// bare file names so the platform loader can apply its own search.
    pub fn candidates(&self) -> Vec<PathBuf> {
        let mut candidates = Vec::new();

        if let Some(path) = &self.library_path {
            self.expand(path, &mut candidates);
        }

        if self.use_env {
            if let Some(value) = env::var_os(LIBCLANG_PATH_ENV) {
                self.expand(Path::new(&value), &mut candidates);
            }
        }

        for dir in self.search_paths.iter().cloned().chain(default_system_dirs()) {
            for name in &self.file_names {
                candidates.push(dir.join(name));
            }
        }

        for name in &self.file_names {
            candidates.push(PathBuf::from(name));
        }

        // Keep the first occurrence of each path
        let mut unique = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            if !unique.contains(&candidate) {
                unique.push(candidate);
            }
        }
        unique
    }

    fn expand(&self, path: &Path, candidates: &mut Vec<PathBuf>) {
        if path.is_dir() {
            for name in &self.file_names {
                candidates.push(path.join(name));
            }
        } else {
            candidates.push(path.to_path_buf());
        }
    }
}
