//! Configuration loading and parsing

use anyhow::{Context, Result};
use clang_visit_bridge::LoaderConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Main application configuration (loaded from config.toml)
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub input: InputConfig,
    #[serde(default)]
    pub libclang: LoaderConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub inspect: InspectConfig,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct InputConfig {
    #[serde(default)]
    pub headers: Vec<PathBuf>,
    /// Extra compiler arguments, e.g. "-I/usr/local/include"
    #[serde(default)]
    pub clang_args: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OutputConfig {
    #[serde(default)]
    pub format: OutputFormat,
    pub output_file: Option<PathBuf>,
    #[serde(default = "default_true")]
    pub include_comments: bool,
    /// Also list every top-level cursor as "kind, name"
    #[serde(default)]
    pub dump: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::default(),
            output_file: None,
            include_comments: true,
            dump: false,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Txt,
    Json,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct InspectConfig {
    /// List struct fields, enum constants and function parameters
    #[serde(default = "default_true")]
    pub members: bool,
    /// Worker threads (0 = one per CPU)
    #[serde(default)]
    pub threads: usize,
}

impl Default for InspectConfig {
    fn default() -> Self {
        Self {
            members: true,
            threads: 0,
        }
    }
}

fn default_true() -> bool {
    true
}

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<AppConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let config: AppConfig = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_config_deserialization() {
        let toml_content = r#"
            [input]
            headers = ["include/api.h", "include/types.h"]
            clang_args = ["-Iinclude", "-DNDEBUG"]

            [libclang]
            library_path = "/usr/lib/llvm-17/lib/libclang.so"
            use_env = false

            [output]
            format = "json"

            [inspect]
            members = false
            threads = 4
        "#;

        let config: AppConfig = toml::from_str(toml_content).unwrap();
        assert_eq!(config.input.headers.len(), 2);
        assert_eq!(config.input.clang_args, vec!["-Iinclude", "-DNDEBUG"]);
        assert_eq!(
            config.libclang.library_path,
            Some(PathBuf::from("/usr/lib/llvm-17/lib/libclang.so"))
        );
        assert!(!config.libclang.use_env);
        assert!(!config.libclang.file_names.is_empty());
        assert_eq!(config.output.format, OutputFormat::Json);
        assert!(config.output.include_comments);
        assert!(!config.inspect.members);
        assert_eq!(config.inspect.threads, 4);
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: AppConfig = toml::from_str("").unwrap();
        assert!(config.input.headers.is_empty());
        assert!(config.libclang.use_env);
        assert_eq!(config.output.format, OutputFormat::Txt);
        assert!(config.inspect.members);
    }

    #[test]
    fn test_load_config_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[input]\nheaders = [\"a.h\"]\n\n[output]\nformat = \"txt\"").unwrap();

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.input.headers, vec![PathBuf::from("a.h")]);
    }

    #[test]
    fn test_load_config_reports_bad_toml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[output]\nformat = \"html\"").unwrap();

        let err = load_config(file.path()).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }
}
