//! Clang Visit CLI Application
//!
//! Command-line header inspector built on the clang-visit-bridge library.
//! It parses C headers with libclang and reports:
//! - Top-level declarations with types, locations and brief comments
//! - Struct fields, enum constants and function parameters (nested traversals)
//! - Parse diagnostics
//! - Reports as TXT or JSON

use anyhow::{bail, Context, Result};
use clang_visit_bridge::clang;
use clang_visit_bridge::Dispatcher;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;

mod config;
mod inspect;
mod report;

use config::{AppConfig, OutputFormat};
use inspect::InspectOptions;
use report::InspectionReport;

/// Clang Visit - Inspect C headers through libclang
#[derive(Parser, Debug)]
#[command(name = "clang-visit-cli")]
#[command(about = "Inspect declarations in C headers using libclang", long_about = None)]
#[command(version)]
struct Args {
    /// Header files to inspect
    #[arg(value_name = "HEADER")]
    headers: Vec<PathBuf>,

    /// Path to configuration file (config.toml)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// libclang shared library, or the directory containing it
    #[arg(long, value_name = "PATH")]
    libclang: Option<PathBuf>,

    /// Extra compiler argument (can be repeated)
    #[arg(long = "clang-arg", value_name = "ARG", allow_hyphen_values = true)]
    clang_args: Vec<String>,

    /// Report format
    #[arg(short, long, value_enum)]
    format: Option<OutputFormat>,

    /// Output file for the report (default: stdout)
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Skip struct fields, enum constants and parameters
    #[arg(long)]
    no_members: bool,

    /// Also list every top-level cursor
    #[arg(long)]
    dump: bool,

    /// Worker threads (default: one per CPU)
    #[arg(short = 'j', long = "jobs", value_name = "N")]
    jobs: Option<usize>,

    /// Verbosity level (can be repeated: -v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long)]
    quiet: bool,
}

fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Initialize logging
    init_logging(args.verbose, args.quiet);

    log::info!("Clang Visit CLI v{}", env!("CARGO_PKG_VERSION"));
    log::info!("Using bridge library v{}", clang_visit_bridge::VERSION);

    let config = resolve_config(&args)?;

    if config.input.headers.is_empty() {
        println!("Clang Visit - No headers specified");
        println!("\nQuick Start:");
        println!("  clang-visit-cli include/api.h");
        println!("  clang-visit-cli include/api.h --clang-arg=-Iinclude --format json");
        println!("\nWith a configuration file:");
        println!("  clang-visit-cli --config config.toml");
        println!("\nUse --help for more options");
        return Ok(());
    }

    run(&config)
}

/// Load the config file (if any) and apply command-line overrides
fn resolve_config(args: &Args) -> Result<AppConfig> {
    let mut config = match &args.config {
        Some(path) => {
            log::info!("Loading configuration from: {:?}", path);
            config::load_config(path)?
        }
        None => AppConfig::default(),
    };

    config.input.headers.extend(args.headers.iter().cloned());
    config.input.clang_args.extend(args.clang_args.iter().cloned());

    if let Some(path) = &args.libclang {
        config.libclang.library_path = Some(path.clone());
    }
    if let Some(format) = args.format {
        config.output.format = format;
    }
    if let Some(output) = &args.output {
        config.output.output_file = Some(output.clone());
    }
    if args.no_members {
        config.inspect.members = false;
    }
    if args.dump {
        config.output.dump = true;
    }
    if let Some(jobs) = args.jobs {
        config.inspect.threads = jobs;
    }

    Ok(config)
}

/// Inspect every configured header and write the report
fn run(config: &AppConfig) -> Result<()> {
    let libclang = clang::load(&config.libclang).context("Failed to load libclang")?;
    let dispatcher = Arc::new(Dispatcher::new(libclang));

    let options = InspectOptions {
        clang_args: config.input.clang_args.clone(),
        members: config.inspect.members,
        comments: config.output.include_comments,
        dump: config.output.dump,
    };

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.inspect.threads)
        .build()
        .context("Failed to build worker pool")?;

    log::info!(
        "Inspecting {} header(s) on {} worker(s)",
        config.input.headers.len(),
        pool.current_num_threads()
    );

    let (headers, failures) =
        pool.install(|| inspect::inspect_headers(&dispatcher, &config.input.headers, &options));

    let report = InspectionReport::new(libclang.path(), headers, failures);
    report::write_report(&report, &config.output)?;

    log::info!(
        "Inspected {} header(s), {} declaration(s)",
        report.headers.len(),
        report.declaration_count()
    );

    if !report.failures.is_empty() {
        bail!("{} header(s) could not be inspected", report.failures.len());
    }

    Ok(())
}

/// Initialize logging based on verbosity level
fn init_logging(verbose: u8, quiet: bool) {
    use env_logger::Builder;
    use log::LevelFilter;
    use std::io::Write;

    let level = if quiet {
        LevelFilter::Error
    } else {
        match verbose {
            0 => LevelFilter::Info,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    };

    Builder::new()
        .filter_level(level)
        .format(|buf, record| {
            writeln!(
                buf,
                "[{} {}] {}",
                record.level(),
                record.target(),
                record.args()
            )
        })
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_args_override_defaults() {
        let args = Args::parse_from([
            "clang-visit-cli",
            "a.h",
            "b.h",
            "--clang-arg",
            "-Iinclude",
            "--format",
            "json",
            "--no-members",
            "-j",
            "2",
        ]);

        let config = resolve_config(&args).unwrap();
        assert_eq!(config.input.headers, vec![PathBuf::from("a.h"), PathBuf::from("b.h")]);
        assert_eq!(config.input.clang_args, vec!["-Iinclude"]);
        assert_eq!(config.output.format, OutputFormat::Json);
        assert!(!config.inspect.members);
        assert_eq!(config.inspect.threads, 2);
    }

    #[test]
    fn test_args_extend_config_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[input]\nheaders = [\"base.h\"]\nclang_args = [\"-DBASE\"]\n\n[inspect]\nthreads = 3"
        )
        .unwrap();

        let path = file.path().to_string_lossy().into_owned();
        let args = Args::parse_from(["clang-visit-cli", "--config", path.as_str(), "extra.h", "--libclang", "/opt/llvm/lib"]);

        let config = resolve_config(&args).unwrap();
        assert_eq!(config.input.headers, vec![PathBuf::from("base.h"), PathBuf::from("extra.h")]);
        assert_eq!(config.input.clang_args, vec!["-DBASE"]);
        assert_eq!(config.libclang.library_path, Some(PathBuf::from("/opt/llvm/lib")));
        assert_eq!(config.inspect.threads, 3);
        assert_eq!(config.output.format, OutputFormat::Txt);
    }
}
