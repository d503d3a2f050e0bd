use clap::Parser;
use hlsc::diag::{codes, DiagLevel, Diagnostic};
use std::path::{Path, PathBuf};
use tracing_subscriber::filter::LevelFilter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
enum EmitStage {
    /// Driver, kernel header, kernel source, closure report and build info.
    All,
    Driver,
    Kernel,
    Closure,
    BuildInfo,
}

#[derive(Parser, Debug)]
#[command(
    name = "hlsc",
    version,
    about = "HLS lowering backend: turns hardware regions of a lowered pipeline into accelerator kernels and a host driver"
)]
struct Cli {
    /// Input .hir IR file
    source: PathBuf,

    /// Directory for generated files; without it, the selected output goes to stdout
    #[arg(short = 'o', long)]
    out_dir: Option<PathBuf>,

    /// Output stage
    #[arg(long, value_enum, default_value_t = EmitStage::All)]
    emit: EmitStage,

    /// JSON configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the kernel identifier prefix
    #[arg(long)]
    kernel_prefix: Option<String>,

    /// Override the FIFO depth of declared streams
    #[arg(long)]
    stream_depth: Option<usize>,

    /// Print compiler phases, timing and debug events
    #[arg(long)]
    verbose: bool,
}

fn fail(message: impl std::fmt::Display) -> ! {
    eprintln!("hlsc: error: {}", message);
    std::process::exit(2);
}

fn config_fail(err: hlsc::config::ConfigError) -> ! {
    let diag = Diagnostic::new(DiagLevel::Error, None, err.to_string()).with_code(codes::E0002);
    eprintln!("hlsc: {}", diag);
    std::process::exit(2);
}

fn write_output(dir: &Path, file: &str, text: &str, verbose: bool) {
    let path = dir.join(file);
    if let Err(e) = std::fs::write(&path, text) {
        fail(format!("{}: {}", path.display(), e));
    }
    if verbose {
        eprintln!("hlsc: wrote {}", path.display());
    }
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(if cli.verbose {
            LevelFilter::DEBUG
        } else {
            LevelFilter::WARN
        })
        .init();

    if cli.verbose {
        eprintln!("hlsc: source = {}", cli.source.display());
        eprintln!("hlsc: emit   = {:?}", cli.emit);
    }

    // ── Configuration ──
    let mut config = match &cli.config {
        Some(path) => hlsc::config::HlsConfig::load(path).unwrap_or_else(|e| config_fail(e)),
        None => hlsc::config::HlsConfig::default(),
    };
    if let Some(prefix) = &cli.kernel_prefix {
        config.kernel_prefix = prefix.clone();
    }
    if let Some(depth) = cli.stream_depth {
        config.stream_depth = depth;
    }
    if let Err(e) = config.validate() {
        config_fail(e);
    }

    // ── Read and compile ──
    let source = match std::fs::read_to_string(&cli.source) {
        Ok(s) => s,
        Err(e) => fail(format!("{}: {}", cli.source.display(), e)),
    };

    let compilation = match hlsc::pipeline::compile(&source, &config, cli.verbose) {
        Ok(c) => c,
        Err(err) => {
            for diag in &err.diagnostics {
                eprintln!("hlsc: {}", diag);
            }
            if cli.verbose {
                eprintln!("hlsc: {} failed", err.failing_phase.name());
            }
            std::process::exit(1);
        }
    };

    if cli.verbose {
        eprintln!(
            "hlsc: lowered {} hardware region(s)",
            compilation.generated.regions.len()
        );
    }

    // ── Outputs ──
    let generated = &compilation.generated;
    let driver_file = format!("{}.cpp", compilation.pipeline.name);
    let header_file = config.kernel_header_name();
    let kernel_file = format!("{}.cpp", config.kernel_prefix);
    let closure = hlsc::pipeline::closure_report(&generated.regions);
    let build_info = compilation.provenance.to_json();

    let outputs: Vec<(&str, &str)> = match cli.emit {
        EmitStage::All => vec![
            (driver_file.as_str(), generated.driver_source.as_str()),
            (header_file.as_str(), generated.kernel_header.as_str()),
            (kernel_file.as_str(), generated.kernel_source.as_str()),
            ("closure.json", closure.as_str()),
            ("build-info.json", build_info.as_str()),
        ],
        EmitStage::Driver => vec![(driver_file.as_str(), generated.driver_source.as_str())],
        EmitStage::Kernel => vec![
            (header_file.as_str(), generated.kernel_header.as_str()),
            (kernel_file.as_str(), generated.kernel_source.as_str()),
        ],
        EmitStage::Closure => vec![("closure.json", closure.as_str())],
        EmitStage::BuildInfo => vec![("build-info.json", build_info.as_str())],
    };

    match &cli.out_dir {
        Some(dir) => {
            if let Err(e) = std::fs::create_dir_all(dir) {
                fail(format!("{}: {}", dir.display(), e));
            }
            for (file, text) in outputs {
                write_output(dir, file, text, cli.verbose);
            }
        }
        None => {
            let many = outputs.len() > 1;
            for (file, text) in outputs {
                if many {
                    println!("// ── {} ──", file);
                }
                print!("{}", text);
            }
        }
    }
}
