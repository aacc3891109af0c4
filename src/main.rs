use clap::{Parser, Subcommand};
use srcsetter::config::{self, Config, ConfigError};
use srcsetter::run::{self, CancelToken, RunError};
use srcsetter::{discover, output};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "srcsetter")]
#[command(version)]
#[command(about = "Responsive image variant generator")]
#[command(long_about = "\
Responsive image variant generator

Every image under the input root is written at each configured width in each
configured format, mirroring the directory layout, and a <picture> block per
image is collected into one HTML fragment.

  images/                     dist/images/
  ├── b.png                   ├── b-400w.webp  b-400w.jpeg  ...
  └── photos/                 ├── photos/
      └── a.jpg               │   └── a-400w.webp  a-800w.webp  ...
                              ├── pictures.html
                              └── variants.json

Sources are never upscaled: a 300px image still gets every file, at 300px.

Run 'srcsetter gen-config' to generate a documented srcsetter.toml.")]
struct Cli {
    /// Config file (default: ./srcsetter.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Input directory (overrides input_root)
    #[arg(long, global = true)]
    source: Option<PathBuf>,

    /// Output directory (overrides output_root)
    #[arg(long, global = true)]
    output: Option<PathBuf>,

    /// Debug logging on stderr (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Generate variants for every image and write the markup fragment
    Build,
    /// Generate variants for one image and print its <picture> block
    Image {
        /// Image file to process
        path: PathBuf,
    },
    /// List the images a build would process, without encoding anything
    Check,
    /// Print a stock srcsetter.toml with all options documented
    GenConfig,
}

fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Command::GenConfig = cli.command {
        print!("{}", config::stock_config_toml());
        return Ok(ExitCode::SUCCESS);
    }

    let config = resolve_config(&cli)?;
    let cancel = CancelToken::new();

    match &cli.command {
        Command::Build => {
            let (tx, rx) = std::sync::mpsc::channel();
            let printer = std::thread::spawn(move || {
                for event in rx {
                    for line in output::format_run_event(&event) {
                        println!("{}", line);
                    }
                }
            });
            let result = run::run(&config, Some(tx), &cancel);
            printer
                .join()
                .map_err(|_| "progress printer thread panicked")?;

            match result {
                Ok(report) => {
                    output::print_summary(&report);
                    Ok(ExitCode::SUCCESS)
                }
                Err(e) => Ok(report_failure(&e)),
            }
        }
        Command::Image { path } => match run::run_single(&config, path, &cancel) {
            Ok(single) => {
                println!("{}", single.markup);
                Ok(ExitCode::SUCCESS)
            }
            Err(e) => Ok(report_failure(&e)),
        },
        Command::Check => {
            let spec = config.variant_spec()?;
            let images = discover::discover_excluding(&config.input_root, &[config.output_root.as_path()])?;
            output::print_check(&images, &config.input_root, &spec);
            Ok(ExitCode::SUCCESS)
        }
        Command::GenConfig => Ok(ExitCode::SUCCESS),
    }
}

/// Log to stderr. `RUST_LOG` wins; otherwise `warn`, or `debug` with `-v`.
fn init_tracing(verbose: bool) {
    let default_level = if verbose { "warn,srcsetter=debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Load `--config` or `./srcsetter.toml`, then apply `--source` / `--output`.
fn resolve_config(cli: &Cli) -> Result<Config, ConfigError> {
    let mut config = match &cli.config {
        Some(path) => config::load_config_file(path)?,
        None => config::load_config(Path::new("."))?,
    };
    if let Some(source) = &cli.source {
        config.input_root = source.clone();
    }
    if let Some(output) = &cli.output {
        config.output_root = output.clone();
    }
    config.validate()?;
    Ok(config)
}

fn report_failure(err: &RunError) -> ExitCode {
    eprintln!("error: {}", err);
    ExitCode::FAILURE
}
