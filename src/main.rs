use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::process::ExitCode;
use std::str::FromStr;
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use wpscout::{
    cache::KnownSlugCache,
    config::Config,
    output::{format_result_to_string, print_result, save_result, OutputFormat},
    paths::results_dir,
    Scanner, Target,
};

/// Exit codes for CI integration
mod exit_codes {
    pub const SUCCESS: u8 = 0;
    pub const ERROR: u8 = 1;
}

#[derive(Parser)]
#[command(name = "wpscout")]
#[command(
    author,
    version,
    about = "Detect WordPress and enumerate its plugins and themes"
)]
struct Cli {
    /// Increase log verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan a site
    Scan {
        /// Site URL; https:// is assumed when no scheme is given
        url: String,

        /// Output format (table, json)
        #[arg(short, long)]
        format: Option<String>,

        /// Write output to file
        #[arg(short, long)]
        output: Option<String>,

        /// Save the component list to the results directory
        #[arg(long)]
        save: bool,

        /// Skip registry lookups for detected plugins
        #[arg(long)]
        no_enrich: bool,

        /// Maximum number of registry slugs to probe
        #[arg(long)]
        max_probes: Option<usize>,

        /// Clear the slug cache before scanning
        #[arg(long)]
        clear_cache: bool,
    },

    /// Show or create config file
    Config {
        /// Generate default config file
        #[arg(long)]
        init: bool,

        /// Show config file path
        #[arg(long)]
        path: bool,
    },

    /// Clear the slug cache
    ClearCache,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli).await {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::from(exit_codes::ERROR)
        }
    }
}

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn run(cli: Cli) -> Result<u8> {
    let mut config = Config::load()?;

    match cli.command {
        Commands::Scan {
            url,
            format,
            output,
            save,
            no_enrich,
            max_probes,
            clear_cache,
        } => {
            if clear_cache {
                KnownSlugCache::with_ttl_hours(config.cache_ttl_hours).clear()?;
            }
            if no_enrich {
                config.enrich_plugins = false;
            }
            if let Some(limit) = max_probes {
                config.max_registry_probes = limit;
            }

            let format_str = format.unwrap_or(config.default_format.clone());
            let save = save || config.save_results;
            run_scan(&config, &url, format_str, output, save).await
        }
        Commands::Config { init, path } => {
            handle_config(init, path)?;
            Ok(exit_codes::SUCCESS)
        }
        Commands::ClearCache => {
            KnownSlugCache::with_ttl_hours(config.cache_ttl_hours).clear()?;
            println!("Cache cleared.");
            Ok(exit_codes::SUCCESS)
        }
    }
}

async fn run_scan(
    config: &Config,
    url: &str,
    format: String,
    output_file: Option<String>,
    save: bool,
) -> Result<u8> {
    let format = OutputFormat::from_str(&format).map_err(|e| anyhow::anyhow!(e))?;
    let is_interactive = format == OutputFormat::Table;

    let target = Target::parse(url)?;
    let scanner = Scanner::from_config(config)?;

    let progress = if is_interactive {
        let pb = ProgressBar::new_spinner();
        pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);
        pb.enable_steady_tick(Duration::from_millis(100));
        pb.set_message(format!("Scanning {}...", target));
        Some(pb)
    } else {
        None
    };

    let result = scanner.scan(&target).await;

    if let Some(pb) = progress {
        if result.platform_detected {
            pb.finish_with_message(format!(
                "WordPress detected, {} components found",
                result.components.len()
            ));
        } else {
            pb.finish_with_message("WordPress not detected");
        }
    }

    if let Some(path) = output_file {
        std::fs::write(&path, format_result_to_string(&result, format)?)?;
        if is_interactive {
            println!("Results written to: {}", path);
        }
    } else {
        print_result(&result, format)?;
    }

    if save && !result.components.is_empty() {
        let path = save_result(&result, &target.file_label(), &results_dir())?;
        if is_interactive {
            println!("Results saved to: {}", path.display());
        }
    }

    Ok(exit_codes::SUCCESS)
}

fn handle_config(init: bool, show_path: bool) -> Result<()> {
    let config_path = Config::config_path();

    if show_path {
        println!("{}", config_path.display());
        return Ok(());
    }

    if init {
        if config_path.exists() {
            println!("Config file already exists at: {}", config_path.display());
            return Ok(());
        }

        let config = Config::default();
        config.save()?;
        println!("Created config file at: {}", config_path.display());
        println!();
        println!("Default configuration:");
        println!("{}", Config::generate_default_config());
        return Ok(());
    }

    if config_path.exists() {
        let content = std::fs::read_to_string(&config_path)?;
        println!("Config file: {}", config_path.display());
        println!();
        println!("{}", content);
    } else {
        println!("No config file found.");
        println!("Run 'wpscout config --init' to create one.");
        println!();
        println!("Config path: {}", config_path.display());
    }

    Ok(())
}
