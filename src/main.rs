use anyhow::Result;
use appcycle::{AppcycleConfig, Orchestrator, SimulatedModule, SimulatedModuleConfig, StageConfig};
use clap::Parser;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;

#[derive(Parser, Debug)]
#[command(name = "appcycle")]
#[command(about = "Run simulated modules through a grouped init, run and shutdown lifecycle")]
#[command(version)]
#[command(long_about = "Drives configured modules through healthcheck, init, run and shutdown \
phases. The privileged 'global' group runs first; other groups run concurrently. A signal or \
stop request starts a graceful shutdown bounded by the configured timeout.")]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "appcycle.toml", help = "Path to TOML configuration file")]
    config: String,

    /// Enable debug logging (most verbose)
    #[arg(short, long, help = "Enable debug level logging")]
    debug: bool,

    /// Enable verbose logging (info level)
    #[arg(short, long, help = "Enable verbose info level logging")]
    verbose: bool,

    /// Enable quiet mode (errors only)
    #[arg(short, long, help = "Enable quiet mode - only log errors")]
    quiet: bool,

    /// Validate configuration and exit
    #[arg(long, help = "Validate configuration file and exit without starting modules")]
    validate_config: bool,

    /// Print default configuration and exit
    #[arg(long, help = "Print an example configuration in TOML format and exit")]
    print_config: bool,

    /// Run healthchecks before starting
    #[arg(long, help = "Run every module healthcheck once and print the report as JSON")]
    health_report: bool,

    /// Request shutdown after a delay
    #[arg(long, value_name = "MS", help = "Trigger graceful shutdown after this many milliseconds")]
    stop_after: Option<u64>,

    /// Exit code used by --stop-after
    #[arg(long, value_name = "CODE", default_value_t = 0)]
    stop_exit_code: i32,

    /// Override log format (json, pretty, compact)
    #[arg(long, value_name = "FORMAT", help = "Log output format: json, pretty, or compact")]
    log_format: Option<String>,

    /// Also write logs to daily rolling files in this directory
    #[arg(long, value_name = "DIR")]
    log_dir: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if args.print_config {
        print_default_config()?;
        return Ok(());
    }

    let log_guard = init_logging(&args)?;

    info!("Starting appcycle v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration file: {}", args.config);

    let config = match AppcycleConfig::load_from_file(&args.config) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    if args.validate_config {
        match config.validate() {
            Ok(()) => {
                info!("Configuration validation successful");
                println!("✓ Configuration is valid");
                return Ok(());
            }
            Err(e) => {
                error!("Configuration validation failed: {}", e);
                eprintln!("✗ Configuration validation failed: {}", e);
                std::process::exit(1);
            }
        }
    }
    config.validate()?;

    let orchestrator = Orchestrator::new(config.orchestrator.clone()).map_err(|e| {
        error!("Failed to create orchestrator: {}", e);
        e
    })?;

    for module in config.modules {
        let group = module.group.clone();
        let component = SimulatedModule::new(module).into_component();
        match group {
            Some(group) => orchestrator.add_module_to_group(&group, component)?,
            None => {
                let group = orchestrator.add_component_auto_group(component)?;
                info!("Module registered in group '{}'", group);
            }
        }
    }

    if args.health_report {
        let report = orchestrator.run_healthchecks().await;
        println!("{}", serde_json::to_string_pretty(&report)?);
        if !report.is_healthy() {
            warn!("Healthcheck reported problems");
        }
    }

    if let Some(delay_ms) = args.stop_after {
        let trigger = orchestrator.stop_trigger();
        let exit_code = args.stop_exit_code;
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            info!("Stop requested after {} ms", delay_ms);
            trigger.fire(exit_code);
        });
    }

    let outcome = orchestrator
        .start(CancellationToken::new())
        .await
        .map_err(|e| {
            error!("Application error during execution: {}", e);
            e
        })?;

    if !outcome.is_clean() {
        warn!("Unfinished modules at exit: {}", outcome.unfinished.join(", "));
    }
    info!("appcycle exited with code: {}", outcome.exit_code);

    // Flush file logs; process::exit skips destructors
    drop(log_guard);
    std::process::exit(outcome.exit_code);
}

fn init_logging(args: &Args) -> Result<Option<WorkerGuard>> {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

    // Determine log level based on flags
    let log_level = if args.debug {
        "debug"
    } else if args.verbose {
        "info"
    } else if args.quiet {
        "error"
    } else {
        "warn"
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("appcycle={}", log_level)));

    let fmt_layer = match args.log_format.as_deref() {
        Some("json") => fmt::layer()
            .json()
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .boxed(),
        Some("compact") => fmt::layer()
            .compact()
            .with_target(false)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .boxed(),
        Some("pretty") | None => fmt::layer()
            .pretty()
            .with_target(true)
            .with_thread_ids(args.debug)
            .with_file(args.debug)
            .with_line_number(args.debug)
            .boxed(),
        Some(format) => {
            eprintln!("Warning: Unknown log format '{}', using default", format);
            fmt::layer()
                .with_target(true)
                .with_thread_ids(args.debug)
                .with_file(args.debug)
                .with_line_number(args.debug)
                .boxed()
        }
    };

    let (file_layer, guard) = match args.log_dir.as_deref() {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "appcycle.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .json()
                .with_ansi(false)
                .with_writer(writer)
                .boxed();
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(file_layer)
        .with(env_filter)
        .init();

    Ok(guard)
}

/// Print an example configuration in TOML format
fn print_default_config() -> Result<()> {
    let mut config = AppcycleConfig::default();
    config.orchestrator.name = "example".to_string();
    config.orchestrator.init_timeout_ms = Some(5_000);

    let mut database = SimulatedModuleConfig::new("database");
    database.group = Some(appcycle::PRIVILEGED_GROUP.to_string());
    database.init = Some(StageConfig {
        duration_ms: Some(500),
        fail: false,
    });
    database.shutdown = Some(StageConfig {
        duration_ms: Some(200),
        fail: false,
    });

    let mut server = SimulatedModuleConfig::new("server");
    server.healthcheck = Some(StageConfig {
        duration_ms: Some(50),
        fail: false,
    });
    server.run = Some(StageConfig::default());
    server.shutdown = Some(StageConfig {
        duration_ms: Some(1_000),
        fail: false,
    });

    config.modules = vec![database, server];

    println!("# appcycle configuration file");
    println!("# Modules without a group get a group of their own");
    println!();
    println!("{}", toml::to_string_pretty(&config)?);
    Ok(())
}
