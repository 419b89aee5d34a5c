//! Keyward CLI Application
//!
//! Command-line front end for the keyward-bridge library. It:
//! - Replays a JSON operations file into the action queue
//! - Fires simulated host events through the built-in callbacks against a
//!   JSON data file, printing each callback's output slots
//! - Prints the resulting submission message for the spreadsheet host

use anyhow::{Context, Result};
use clap::Parser;
use keyward_bridge::{
    parse_operations, CallbackRegistry, DisplayHost, JsonFileAccessor, KeywardApi,
    LocalEventSource, Operation, StdoutDisplay, StdoutTransport,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;

mod callbacks;
mod config;
mod events;
mod report;

use config::AppConfig;

/// Keyward - Build and submit spreadsheet actions from the command line
#[derive(Parser, Debug)]
#[command(name = "keyward")]
#[command(about = "Replay table operations and callbacks against a data file", long_about = None)]
#[command(version)]
struct Args {
    /// Path to configuration file (keyward.toml)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// JSON operations file to replay
    #[arg(long, value_name = "FILE")]
    ops: Option<PathBuf>,

    /// JSON data file holding the selected table
    #[arg(short, long, value_name = "FILE")]
    data: Option<PathBuf>,

    /// Active table for operations that name none
    #[arg(short, long, value_name = "NAME")]
    table: Option<String>,

    /// Fire a records-changed event through the built-in callbacks
    #[arg(long)]
    dispatch: bool,

    /// Also fire a record-changed event for this row id (implies --dispatch)
    #[arg(long, value_name = "ROW_ID")]
    record: Option<i64>,

    /// Print the submission message on one line
    #[arg(long)]
    compact: bool,

    /// Verbosity level (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long)]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Initialize logging
    init_logging(args.verbose, args.quiet);

    log::info!("Keyward CLI v{}", env!("CARGO_PKG_VERSION"));
    log::info!("Using bridge library v{}", keyward_bridge::VERSION);

    let mut app = match &args.config {
        Some(path) => {
            log::info!("Loading configuration from: {:?}", path);
            config::load_config(path)?
        }
        None => AppConfig::default(),
    };
    apply_overrides(&mut app, &args);
    app.bridge.validate().context("Invalid settings")?;

    if app.cli.ops_file.is_none() && !app.cli.dispatch {
        println!("Keyward - Nothing to do");
        println!("\nQuick Start:");
        println!("  keyward --ops ops.json --table People");
        println!("  keyward --data data.json --dispatch --record 3");
        println!("\nFor persistent settings:");
        println!("  keyward --config keyward.toml");
        println!("\nUse --help for more options");
        return Ok(());
    }

    run(&app).await
}

/// Command-line flags take precedence over the config file
fn apply_overrides(app: &mut AppConfig, args: &Args) {
    if let Some(table) = &args.table {
        app.bridge.default_table = table.clone();
    }
    if let Some(data) = &args.data {
        app.bridge.data_path = data.clone();
    }
    if let Some(ops) = &args.ops {
        app.cli.ops_file = Some(ops.clone());
    }
    if args.dispatch {
        app.cli.dispatch = true;
    }
    if args.record.is_some() {
        app.cli.record = args.record;
    }
    // A record event is only fired during dispatch
    if app.cli.record.is_some() {
        app.cli.dispatch = true;
    }
    if args.compact {
        app.cli.pretty = false;
    }
}

fn load_operations(path: &Path) -> Result<Vec<Operation>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read operations file: {:?}", path))?;
    let operations = parse_operations(&content)
        .with_context(|| format!("Failed to parse operations file: {:?}", path))?;
    log::info!("Loaded {} operation(s) from {:?}", operations.len(), path);
    Ok(operations)
}

async fn run(app: &AppConfig) -> Result<()> {
    let accessor = Arc::new(JsonFileAccessor::new(app.bridge.data_path.clone()));
    let api = KeywardApi::new(&app.bridge, accessor.clone());

    let operations = match &app.cli.ops_file {
        Some(path) => load_operations(path)?,
        None => Vec::new(),
    };

    if app.cli.dispatch {
        // Operations run inside a callback, once per table change
        let display: Arc<dyn DisplayHost> = if app.bridge.rich_display {
            Arc::new(report::ConsoleDisplay::default())
        } else {
            Arc::new(StdoutDisplay)
        };
        let registry = CallbackRegistry::new(
            Arc::new(LocalEventSource::new()),
            accessor,
            display,
            &app.bridge,
        );
        callbacks::register_builtin(&registry, &api, operations).await?;

        let planned = events::planned_events(app.cli.record);
        for report in events::run_events(&registry, planned).await? {
            report::print_dispatch(&report);
        }
    } else {
        for operation in operations {
            operation.apply(api.ops());
        }
    }

    let prompt = api.apply_button();
    println!("{}", prompt);
    if let Some(button) = prompt.button() {
        if app.cli.pretty {
            println!("{}", report::format_message(button.message(), true)?);
        } else {
            button.activate(&StdoutTransport)?;
        }
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
