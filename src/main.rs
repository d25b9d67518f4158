// Only compile UI module when TUI feature is enabled
#[cfg(feature = "tui")]
mod ui;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use joint_transfers::{
    load_csv, rebuild_rows, render_host_page, Config, HostDocument, PageDocument, PanelView,
    SelectionSession, DEFAULT_CONFIG_FILE,
};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

/// Joint Transfers - keep a multi-row selection and a running total on a
/// transaction list that keeps re-rendering itself.
///
/// Examples:
///   joint-transfers summary rows.csv --select a,b
///   joint-transfers summary rows.csv --select a,b --rebuild --json
///   joint-transfers demo rows.csv
///   joint-transfers init-config
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to configuration file
    ///
    /// If not specified, looks for joint-transfers.toml in the current directory
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Only log errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Select rows of a fixture page and print the resulting summary panel
    Summary {
        /// CSV with Id,Date,Description,Category,Amount headers
        rows: PathBuf,

        /// Row ids to click, in order
        #[arg(short, long, value_delimiter = ',')]
        select: Vec<String>,

        /// Let the host rebuild its rows afterwards, then press refresh
        #[arg(long)]
        rebuild: bool,

        /// Print the summary as JSON
        #[arg(long)]
        json: bool,
    },

    /// Interactive terminal demo of select / rebuild / refresh
    Demo {
        /// CSV with Id,Date,Description,Category,Amount headers
        rows: PathBuf,
    },

    /// Write a default joint-transfers.toml
    InitConfig {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

impl Cli {
    /// Filter used when RUST_LOG is unset
    fn log_filter(&self, config: &Config) -> String {
        if self.quiet {
            "error".to_string()
        } else if self.verbose {
            "debug".to_string()
        } else {
            config.logging.level.clone()
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match &cli.command {
        Command::InitConfig { force } => handle_init_config(*force),
        Command::Summary {
            rows,
            select,
            rebuild,
            json,
        } => {
            let config = load_config(cli.config.as_deref())?;
            init_logging(&cli.log_filter(&config));
            run_summary(config, rows, select, *rebuild, *json)
        }
        Command::Demo { rows } => {
            let config = load_config(cli.config.as_deref())?;
            // Log lines would tear the alternate screen apart
            if cli.verbose {
                init_logging("debug");
            }
            run_demo(config, rows)
        }
    }
}

/// Initialize logging; RUST_LOG wins over the configured level.
fn init_logging(default_filter: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => Config::load(path),
        None => Ok(Config::load_default()?.unwrap_or_default()),
    }
}

/// Handle init-config: generate a default joint-transfers.toml.
fn handle_init_config(force: bool) -> Result<()> {
    let path = Path::new(DEFAULT_CONFIG_FILE);

    if path.exists() && !force {
        bail!(
            "{} already exists. Remove it, edit it, or pass --force.",
            DEFAULT_CONFIG_FILE
        );
    }

    let content = Config::default_toml()?;
    std::fs::write(path, content)
        .with_context(|| format!("Failed to write {}", DEFAULT_CONFIG_FILE))?;

    println!("✅ Created {} with default settings.", DEFAULT_CONFIG_FILE);
    Ok(())
}

fn run_summary(
    config: Config,
    rows_path: &Path,
    select: &[String],
    rebuild: bool,
    json: bool,
) -> Result<()> {
    let rows = load_csv(rows_path)?;
    info!(rows = rows.len(), path = %rows_path.display(), "loaded host rows");

    let schema = config.schema.clone();
    let mut doc = PageDocument::new();
    render_host_page(&mut doc, &schema, &rows).context("Failed to render host page")?;

    let mut session = SelectionSession::new(config);
    session.mark_ready(&mut doc);

    for id in select {
        let control = doc
            .element_by_id(id)
            .and_then(|row| doc.select_first(row, &schema.control));
        match control {
            Some(control) => {
                let outcome = session.dispatch_click(&mut doc, control);
                debug!(?outcome, "clicked control");
            }
            None => warn!(row_id = %id, "no selectable row with this id"),
        }
    }

    if rebuild {
        rebuild_rows(&mut doc, &schema, &rows).context("Failed to rebuild host rows")?;
        if let Some(button) = doc.select_first(doc.root(), &schema.refresh) {
            session.dispatch_click(&mut doc, button);
        }
    }

    if json {
        println!("{}", serde_json::to_string_pretty(session.summary())?);
    } else {
        match PanelView::read(&doc, &schema) {
            Some(view) => print!("{}", view.render_text()),
            None => println!("No summary panel rendered (container missing)"),
        }
    }

    Ok(())
}

#[cfg(feature = "tui")]
fn run_demo(config: Config, rows_path: &Path) -> Result<()> {
    let rows = load_csv(rows_path)?;

    let mut app = ui::App::new(config, rows)?;
    ui::run_ui(&mut app)?;

    println!("\n✅ Demo closed ({} rows in summary)", app.session.summary().count());
    Ok(())
}

#[cfg(not(feature = "tui"))]
fn run_demo(_config: Config, _rows_path: &Path) -> Result<()> {
    bail!("TUI demo not available. Rebuild with: cargo build --features tui")
}
