use anyhow::{anyhow, Result};
use crossterm::style::Stylize;
use paged_grid::config::config::Config;
use paged_grid::config::grid_config::GridConfig;
use paged_grid::data::memory_source::MemoryDataSource;
use paged_grid::state::grid::Grid;
use paged_grid::ui::grid_app::GridApp;
use paged_grid::utils::app_paths::AppPaths;
use paged_grid::utils::logging::init_tracing;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Rows generated when no data file is given
const DEFAULT_SAMPLE_ROWS: usize = 10_000;

#[derive(Debug, Default, PartialEq)]
struct Args {
    data_file: Option<PathBuf>,
    rows: Option<usize>,
    latency_ms: u64,
    grid_file: Option<PathBuf>,
    generate_config: bool,
    help: bool,
}

fn parse_args(args: &[String]) -> Result<Args> {
    let mut parsed = Args::default();
    let mut iter = args.iter();

    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--help" | "-h" => parsed.help = true,
            "--generate-config" => parsed.generate_config = true,
            "--rows" => parsed.rows = Some(value_of(&mut iter, arg)?.parse()?),
            "--latency-ms" => parsed.latency_ms = value_of(&mut iter, arg)?.parse()?,
            "--grid" => parsed.grid_file = Some(PathBuf::from(value_of(&mut iter, arg)?)),
            other if other.starts_with('-') => return Err(anyhow!("Unknown option: {}", other)),
            file => {
                if parsed.data_file.is_some() {
                    return Err(anyhow!("Only one data file can be shown at a time"));
                }
                parsed.data_file = Some(PathBuf::from(file));
            }
        }
    }
    Ok(parsed)
}

fn value_of<'a>(iter: &mut impl Iterator<Item = &'a String>, option: &str) -> Result<&'a String> {
    iter.next()
        .ok_or_else(|| anyhow!("{} needs a value", option))
}

fn print_help() {
    println!("{}", "paged-grid - Virtualized paging data grid".blue().bold());
    println!();
    println!("{}", "Usage:".yellow());
    println!("  paged-grid [OPTIONS] [FILE.csv|FILE.json]");
    println!();
    println!("{}", "Options:".yellow());
    println!("  {}         - Generated rows when no file is given", "--rows N".green());
    println!("  {}   - Simulated data source latency per batch", "--latency-ms N".green());
    println!("  {}    - Grid definition (columns, key, title)", "--grid FILE.toml".green());
    println!("  {} - Generate config file with defaults", "--generate-config".green());
    println!("  {}            - Show this help", "--help".green());
    println!();
    println!("{}", "Keys:".yellow());
    println!("  {}  - Move focus", "↑↓ / j k".green());
    println!("  {} - Page", "PgUp PgDn".green());
    println!("  {} - First / last row", "Home End / g G".green());
    println!("  {}  - Select column", "←→ / h l".green());
    println!("  {}         - Sort selected column (asc, desc, off)", "s".green());
    println!("  {}         - Filter", "/".green());
    println!("  {}     - Find in loaded rows / next match", "f / n".green());
    println!("  {}    - Reload / toggle logs", "Ctrl+R Ctrl+L".green());
    println!("  {}         - Quit", "q".green());
    println!();
}

fn generate_config() -> Result<()> {
    let path = Config::get_config_path()?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&path, Config::create_default_with_comments())?;
    println!("Configuration file created at: {:?}", path);
    println!("Edit this file to customize paged-grid.");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let args = match parse_args(&args) {
        Ok(args) => args,
        Err(e) => {
            eprintln!("{}", e.to_string().red());
            print_help();
            std::process::exit(2);
        }
    };

    if args.help {
        print_help();
        return Ok(());
    }
    if args.generate_config {
        return generate_config();
    }

    let logging = init_tracing(Some(&AppPaths::log_dir()))?;
    if let Some(path) = &logging.log_path {
        eprintln!("📝 Debug logs will be written to:");
        eprintln!("   {}", path.display());
    }

    let config = Config::load()?;

    let mut source = match &args.data_file {
        Some(path) => MemoryDataSource::from_path(path)?,
        None => MemoryDataSource::sample(args.rows.unwrap_or(DEFAULT_SAMPLE_ROWS)),
    };
    if args.latency_ms > 0 {
        source = source.with_latency(Duration::from_millis(args.latency_ms));
    }

    let grid_config = match &args.grid_file {
        Some(path) => GridConfig::load_from(path)?,
        None => {
            let name = args
                .data_file
                .as_ref()
                .and_then(|path| path.file_stem())
                .map(|stem| stem.to_string_lossy().to_string())
                .unwrap_or_else(|| "sample".to_string());
            let key_column = source
                .columns()
                .first()
                .cloned()
                .ok_or_else(|| anyhow!("Data set has no columns"))?;
            GridConfig::for_columns(&name, &key_column, source.columns())
        }
    };
    info!(target: "grid", "Showing {} rows as grid '{}'", source.len(), grid_config.name);

    let grid = Grid::new(Arc::new(source), grid_config, &config.grid)?;
    GridApp::new(grid, config, Some(logging.buffer)).run()
}
