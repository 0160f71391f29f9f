mod cli;

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use cs_core::config::Config;
use cs_core::{IssueId, ScanMode, ScanStatus, SeriesId};
use cs_library::{Library, RescanOutcome};

fn main() -> Result<()> {
    let cli = Cli::parse();

    // RUST_LOG wins over --verbose.
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "comicshelf=debug,cs_library=debug,cs_db=debug,cs_archive=debug,cs_metadata=debug"
                .to_string()
        } else {
            "comicshelf=info,cs_library=info,cs_db=warn,cs_archive=warn,cs_metadata=warn".to_string()
        }
    });

    // Logs go to stderr so stdout stays clean for JSON and page bytes.
    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Version => {
            println!("comicshelf {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        Commands::Validate { ref config } => {
            let path = config.clone().or_else(|| cli.config.clone());
            validate_config(path.as_deref())
        }
        ref command => {
            let config = load_config(&cli)?;
            let library = Library::open(config).context("Failed to open library")?;
            run_command(&library, command, cli.json)
        }
    }
}

/// Load the config named on the command line (strictly) and apply overrides.
fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => read_config(path)?,
        None => Config::default(),
    };
    if let Some(dir) = &cli.data_dir {
        config.storage.data_dir = dir.clone();
    }
    if !cli.roots.is_empty() {
        config.library.roots = cli.roots.clone();
    }
    for warning in config.validate() {
        tracing::warn!("config: {warning}");
    }
    Ok(config)
}

fn read_config(path: &Path) -> Result<Config> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    Config::from_json(&contents).with_context(|| format!("Invalid config file {}", path.display()))
}

fn run_command(library: &Library, command: &Commands, json: bool) -> Result<()> {
    match command {
        Commands::Scan { paths, incremental } => scan(library, paths, *incremental, json),
        Commands::Series => list_series(library, json),
        Commands::Issues { series_id } => list_issues(library, series_id, json),
        Commands::Issue { issue_id } => show_issue(library, issue_id, json),
        Commands::Page {
            issue_id,
            index,
            out,
        } => {
            let page = library.service().get_page(parse_issue_id(issue_id)?, *index)?;
            write_bytes(&page.bytes, out.as_deref())
        }
        Commands::Thumbnail { issue_id, out } => {
            let bytes = library.service().get_thumbnail(parse_issue_id(issue_id)?)?;
            write_bytes(&bytes, out.as_deref())
        }
        Commands::Progress {
            issue_id,
            page,
            read,
        } => {
            library
                .service()
                .set_progress(parse_issue_id(issue_id)?, *page, *read)?;
            println!("Progress saved");
            Ok(())
        }
        Commands::Prune { retired } => {
            let series = library.store().prune_series()?;
            println!("Pruned {series} empty series");
            if *retired {
                let issues = library.store().purge_retired()?;
                println!("Purged {issues} retired issues");
            }
            Ok(())
        }
        Commands::Runs { limit } => list_runs(library, *limit, json),
        Commands::Validate { .. } | Commands::Version => Ok(()),
    }
}

fn scan(library: &Library, paths: &[PathBuf], incremental: bool, json: bool) -> Result<()> {
    let mode = if incremental || !paths.is_empty() {
        ScanMode::Incremental {
            paths: paths.to_vec(),
        }
    } else {
        ScanMode::Full
    };

    let rt = tokio::runtime::Runtime::new()?;
    let outcome = rt.block_on(library.scanner().rescan(mode))?;

    let run = match outcome {
        RescanOutcome::AlreadyRunning => return Err(cs_core::Error::ScanAlreadyRunning.into()),
        RescanOutcome::Finished(run) => run,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&run)?);
    } else {
        let c = &run.counts;
        println!("Scan {} ({}): {}", run.id, run.mode, run.status.as_str());
        println!("  Discovered: {}", c.discovered);
        println!("  Added:      {}", c.added);
        println!("  Updated:    {}", c.updated);
        println!("  Unchanged:  {}", c.unchanged);
        println!("  Retired:    {}", c.retired);
        println!("  Failed:     {}", c.failed);
        if c.conflicts > 0 {
            println!("  Conflicts:  {}", c.conflicts);
        }
    }

    match run.status {
        ScanStatus::Failed => anyhow::bail!(
            "Scan failed: {}",
            run.error.unwrap_or_else(|| "unknown error".into())
        ),
        _ => Ok(()),
    }
}

fn list_series(library: &Library, json: bool) -> Result<()> {
    let series = library.service().list_series()?;
    if json {
        println!("{}", serde_json::to_string_pretty(&series)?);
        return Ok(());
    }
    if series.is_empty() {
        println!("No series indexed");
    }
    for s in &series {
        println!("{}  {} ({} issues)", s.id, s.name, s.issue_count);
    }
    Ok(())
}

fn list_issues(library: &Library, series_id: &str, json: bool) -> Result<()> {
    let id: SeriesId = series_id
        .parse()
        .with_context(|| format!("Invalid series id '{series_id}'"))?;
    let issues = library.service().list_issues(id)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&issues)?);
        return Ok(());
    }
    for issue in &issues {
        let title = issue.title.as_deref().unwrap_or("");
        println!(
            "{}  #{} {}  [{} pages]  {}",
            issue.id, issue.number, title, issue.page_count, issue.file_path
        );
    }
    Ok(())
}

fn show_issue(library: &Library, issue_id: &str, json: bool) -> Result<()> {
    let id = parse_issue_id(issue_id)?;
    let issue = library.service().get_issue(id)?;
    let pages = if issue.retired {
        Vec::new()
    } else {
        library.service().pages(id).unwrap_or_else(|e| {
            tracing::warn!(issue_id = %id, error = %e, "Failed to list pages");
            Vec::new()
        })
    };

    if json {
        let value = serde_json::json!({ "issue": issue, "pages": pages });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    println!("Issue:   {}", issue.id);
    println!("Series:  {}", issue.series_id);
    println!("Number:  {}", issue.number);
    if let Some(title) = &issue.title {
        println!("Title:   {title}");
    }
    if let Some(year) = issue.year {
        println!("Year:    {year}");
    }
    println!("File:    {}", issue.file_path);
    println!("Pages:   {}", issue.page_count);
    println!("Reading: page {} (read: {})", issue.current_page, issue.is_read);
    if issue.retired {
        println!("Retired: {}", issue.retired_at.as_deref().unwrap_or("yes"));
    }
    for page in &pages {
        println!("  [{}] {} ({} bytes)", page.index, page.name, page.size);
    }
    Ok(())
}

fn list_runs(library: &Library, limit: u32, json: bool) -> Result<()> {
    let runs = library.store().list_scan_runs(limit)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&runs)?);
        return Ok(());
    }
    for run in &runs {
        println!(
            "{}  {}  {:<11} +{} ~{} -{} !{}",
            run.started_at.to_rfc3339(),
            run.mode,
            run.status.as_str(),
            run.counts.added,
            run.counts.updated,
            run.counts.retired,
            run.counts.failed
        );
    }
    Ok(())
}

fn validate_config(path: Option<&Path>) -> Result<()> {
    let config = match path {
        Some(p) => {
            println!("Validating config: {}", p.display());
            read_config(p)?
        }
        None => {
            println!("No config file given; checking built-in defaults");
            Config::default()
        }
    };

    println!("✓ Configuration is valid");
    println!("  Roots: {}", config.library.roots.len());
    println!("  Extensions: {}", config.library.extensions.join(", "));
    println!("  Data dir: {}", config.storage.data_dir.display());

    let warnings = config.validate();
    if !warnings.is_empty() {
        println!("Warnings:");
        for w in &warnings {
            println!("  - {w}");
        }
    }
    Ok(())
}

fn parse_issue_id(s: &str) -> Result<IssueId> {
    s.parse()
        .with_context(|| format!("Invalid issue id '{s}'"))
}

fn write_bytes(bytes: &[u8], out: Option<&Path>) -> Result<()> {
    match out {
        Some(path) => std::fs::write(path, bytes)
            .with_context(|| format!("Failed to write {}", path.display())),
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(bytes)?;
            stdout.flush()?;
            Ok(())
        }
    }
}
