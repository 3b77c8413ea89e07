use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

use macbroom::cleaner::{self, SystemTrash};
use macbroom::cli::args::{CategoryArgs, Cli, Commands, ConfigAction, OutputFormat, RiskFilter};
use macbroom::cli::{output, prompt};
use macbroom::common::config::Config;
use macbroom::common::{format, CancelToken, CommandRunner, SystemRunner};
use macbroom::history::{History, Method};
use macbroom::scanner::apps::AppScanner;
use macbroom::scanner::targets::total_size;
use macbroom::scanner::walker::{expand_tilde, ExcludeSet};
use macbroom::scanner::{spacelens, Engine, ScanOutcome, Target};
use macbroom::snapshot::{self, Snapshot, SnapshotError};

fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.no_color {
        colored::control::set_override(false);
    }

    init_logging(cli.verbose);

    match cli.command {
        Commands::Scan {
            ref categories,
            detailed,
        } => cmd_scan(&cli, categories, detailed),

        Commands::Clean {
            ref categories,
            permanent,
            yes,
            dry_run,
            max_risk,
        } => cmd_clean(&cli, categories, permanent, yes, dry_run, max_risk),

        Commands::Uninstall {
            ref app,
            permanent,
            yes,
            dry_run,
        } => cmd_uninstall(&cli, app, permanent, yes, dry_run),

        Commands::Spacelens {
            ref path,
            interactive,
        } => cmd_spacelens(&cli, path, interactive),

        Commands::History => cmd_history(&cli),

        Commands::Config { action } => cmd_config(action),

        Commands::Completions { shell } => {
            use clap::CommandFactory;
            let mut cmd = Cli::command();
            clap_complete::generate(
                clap_complete::Shell::from(shell),
                &mut cmd,
                "macbroom",
                &mut std::io::stdout(),
            );
            Ok(())
        }
    }
}

/// Logs go to stderr so JSON on stdout stays parseable
fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("macbroom=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("macbroom=warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn show_progress(cli: &Cli) -> bool {
    !cli.quiet && matches!(cli.format, OutputFormat::Human)
}

// ─── Scan ─────────────────────────────────────────────────────────────────────

struct ScanRun {
    outcome: ScanOutcome,
    runner: Arc<dyn CommandRunner>,
    clean_timeout: Duration,
    duration_secs: f64,
}

/// Load config, merge one-off excludes, and run the selected scanners
fn run_scan(categories: &CategoryArgs, show_progress: bool) -> Result<ScanRun> {
    let mut config = Config::load()?;
    config.exclude.extend(categories.exclude.iter().cloned());

    let runner: Arc<dyn CommandRunner> = Arc::new(SystemRunner::new(config.command_timeout()));
    let engine = Engine::from_filter(&categories.to_filter(), &config, runner.clone());
    let cancel = CancelToken::with_timeout(config.scan_timeout());
    tracing::debug!("running scanners: {:?}", engine.scanner_names());

    let pb = if show_progress {
        let pb = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
            pb.set_style(style);
        }
        pb.enable_steady_tick(Duration::from_millis(100));
        Some(pb)
    } else {
        None
    };

    let start = Instant::now();
    let result = engine.scan_with_progress(&cancel, |name| {
        if let Some(ref pb) = pb {
            pb.set_message(format!("Scanning {}...", name));
        }
    });
    if let Some(ref pb) = pb {
        pb.finish_and_clear();
    }

    let outcome = result.context("Scan stopped")?;
    Ok(ScanRun {
        outcome,
        runner,
        clean_timeout: config.clean_timeout(),
        duration_secs: start.elapsed().as_secs_f64(),
    })
}

fn cmd_scan(cli: &Cli, categories: &CategoryArgs, detailed: bool) -> Result<()> {
    let run = run_scan(categories, show_progress(cli))?;
    let outcome = &run.outcome;

    let snapshot_path = Config::snapshot_path();
    let previous = match snapshot::load(&snapshot_path) {
        Ok(snap) => Some(snap),
        Err(SnapshotError::NotFound(_)) => None,
        Err(e) => {
            tracing::warn!("ignoring previous scan: {}", e);
            None
        }
    };
    let current = Snapshot::from_targets(&outcome.targets);
    let diff = previous.as_ref().map(|prev| snapshot::diff(prev, &current));

    // An incomplete scan would show up as shrinkage next time
    if outcome.is_complete() {
        snapshot::save(&snapshot_path, &current)
            .with_context(|| format!("Failed to save scan to {}", snapshot_path.display()))?;
    }

    match cli.format {
        OutputFormat::Human => {
            output::print_scan_results(&outcome.targets, run.duration_secs, detailed);
            if let Some(ref diff) = diff {
                output::print_diff(diff);
            }
            output::print_failures(&outcome.failures);
        }
        OutputFormat::Json => output::print_scan_json(&outcome.targets, diff.as_ref(), &outcome.failures),
        OutputFormat::Quiet => output::print_scan_quiet(&outcome.targets, &outcome.failures),
    }

    if !outcome.is_complete() {
        anyhow::bail!(
            "{} scanner(s) failed; the snapshot was not updated",
            outcome.failures.len()
        );
    }
    Ok(())
}

// ─── Clean ────────────────────────────────────────────────────────────────────

fn cmd_clean(
    cli: &Cli,
    categories: &CategoryArgs,
    permanent: bool,
    yes: bool,
    dry_run: bool,
    max_risk: RiskFilter,
) -> Result<()> {
    let run = run_scan(categories, show_progress(cli))?;

    if !run.outcome.is_complete() {
        if !cli.quiet {
            output::print_failures(&run.outcome.failures);
        }
        anyhow::bail!("Refusing to clean after an incomplete scan");
    }

    let max = max_risk.level();
    let (targets, skipped): (Vec<Target>, Vec<Target>) = run
        .outcome
        .targets
        .into_iter()
        .partition(|t| t.risk <= max);

    if !skipped.is_empty() && !cli.quiet && matches!(cli.format, OutputFormat::Human) {
        println!(
            "  {} Skipping {} above {} risk (use {} to include)",
            "ℹ".cyan(),
            format::format_count(skipped.len()),
            max,
            "--max-risk".cyan()
        );
    }

    let removal = Removal {
        runner: run.runner,
        timeout: run.clean_timeout,
        permanent,
    };
    remove_targets(cli, &targets, removal, yes, dry_run)
}

/// How confirmed targets are removed
struct Removal {
    runner: Arc<dyn CommandRunner>,
    /// Budget for the whole removal, counted from confirmation
    timeout: Duration,
    permanent: bool,
}

/// Confirm, remove and record. Shared by `clean` and `uninstall`.
fn remove_targets(cli: &Cli, targets: &[Target], removal: Removal, yes: bool, dry_run: bool) -> Result<()> {
    let permanent = removal.permanent;
    if targets.is_empty() {
        if !cli.quiet {
            println!("  {} Nothing to clean!", "✓".green());
        }
        return Ok(());
    }

    let human = matches!(cli.format, OutputFormat::Human);
    if human && !cli.quiet {
        output::print_clean_plan(targets);
    }

    if dry_run {
        match cli.format {
            OutputFormat::Json => output::print_scan_json(targets, None, &[]),
            _ => println!(
                "  {} Dry run: would remove {} ({}). Nothing was touched.",
                "ℹ".cyan(),
                format::format_count(targets.len()),
                format::format_size(total_size(targets))
            ),
        }
        return Ok(());
    }

    if !yes {
        let verb = if permanent {
            "PERMANENTLY DELETE"
        } else {
            "Move to Trash"
        };
        let question = format!(
            "{} {} ({})?",
            verb,
            format::format_count(targets.len()),
            format::format_size(total_size(targets))
        );
        if !prompt::confirm(&question, permanent)? {
            println!("  {} Cancelled", "✗".red());
            return Ok(());
        }
    }

    let method = if permanent { Method::Permanent } else { Method::Trash };
    let cancel = CancelToken::with_timeout(removal.timeout);
    let trash = SystemTrash::default()
        .with_runner(removal.runner)
        .with_cancel(cancel.clone());
    let report = cleaner::clean(targets, method, &trash, &cancel, show_progress(cli));

    let history = History::default();
    if let Err(e) = history.record_all(&report.history_entries(Utc::now())) {
        tracing::warn!("failed to record cleanup history: {}", e);
    }

    match cli.format {
        OutputFormat::Human => output::print_clean_report(&report),
        OutputFormat::Json => output::print_clean_json(&report),
        OutputFormat::Quiet => output::print_clean_quiet(&report),
    }

    if let Some(reason) = report.cancelled {
        return Err(reason).context("Clean stopped early");
    }
    if !report.failures.is_empty() {
        anyhow::bail!(
            "{} removed, {} failed",
            report.removed,
            report.failures.len()
        );
    }
    Ok(())
}

// ─── Uninstall ────────────────────────────────────────────────────────────────

fn cmd_uninstall(cli: &Cli, app: &str, permanent: bool, yes: bool, dry_run: bool) -> Result<()> {
    let config = Config::load()?;
    let scanner = AppScanner::default();
    let cancel = CancelToken::with_timeout(config.scan_timeout());

    let targets = scanner
        .find_related_files(&cancel, app)
        .with_context(|| format!("Failed to look up '{}'", app))?;
    let targets = ExcludeSet::new(&config.exclude)
        .apply(targets, &cancel)
        .context("Lookup stopped")?;

    if targets.is_empty() {
        let installed = scanner.list_apps();
        let close: Vec<&String> = installed
            .iter()
            .filter(|name| name.to_lowercase().contains(&app.to_lowercase()))
            .take(5)
            .collect();
        if !close.is_empty() && !cli.quiet {
            println!("  Did you mean:");
            for name in close {
                println!("    {}", name.cyan());
            }
        }
        anyhow::bail!("No application or leftover files found for '{}'", app);
    }

    let removal = Removal {
        runner: Arc::new(SystemRunner::new(config.command_timeout())),
        timeout: config.clean_timeout(),
        permanent,
    };
    remove_targets(cli, &targets, removal, yes, dry_run)
}

// ─── Space Lens ───────────────────────────────────────────────────────────────

fn cmd_spacelens(cli: &Cli, path: &str, interactive: bool) -> Result<()> {
    let root = expand_tilde(path);
    if !root.is_dir() {
        anyhow::bail!("Not a directory: {}", root.display());
    }

    if interactive {
        return macbroom::tui::run_spacelens(&root);
    }

    let pb = if show_progress(cli) {
        let pb = ProgressBar::new_spinner();
        pb.set_message(format!("Analyzing {}...", format::format_path(&root)));
        pb.enable_steady_tick(Duration::from_millis(100));
        Some(pb)
    } else {
        None
    };
    let result = spacelens::analyze(&root, &CancelToken::new());
    if let Some(ref pb) = pb {
        pb.finish_and_clear();
    }
    let nodes = result.with_context(|| format!("Failed to analyze {}", root.display()))?;

    match cli.format {
        OutputFormat::Human => output::print_spacelens(&root, &nodes),
        OutputFormat::Json => output::print_spacelens_json(&nodes),
        OutputFormat::Quiet => println!("{}  {}", spacelens::total_size(&nodes), nodes.len()),
    }
    Ok(())
}

// ─── History ──────────────────────────────────────────────────────────────────

fn cmd_history(cli: &Cli) -> Result<()> {
    let history = History::default();
    let stats = history
        .stats()
        .with_context(|| format!("Failed to read {}", history.path().display()))?;

    match cli.format {
        OutputFormat::Human => output::print_stats(&stats),
        OutputFormat::Json => output::print_stats_json(&stats),
        OutputFormat::Quiet => println!("{}  {}", stats.total_freed, stats.total_cleanups),
    }
    Ok(())
}

// ─── Config ───────────────────────────────────────────────────────────────────

fn cmd_config(action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Init => {
            let dir = Config::data_dir();
            std::fs::create_dir_all(&dir)
                .with_context(|| format!("Failed to create {}", dir.display()))?;
            if Config::config_path().exists() {
                println!("  {} Already initialized at {}", "✓".green(), dir.display());
            } else {
                Config::default().save()?;
                println!("  {} macbroom initialized at {}", "✓".green(), dir.display());
            }
            Ok(())
        }
        ConfigAction::Show => {
            let config = Config::load()?;
            println!("{}", toml::to_string_pretty(&config)?);
            Ok(())
        }
        ConfigAction::Reset => {
            Config::default().save()?;
            println!("  {} Configuration reset to defaults", "✓".green());
            Ok(())
        }
        ConfigAction::Set { key, value } => {
            let mut config = Config::load()?;
            config.set(&key, &value)?;
            config.save()?;
            println!("  {} Set {} = {}", "✓".green(), key, value);
            Ok(())
        }
    }
}
