use colored::*;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;

use crate::cleaner::CleanReport;
use crate::common::format::{self, format_size, format_size_colored};
use crate::history::Stats;
use crate::scanner::spacelens::{self, SpaceLensNode};
use crate::scanner::targets::total_size;
use crate::scanner::{RiskLevel, ScannerFailure, Target};
use crate::snapshot::DiffResult;

/// Targets of one category, in scan order
pub struct CategoryGroup<'a> {
    pub name: &'a str,
    pub size: u64,
    pub targets: Vec<&'a Target>,
}

/// Group targets by category, keeping first-seen category order
pub fn group_by_category<'a>(targets: &[&'a Target]) -> Vec<CategoryGroup<'a>> {
    let mut groups: Vec<CategoryGroup<'a>> = Vec::new();
    for &t in targets {
        match groups.iter_mut().find(|g| g.name == t.category) {
            Some(group) => {
                group.size += t.size;
                group.targets.push(t);
            }
            None => groups.push(CategoryGroup {
                name: &t.category,
                size: t.size,
                targets: vec![t],
            }),
        }
    }
    groups
}

fn rule() {
    println!("{}", "─".repeat(60).dimmed());
}

// ─── Scan ─────────────────────────────────────────────────────────────────────

/// Print scan results grouped by risk, then by category
pub fn print_scan_results(targets: &[Target], duration_secs: f64, detailed: bool) {
    let total = total_size(targets);

    println!();
    println!("  {}", "macbroom scan results".bold());
    rule();
    println!(
        "  Scanned in {}  •  {} reclaimable  •  {}",
        format::format_duration(duration_secs).cyan(),
        format_size_colored(total),
        format::format_count(targets.len()).dimmed()
    );
    rule();
    println!();

    if targets.is_empty() {
        println!("  {} Nothing to reclaim.", "✓".green());
        println!();
        return;
    }

    let sections = [
        (RiskLevel::Safe, "●".green(), "Safe to Remove".green().bold()),
        (RiskLevel::Moderate, "●".yellow(), "Review Recommended".yellow().bold()),
        (RiskLevel::Dangerous, "●".red(), "Use Caution".red().bold()),
    ];

    for (risk, bullet, title) in sections {
        let items: Vec<&Target> = targets.iter().filter(|t| t.risk == risk).collect();
        if items.is_empty() {
            continue;
        }
        let section_total: u64 = items.iter().map(|t| t.size).sum();
        println!("  {} {} ({})", bullet, title, format_size_colored(section_total));
        println!();
        for group in group_by_category(&items) {
            println!(
                "    {:<36} {:>10}  ({})",
                group.name,
                format_size(group.size),
                format::format_count(group.targets.len()).dimmed()
            );
            if detailed {
                for t in &group.targets {
                    print_target(t);
                }
            }
        }
        println!();
    }

    rule();
    println!("  Total reclaimable: {}", format_size_colored(total));
    println!("  Run {} to clean safely", "macbroom clean".cyan());
    println!();
}

fn print_target(target: &Target) {
    let shown = if target.is_synthetic() {
        target.path.clone()
    } else {
        format::format_path(Path::new(&target.path))
    };
    println!(
        "      {} {:<50} {:>10}",
        "↳".dimmed(),
        format::truncate(&shown, 50),
        format_size(target.size).dimmed()
    );
    if !target.description.is_empty() {
        println!("        {}", target.description.dimmed());
    }
}

/// Print the change since the previous scan
pub fn print_diff(diff: &DiffResult) {
    println!("  {}", "Since last scan".bold());
    if diff.is_unchanged() {
        println!("    {}", "No change.".dimmed());
        println!();
        return;
    }
    for (name, d) in &diff.categories {
        if d.size_delta == 0 && d.items_delta == 0 {
            continue;
        }
        println!(
            "    {:<36} {:>12}  ({:+} items)",
            name,
            format::format_delta_colored(d.size_delta),
            d.items_delta
        );
    }
    println!("    {:<36} {:>12}", "Total".bold(), format::format_delta_colored(diff.total_size_delta));
    println!();
}

/// Print scanners that did not finish
pub fn print_failures(failures: &[ScannerFailure]) {
    if failures.is_empty() {
        return;
    }
    println!(
        "  {} {}",
        "⚠".yellow(),
        format!("{} scanner(s) failed:", failures.len()).yellow()
    );
    for f in failures {
        println!("    {} {}: {}", "→".dimmed(), f.scanner, f.error.to_string().dimmed());
    }
    println!();
}

#[derive(Serialize)]
struct ScanJson<'a> {
    total_size: u64,
    targets: &'a [Target],
    #[serde(skip_serializing_if = "Option::is_none")]
    diff: Option<&'a DiffResult>,
    failures: Vec<FailureJson>,
}

#[derive(Serialize)]
struct FailureJson {
    scanner: String,
    error: String,
}

/// Print scan results as JSON
pub fn print_scan_json(targets: &[Target], diff: Option<&DiffResult>, failures: &[ScannerFailure]) {
    let doc = ScanJson {
        total_size: total_size(targets),
        targets,
        diff,
        failures: failures
            .iter()
            .map(|f| FailureJson {
                scanner: f.scanner.clone(),
                error: f.error.to_string(),
            })
            .collect(),
    };
    match serde_json::to_string_pretty(&doc) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Error serializing results: {}", e),
    }
}

/// Print a minimal summary: total bytes, target count, failed scanners
pub fn print_scan_quiet(targets: &[Target], failures: &[ScannerFailure]) {
    println!("{}  {}  {}", total_size(targets), targets.len(), failures.len());
}

// ─── Clean ────────────────────────────────────────────────────────────────────

/// Print every target a clean would touch
pub fn print_clean_plan(targets: &[Target]) {
    println!();
    for group in group_by_category(&targets.iter().collect::<Vec<_>>()) {
        println!(
            "  {} ({}, {})",
            group.name.bold(),
            format_size_colored(group.size),
            format::format_count(group.targets.len())
        );
        for t in &group.targets {
            println!(
                "    {:<9} {}",
                format::format_risk(t.risk),
                format::truncate(&t.path, 70)
            );
        }
    }
    println!();
}

/// Print the outcome of a clean
pub fn print_clean_report(report: &CleanReport) {
    println!();
    let verb = match report.method {
        crate::history::Method::Trash => "Moved to Trash",
        crate::history::Method::Permanent => "Deleted",
    };
    println!(
        "  {} {}: {} ({})",
        "✓".green(),
        verb,
        format::format_count(report.removed),
        format_size_colored(report.bytes_freed)
    );

    for (name, tally) in &report.by_category {
        println!(
            "    {:<36} {:>10}  ({} items)",
            name,
            format_size(tally.bytes),
            tally.items
        );
    }

    if !report.failures.is_empty() {
        println!();
        println!(
            "  {} {}",
            "✗".red(),
            format!("{} failed:", format::format_count(report.failures.len())).red()
        );
        for f in report.failures.iter().take(10) {
            println!("    {} {}: {}", "→".dimmed(), f.path, f.error.to_string().dimmed());
        }
        if report.failures.len() > 10 {
            println!("    {} ... and {} more", "→".dimmed(), report.failures.len() - 10);
        }
    }

    if let Some(reason) = &report.cancelled {
        println!();
        println!("  {} Stopped early: {}", "⚠".yellow(), reason);
    }
    println!();
}

#[derive(Serialize)]
struct CleanJson<'a> {
    method: String,
    removed: usize,
    failed: usize,
    bytes_freed: u64,
    by_category: BTreeMap<&'a str, u64>,
    failures: Vec<FailureJson>,
    cancelled: bool,
}

/// Print the outcome of a clean as JSON
pub fn print_clean_json(report: &CleanReport) {
    let doc = CleanJson {
        method: report.method.to_string(),
        removed: report.removed,
        failed: report.failures.len(),
        bytes_freed: report.bytes_freed,
        by_category: report
            .by_category
            .iter()
            .map(|(k, v)| (k.as_str(), v.bytes))
            .collect(),
        failures: report
            .failures
            .iter()
            .map(|f| FailureJson {
                scanner: f.category.clone(),
                error: format!("{}: {}", f.path, f.error),
            })
            .collect(),
        cancelled: report.cancelled.is_some(),
    };
    match serde_json::to_string_pretty(&doc) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Error serializing report: {}", e),
    }
}

/// Succeeded, failed, bytes freed
pub fn print_clean_quiet(report: &CleanReport) {
    println!("{}  {}  {}", report.removed, report.failures.len(), report.bytes_freed);
}

// ─── History ──────────────────────────────────────────────────────────────────

/// Print ledger totals, per-category breakdown and recent cleanups
pub fn print_stats(stats: &Stats) {
    println!();
    println!("  {}", "Cleanup history".bold());
    rule();

    if stats.total_cleanups == 0 {
        println!("  No cleanups recorded yet. Run {} first.", "macbroom clean".cyan());
        println!();
        return;
    }

    println!(
        "  Total freed: {} across {} cleanups",
        format_size_colored(stats.total_freed),
        stats.total_cleanups
    );
    println!();

    let mut categories: Vec<_> = stats.by_category.iter().collect();
    categories.sort_by(|a, b| b.1.bytes_freed.cmp(&a.1.bytes_freed).then(a.0.cmp(b.0)));
    for (name, cat) in categories {
        println!(
            "    {:<36} {:>10}  ({}x)",
            name,
            format_size(cat.bytes_freed),
            cat.cleanups
        );
    }

    if !stats.recent.is_empty() {
        println!();
        println!("  {}", "Recent".bold());
        for e in &stats.recent {
            println!(
                "    {}  {:<28} {:>10}  {}",
                e.timestamp.format("%Y-%m-%d %H:%M").to_string().dimmed(),
                e.category,
                format_size(e.bytes_freed),
                e.method.to_string().dimmed()
            );
        }
    }
    println!();
}

/// Print ledger stats as JSON
pub fn print_stats_json(stats: &Stats) {
    match serde_json::to_string_pretty(stats) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Error serializing history: {}", e),
    }
}

// ─── Space Lens ───────────────────────────────────────────────────────────────

/// Print a one-shot listing of a directory's children, largest first
pub fn print_spacelens(path: &Path, nodes: &[SpaceLensNode]) {
    let total = spacelens::total_size(nodes);
    println!();
    println!(
        "  {} ({})",
        format::format_path(path).bold(),
        format_size_colored(total)
    );
    rule();

    if nodes.is_empty() {
        println!("  Empty directory.");
        println!();
        return;
    }

    for node in nodes {
        let share = if total == 0 {
            0.0
        } else {
            node.size as f64 / total as f64 * 100.0
        };
        let name = if node.is_dir {
            format!("{}/", node.name)
        } else {
            node.name.clone()
        };
        println!(
            "  {:>10}  {:>5.1}%  {}",
            format_size(node.size),
            share,
            format::truncate(&name, 50)
        );
    }
    println!();
}

/// Print a Space Lens listing as JSON
pub fn print_spacelens_json(nodes: &[SpaceLensNode]) {
    match serde_json::to_string_pretty(nodes) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Error serializing listing: {}", e),
    }
}
