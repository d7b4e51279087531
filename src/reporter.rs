//! Console summary and JSON artifact output for pipeline runs.

use colored::Colorize;
use std::fs;
use std::path::Path;

use crate::config::Config;
use crate::error::Result;
use crate::fitness::FitnessReport;
use crate::pipeline::PipelineOutcome;
use crate::resolver::{level_for, priority_score};
use crate::types::Severity;

/// Print a colored run summary to the console
pub fn print_summary(outcome: &PipelineOutcome, config: &Config) {
    println!("\n{}", "Schedule Summary".bold().cyan());
    println!("{}", "─".repeat(40));

    let sections = outcome.state.sections().count();
    let slots = outcome.state.slot_count();
    let selected_ok = outcome.selections.iter().filter(|s| s.success).count();
    println!(
        "Sections: {sections}   Weekly slots: {slots}   Students with full schedules: {selected_ok}/{}",
        outcome.selections.len()
    );

    let critical = count_by(outcome, Severity::Critical);
    let high = count_by(outcome, Severity::High);
    let medium = count_by(outcome, Severity::Medium);
    let low = count_by(outcome, Severity::Low) + count_by(outcome, Severity::Info);

    let conflict_line = format!(
        "Conflicts: {critical} critical, {high} high, {medium} medium, {low} low/info"
    );
    if critical > 0 {
        println!("{}", conflict_line.red().bold());
    } else if high > 0 {
        println!("{}", conflict_line.yellow());
    } else {
        println!("{}", conflict_line.green());
    }

    println!(
        "Auto-resolver: {} resolved, {} remaining after {} pass(es)",
        outcome.resolve.resolved, outcome.resolve.remaining, outcome.resolve.iterations
    );
    print_fitness(&outcome.fitness);
    println!("Generated in {} ms", outcome.elapsed_ms);

    // Highest-priority open conflicts, for the operator to chase first
    let mut ranked: Vec<(u8, &str, String)> = outcome
        .detection
        .conflicts
        .iter()
        .map(|c| {
            let score = priority_score(c, &outcome.detection.conflicts, c.detected_at);
            (score, c.kind.name(), c.message.clone())
        })
        .collect();
    ranked.sort_by(|a, b| b.0.cmp(&a.0));
    for (score, kind, message) in ranked.iter().take(3) {
        let level = level_for(*score, &config.priority_bands);
        println!("  [{level:?} {score}] {kind}: {message}");
    }

    if !outcome.detection.warnings.is_empty() {
        println!("\n{}", "Data warnings:".yellow());
        for warning in &outcome.detection.warnings {
            println!("  - {warning}");
        }
    }
}

fn count_by(outcome: &PipelineOutcome, severity: Severity) -> usize {
    outcome
        .detection
        .conflicts
        .iter()
        .filter(|c| c.severity == severity)
        .count()
}

fn print_fitness(fitness: &FitnessReport) {
    let line = format!(
        "Fitness: {:.1} (hard -{:.1}, soft -{:.1}, bonuses +{:.1})",
        fitness.total,
        fitness.hard_penalty,
        fitness.soft_penalty,
        fitness.bonuses()
    );
    if fitness.hard_penalty > 0.0 {
        println!("{}", line.yellow());
    } else {
        println!("{}", line.green());
    }
}

/// Write the run's artifacts: the full state (reloadable), the write
/// log, the conflict list, and the fitness breakdown.
pub fn write_outputs(outcome: &PipelineOutcome, dir: &Path) -> Result<()> {
    fs::create_dir_all(dir)?;

    fs::write(
        dir.join("schedule.json"),
        serde_json::to_string_pretty(&outcome.state)?,
    )?;
    fs::write(
        dir.join("write_log.json"),
        serde_json::to_string_pretty(outcome.state.write_log())?,
    )?;
    fs::write(
        dir.join("conflicts.json"),
        serde_json::to_string_pretty(&outcome.detection.conflicts)?,
    )?;
    fs::write(
        dir.join("fitness.json"),
        serde_json::to_string_pretty(&outcome.fitness)?,
    )?;

    Ok(())
}
