//! The running summary: per-outcome counts and a capped sample of failing
//! targets, never the full raw error payloads.

use itertools::Itertools;

use crate::domain::TargetEntry;
use crate::services::orchestrator::BatchStats;

const MAX_ERROR_SAMPLE: usize = 10;

fn print_counts(heading: &str, values: Vec<String>) {
    println!("\n{}:", heading);
    let counts = values.into_iter().counts();
    for (value, count) in counts
        .into_iter()
        .sorted_by_key(|(value, count)| (std::cmp::Reverse(*count), value.clone()))
    {
        println!("  {}: {}", value, count);
    }
}

pub fn print_summary(entries: &[TargetEntry]) {
    println!("=== SUMMARY ===");

    print_counts(
        "Auth types",
        entries
            .iter()
            .map(|e| {
                e.auth_type
                    .as_ref()
                    .map(|a| a.to_string())
                    .unwrap_or_else(|| "unchecked".to_string())
            })
            .collect(),
    );
    print_counts(
        "Captcha types",
        entries
            .iter()
            .map(|e| {
                e.captcha_type
                    .map(|c| format!("{:?}", c).to_lowercase())
                    .unwrap_or_else(|| "unchecked".to_string())
            })
            .collect(),
    );
    print_counts(
        "Site status",
        entries
            .iter()
            .map(|e| {
                e.site_status
                    .map(|s| format!("{:?}", s).to_lowercase())
                    .unwrap_or_else(|| "unchecked".to_string())
            })
            .collect(),
    );

    let failing: Vec<&TargetEntry> = entries
        .iter()
        .filter(|e| e.analysis_error.is_some())
        .collect();
    println!("\nSites with errors: {}", failing.len());
    for entry in failing.iter().take(MAX_ERROR_SAMPLE) {
        let mut message = entry.analysis_error.clone().unwrap_or_default();
        message.truncate(80);
        println!("  {}: {}", entry.name, message);
    }
    if failing.len() > MAX_ERROR_SAMPLE {
        println!("  ... and {} more", failing.len() - MAX_ERROR_SAMPLE);
    }
}

pub fn print_batch_stats(stats: &BatchStats) {
    println!(
        "\n=== DONE === ok={}  timeout={}  error={}",
        stats.ok, stats.timed_out, stats.errored
    );
}
