//! Command composition: wire configuration, stores, surfaces and batches
//! together for each CLI mode.

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;

use crate::configuration::Settings;
use crate::dal::entry_store::{load_entries_or_default, save_entries, EntryStore};
use crate::dal::worklist::{load_work_list, save_work_list};
use crate::domain::ProductProfile;
use crate::services::orchestrator::{run_batch, BatchLimits, Stage};
use crate::services::surface::{
    BlockedResources, RenderingSurface, SurfacePool, WebDriverSurface,
};
use crate::services::{fetcher, intake, report, triage};

/// Parse a pasted tabular listing and merge the new directories into the
/// entry store.
pub async fn add_targets(settings: &Settings, input_path: &Path) -> anyhow::Result<()> {
    let text = tokio::fs::read_to_string(input_path)
        .await
        .with_context(|| format!("Failed to read listing at {}", input_path.display()))?;

    let store_path = Path::new(&settings.store.entries_path);
    let mut entries = load_entries_or_default(store_path).await?;

    let parsed = intake::parse_tabular(&text);
    log::info!("Parsed {} entries from input", parsed.len());

    let outcome = intake::merge_new(&mut entries, parsed);
    save_entries(store_path, &entries).await?;

    if !outcome.duplicates.is_empty() {
        println!("Skipped {} duplicates:", outcome.duplicates.len());
        for (name, reason) in outcome.duplicates.iter().take(10) {
            println!("  - {} ({})", name, reason);
        }
        if outcome.duplicates.len() > 10 {
            println!("  ... and {} more", outcome.duplicates.len() - 10);
        }
    }
    println!(
        "Added {} new directories, {} total",
        outcome.added.len(),
        entries.len()
    );
    Ok(())
}

/// Settle obviously-broken entries offline and write the browser work list
/// for everything still undecided.
pub async fn triage_targets(settings: &Settings) -> anyhow::Result<()> {
    let store_path = Path::new(&settings.store.entries_path);
    let mut entries = load_entries_or_default(store_path).await?;

    let mut fixed = 0;
    for entry in entries.iter_mut() {
        if triage::triage_entry(entry) {
            fixed += 1;
        }
    }
    save_entries(store_path, &entries).await?;

    let work = triage::build_browser_check_list(&entries);
    save_work_list(Path::new(&settings.store.worklist_path), &work).await?;

    println!("Auto-fixed: {} entries", fixed);
    println!("Need browser check: {} entries", work.len());
    report::print_summary(&entries);
    Ok(())
}

/// The cheap pass: fetch every entry over plain HTTP and classify the raw
/// markup.
pub async fn analyze_targets(settings: &Settings) -> anyhow::Result<()> {
    let store_path = Path::new(&settings.store.entries_path);
    let store = Arc::new(EntryStore::load(store_path).await?);
    let work = triage::build_full_list(&store.snapshot().await);

    let stats = fetcher::run_fetch_pass(
        store.clone(),
        work,
        settings.batch.analyze_workers,
        settings.batch.fetch_timeout(),
        settings.batch.checkpoint_every,
    )
    .await?;

    report::print_batch_stats(&stats);
    report::print_summary(&store.snapshot().await);
    Ok(())
}

async fn connect_pool(
    settings: &Settings,
    count: usize,
    blocked: BlockedResources,
) -> anyhow::Result<Arc<SurfacePool>> {
    let mut surfaces: Vec<Arc<dyn RenderingSurface>> = vec![];
    for _ in 0..count {
        let surface = WebDriverSurface::connect(
            &settings.application.webdriver_url,
            settings.application.headless,
            settings.batch.nav_timeout(),
            blocked,
        )
        .await
        .context("Failed to connect a WebDriver surface")?;
        surfaces.push(Arc::new(surface));
    }
    Ok(Arc::new(SurfacePool::new(surfaces)))
}

/// The rendering pass. Standard mode walks the saved work list; deep mode
/// re-scans active entries with unknown auth using the longer settle delay
/// and the in-page DOM probe.
pub async fn verify_targets(settings: &Settings, deep: bool) -> anyhow::Result<()> {
    let store_path = Path::new(&settings.store.entries_path);
    let store = Arc::new(EntryStore::load(store_path).await?);

    let work = match deep {
        true => triage::build_deep_recheck_list(&store.snapshot().await),
        false => load_work_list(Path::new(&settings.store.worklist_path)).await?,
    };
    if work.is_empty() {
        println!("Nothing to check.");
        return Ok(());
    }

    let pool = connect_pool(settings, settings.batch.verify_workers, BlockedResources::Full)
        .await?;
    let limits = BatchLimits {
        workers: settings.batch.verify_workers,
        settle: settings.batch.settle(deep),
        hard_limit: settings.batch.verify_hard_limit(),
        checkpoint_every: settings.batch.checkpoint_every,
    };
    let stats = run_batch(
        store.clone(),
        work,
        pool.clone(),
        Stage::Classify { deep },
        Arc::new(settings.product.clone()),
        limits,
    )
    .await;
    pool.dispose_all().await;
    let stats = stats?;

    report::print_batch_stats(&stats);
    report::print_summary(&store.snapshot().await);
    Ok(())
}

/// Visit every open-submission entry and map its form fields.
pub async fn discover_targets(settings: &Settings) -> anyhow::Result<()> {
    let store_path = Path::new(&settings.store.entries_path);
    let store = Arc::new(EntryStore::load(store_path).await?);
    let work = triage::build_discovery_list(&store.snapshot().await);
    if work.is_empty() {
        println!("Nothing to discover.");
        return Ok(());
    }

    let pool = connect_pool(
        settings,
        settings.batch.discover_workers,
        BlockedResources::Full,
    )
    .await?;
    let limits = BatchLimits {
        workers: settings.batch.discover_workers,
        settle: settings.batch.settle(true),
        hard_limit: settings.batch.discover_hard_limit(),
        checkpoint_every: settings.batch.checkpoint_every,
    };
    let stats = run_batch(
        store.clone(),
        work,
        pool.clone(),
        Stage::Discover,
        Arc::new(settings.product.clone()),
        limits,
    )
    .await;
    pool.dispose_all().await;
    let stats = stats?;

    report::print_batch_stats(&stats);
    Ok(())
}

/// Fill and submit every discovered form that has fields worth filling.
/// Images stay unblocked on this pass so upload previews work.
pub async fn submit_targets(settings: &Settings) -> anyhow::Result<()> {
    let store_path = Path::new(&settings.store.entries_path);
    let store = Arc::new(EntryStore::load(store_path).await?);
    let work = triage::build_submission_list(&store.snapshot().await);
    if work.is_empty() {
        println!("Nothing to submit.");
        return Ok(());
    }

    let pool = connect_pool(
        settings,
        settings.batch.submit_workers,
        BlockedResources::MediaAndFonts,
    )
    .await?;
    let limits = BatchLimits {
        workers: settings.batch.submit_workers,
        settle: settings.batch.settle(true),
        hard_limit: settings.batch.submit_hard_limit(),
        checkpoint_every: settings.batch.checkpoint_every,
    };
    let profile: Arc<ProductProfile> = Arc::new(settings.product.clone());
    let stats = run_batch(store.clone(), work, pool.clone(), Stage::Submit, profile, limits).await;
    pool.dispose_all().await;
    let stats = stats?;

    report::print_batch_stats(&stats);
    Ok(())
}

pub async fn report_targets(settings: &Settings) -> anyhow::Result<()> {
    let store_path = Path::new(&settings.store.entries_path);
    let entries = load_entries_or_default(store_path).await?;
    report::print_summary(&entries);
    Ok(())
}
