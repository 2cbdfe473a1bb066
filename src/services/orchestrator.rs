//! Batch runner for the rendering passes: a bounded pool of workers, a hard
//! wall-clock deadline around every target, per-index result writes and
//! periodic checkpointing. One target's failure never reaches another.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{Mutex, Semaphore};

use crate::dal::entry_store::EntryStore;
use crate::dal::worklist::WorkItem;
use crate::domain::{
    AuthType, Classification, CopyVariant, FormDescriptor, ProductProfile, SiteStatus,
    SubmissionStatus, SubmitReport, TargetEntry,
};
use crate::services::classifier::{self, DomProbe, DOM_PROBE_SCRIPT};
use crate::services::form_discovery;
use crate::services::submitter;
use crate::services::surface::{RenderingSurface, SurfaceError, SurfacePool};

/// Which stage of the pipeline a batch runs for each target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Classify { deep: bool },
    Discover,
    Submit,
}

#[derive(Debug, Clone, Copy)]
pub struct BatchLimits {
    pub workers: usize,
    pub settle: Duration,
    pub hard_limit: Duration,
    pub checkpoint_every: usize,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchStats {
    pub ok: usize,
    pub timed_out: usize,
    pub errored: usize,
}

/// What a successfully finished stage wants written into the entry.
#[derive(Debug, Clone)]
enum StageUpdate {
    Classified(Classification),
    Discovered {
        form_path: String,
        forms: Vec<FormDescriptor>,
    },
    Submitted {
        status: SubmissionStatus,
        report: SubmitReport,
    },
}

enum TaskVerdict {
    Ok(StageUpdate),
    TimedOut,
    Errored(String),
}

/// Run one stage across a work list. Every target gets its own task, its
/// own surface for the duration, and its own slice of the result store.
pub async fn run_batch(
    store: Arc<EntryStore>,
    work: Vec<WorkItem>,
    pool: Arc<SurfacePool>,
    stage: Stage,
    profile: Arc<ProductProfile>,
    limits: BatchLimits,
) -> anyhow::Result<BatchStats> {
    let total = work.len();
    let semaphore = Arc::new(Semaphore::new(limits.workers));
    let stats = Arc::new(Mutex::new(BatchStats::default()));
    let processed = Arc::new(AtomicUsize::new(0));

    log::info!(
        "Processing {} targets with {} workers (hard limit {}s)",
        total,
        limits.workers,
        limits.hard_limit.as_secs()
    );

    let mut handles = vec![];
    for (seq, item) in work.into_iter().enumerate() {
        let semaphore = semaphore.clone();
        let store = store.clone();
        let pool = pool.clone();
        let profile = profile.clone();
        let stats = stats.clone();
        let processed = processed.clone();

        handles.push(tokio::spawn(async move {
            let _permit = match semaphore.acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => return,
            };

            let copy = store
                .with_entry(item.index, |entry| entry.copy.clone())
                .await
                .flatten();

            let surface = pool.acquire().await;
            let started = Instant::now();
            let verdict = match tokio::time::timeout(
                limits.hard_limit,
                process_target(
                    surface.as_ref(),
                    &item,
                    stage,
                    &profile,
                    copy.as_ref(),
                    limits.settle,
                ),
            )
            .await
            {
                Ok(Ok(update)) => TaskVerdict::Ok(update),
                Ok(Err(e)) => TaskVerdict::Errored(e.to_string()),
                Err(_) => TaskVerdict::TimedOut,
            };
            let elapsed = started.elapsed();

            // The surface goes back to the pool on every exit path; a reset
            // that fails after a timeout usually means the session is wedged
            // mid-navigation, which the next blank navigation clears.
            if let Err(e) = surface.reset().await {
                log::warn!("Surface reset failed after {}: {}", item.name, e);
            }
            pool.release(surface).await;

            log_verdict(&item, seq + 1, total, elapsed, &verdict);
            {
                let mut stats = stats.lock().await;
                match &verdict {
                    TaskVerdict::Ok(_) => stats.ok += 1,
                    TaskVerdict::TimedOut => stats.timed_out += 1,
                    TaskVerdict::Errored(_) => stats.errored += 1,
                }
            }
            store
                .with_entry(item.index, |entry| record_verdict(entry, stage, verdict))
                .await;

            let done = processed.fetch_add(1, Ordering::SeqCst) + 1;
            if limits.checkpoint_every > 0 && done % limits.checkpoint_every == 0 {
                match store.checkpoint().await {
                    Ok(()) => log::info!("  [autosave] {}/{} processed", done, total),
                    Err(e) => log::error!("Checkpoint failed: {:?}", e),
                }
            }
        }));
    }

    for handle in handles {
        if let Err(e) = handle.await {
            log::error!("Batch task panicked: {:?}", e);
        }
    }

    store.checkpoint().await?;
    let stats = stats.lock().await.clone();
    Ok(stats)
}

async fn process_target(
    surface: &dyn RenderingSurface,
    item: &WorkItem,
    stage: Stage,
    profile: &ProductProfile,
    copy: Option<&CopyVariant>,
    settle: Duration,
) -> Result<StageUpdate, SurfaceError> {
    surface.navigate(&item.url).await?;
    // Fixed settle delay so client-side rendering catches up before any
    // read; the hard deadline still bounds the whole visit.
    tokio::time::sleep(settle).await;

    match stage {
        Stage::Classify { deep } => {
            let markup = surface.page_source().await?;
            let title = surface.title().await?;
            let final_url = surface.current_url().await?;
            let mut result = classifier::classify(&markup, &title, &item.url, &final_url);

            if deep
                && result.auth_type == AuthType::Unknown
                && result.site_status == SiteStatus::Active
            {
                let raw = surface.evaluate(DOM_PROBE_SCRIPT, vec![]).await?;
                match serde_json::from_value::<DomProbe>(raw) {
                    Ok(probe) => classifier::apply_dom_probe(&mut result, &probe),
                    Err(e) => log::warn!("Bad probe payload from {}: {}", item.name, e),
                }
            }
            Ok(StageUpdate::Classified(result))
        }
        Stage::Discover => {
            let forms = form_discovery::discover(surface).await?;
            let form_path = surface.current_url().await?;
            Ok(StageUpdate::Discovered { form_path, forms })
        }
        Stage::Submit => {
            let forms = form_discovery::discover(surface).await?;
            let (status, report) = submitter::apply(surface, &forms, profile, copy).await?;
            Ok(StageUpdate::Submitted { status, report })
        }
    }
}

/// Fold a task's terminal state into its entry. Timeouts and errors land on
/// the field set owned by the stage that was running.
fn record_verdict(entry: &mut TargetEntry, stage: Stage, verdict: TaskVerdict) {
    match verdict {
        TaskVerdict::Ok(StageUpdate::Classified(result)) => entry.record_classification(result),
        TaskVerdict::Ok(StageUpdate::Discovered { form_path, forms }) => {
            entry.form_path = Some(form_path);
            entry.submission_status = Some(match forms.is_empty() {
                true => SubmissionStatus::NoFormFound,
                false => SubmissionStatus::Discovered,
            });
            entry.forms = forms;
        }
        TaskVerdict::Ok(StageUpdate::Submitted { status, report }) => {
            entry.submission_status = Some(status);
            entry.submit_result = Some(report);
        }
        TaskVerdict::TimedOut => match stage {
            Stage::Classify { .. } => entry.site_status = Some(SiteStatus::Timeout),
            Stage::Discover => entry.submission_status = Some(SubmissionStatus::Timeout),
            Stage::Submit => entry.submission_status = Some(SubmissionStatus::SubmitTimeout),
        },
        TaskVerdict::Errored(message) => match stage {
            Stage::Classify { .. } => entry.record_failure(SiteStatus::Error, &message),
            Stage::Discover => {
                entry.submission_status = Some(SubmissionStatus::Error);
                entry.analysis_error = Some(crate::domain::truncate_error(&message));
            }
            Stage::Submit => {
                entry.submission_status = Some(SubmissionStatus::SubmitError);
                entry.submit_result = Some(SubmitReport::from_error(
                    crate::domain::truncate_error(&message),
                ));
            }
        },
    }
}

fn log_verdict(item: &WorkItem, seq: usize, total: usize, elapsed: Duration, verdict: &TaskVerdict) {
    let tag = format!("[{}/{}]", seq, total);
    match verdict {
        TaskVerdict::Ok(StageUpdate::Classified(result)) => log::info!(
            "{} {:35} {:4.1}s  auth={}  cap={:?}  st={:?}",
            tag,
            item.name,
            elapsed.as_secs_f32(),
            result.auth_type,
            result.captcha_type,
            result.site_status
        ),
        TaskVerdict::Ok(StageUpdate::Discovered { forms, .. }) => log::info!(
            "{} {:35} {:4.1}s  forms={}  fields={}",
            tag,
            item.name,
            elapsed.as_secs_f32(),
            forms.len(),
            forms.iter().map(|f| f.fields.len()).sum::<usize>()
        ),
        TaskVerdict::Ok(StageUpdate::Submitted { status, report }) => log::info!(
            "{} {:35} {:4.1}s  filled={}  status={:?}  btn=\"{}\"",
            tag,
            item.name,
            elapsed.as_secs_f32(),
            report.filled,
            status,
            report.submit_button_text
        ),
        TaskVerdict::TimedOut => log::warn!(
            "{} {:35} {:4.1}s  TIMEOUT - skipped",
            tag,
            item.name,
            elapsed.as_secs_f32()
        ),
        TaskVerdict::Errored(message) => {
            let mut short = message.clone();
            short.truncate(60);
            log::warn!("{} {:35}  ERR: {}", tag, item.name, short)
        }
    }
}
