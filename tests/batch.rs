//! Batch pipeline tests against a scripted in-memory surface: no browser,
//! no network, deterministic pages.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::sync::Mutex;

use herald::dal::entry_store::{load_entries, EntryStore};
use herald::dal::worklist::WorkItem;
use herald::domain::{
    AuthType, PricingType, SiteStatus, SubmissionStatus, TargetEntry,
};
use herald::domain::ProductProfile;
use herald::services::orchestrator::{run_batch, BatchLimits, Stage};
use herald::services::surface::{
    FileInputInfo, RenderingSurface, SurfaceError, SurfacePool,
};

#[derive(Clone, Default)]
struct SitePage {
    html: String,
    title: String,
    nav_error: Option<String>,
    hang: bool,
    elements: Option<Value>,
    probe: Option<Value>,
}

struct FakeSurface {
    sites: Arc<HashMap<String, SitePage>>,
    current: Mutex<Option<(String, SitePage)>>,
}

impl FakeSurface {
    fn new(sites: Arc<HashMap<String, SitePage>>) -> Self {
        FakeSurface {
            sites,
            current: Mutex::new(None),
        }
    }

    async fn page(&self) -> Result<(String, SitePage), SurfaceError> {
        self.current
            .lock()
            .await
            .clone()
            .ok_or_else(|| SurfaceError::Unresponsive("no page loaded".to_string()))
    }
}

#[async_trait]
impl RenderingSurface for FakeSurface {
    async fn navigate(&self, url: &str) -> Result<(), SurfaceError> {
        let page = self
            .sites
            .get(url)
            .cloned()
            .ok_or_else(|| SurfaceError::Navigation(format!("unknown url {}", url)))?;
        if page.hang {
            tokio::time::sleep(Duration::from_secs(60)).await;
        }
        if let Some(message) = &page.nav_error {
            return Err(SurfaceError::Navigation(message.clone()));
        }
        *self.current.lock().await = Some((url.to_string(), page));
        Ok(())
    }

    async fn current_url(&self) -> Result<String, SurfaceError> {
        Ok(self.page().await?.0)
    }

    async fn title(&self) -> Result<String, SurfaceError> {
        Ok(self.page().await?.1.title)
    }

    async fn page_source(&self) -> Result<String, SurfaceError> {
        Ok(self.page().await?.1.html)
    }

    async fn evaluate(&self, script: &str, args: Vec<Value>) -> Result<Value, SurfaceError> {
        let (_, page) = self.page().await?;
        if script.contains("getClientRects") {
            return Ok(page.elements.unwrap_or_else(|| json!([])));
        }
        if script.contains("const plan = arguments[0]") {
            let plan = args.first().and_then(|v| v.as_array()).cloned().unwrap_or_default();
            let filled = plan
                .iter()
                .filter(|item| {
                    item["select"].as_bool().unwrap_or(false)
                        || !item["value"].as_str().unwrap_or("").is_empty()
                })
                .count();
            return Ok(json!({ "filled": filled, "errors": 0, "touched": [] }));
        }
        if script.contains("const verbs") {
            return Ok(json!({ "clicked": true, "button_text": "Submit" }));
        }
        if script.contains("input_count") {
            return Ok(page.probe.unwrap_or_else(|| json!({
                "input_count": 0,
                "form_count": 0,
                "signup_buttons": [],
                "oauth_buttons": [],
            })));
        }
        Err(SurfaceError::Evaluation("unrecognized script".to_string()))
    }

    async fn file_inputs(&self) -> Result<Vec<FileInputInfo>, SurfaceError> {
        Ok(vec![])
    }

    async fn upload_file(&self, _ordinal: usize, _path: &Path) -> Result<(), SurfaceError> {
        Ok(())
    }

    async fn reset(&self) -> Result<(), SurfaceError> {
        *self.current.lock().await = None;
        Ok(())
    }

    async fn dispose(&self) -> Result<(), SurfaceError> {
        Ok(())
    }
}

fn entry(name: &str, url: &str) -> TargetEntry {
    TargetEntry::new(
        name.to_string(),
        name.to_lowercase(),
        url.to_string(),
        PricingType::Free,
    )
}

fn work(entries: &[TargetEntry]) -> Vec<WorkItem> {
    entries
        .iter()
        .map(|e| WorkItem {
            index: e.index,
            name: e.name.clone(),
            url: e.url.clone(),
            error: String::new(),
        })
        .collect()
}

fn pool_of(sites: &Arc<HashMap<String, SitePage>>, count: usize) -> Arc<SurfacePool> {
    let surfaces: Vec<Arc<dyn RenderingSurface>> = (0..count)
        .map(|_| Arc::new(FakeSurface::new(sites.clone())) as Arc<dyn RenderingSurface>)
        .collect();
    Arc::new(SurfacePool::new(surfaces))
}

fn profile() -> Arc<ProductProfile> {
    Arc::new(ProductProfile {
        url: "https://acme.example".to_string(),
        app_url: "https://app.acme.example".to_string(),
        github: "https://github.com/acme/acme".to_string(),
        twitter: "https://twitter.com/acme".to_string(),
        name: "Acme".to_string(),
        tagline: "Ship faster".to_string(),
        email: "founders@acme.example".to_string(),
        author_name: "Jordan Doe".to_string(),
        author_first: "Jordan".to_string(),
        author_last: "Doe".to_string(),
        username: "acmehq".to_string(),
        password: "hunter2hunter2".to_string(),
        category_keywords: vec!["ai".to_string()],
        logo_path: "assets/logo.png".to_string(),
        screenshot_path: "assets/screenshot.png".to_string(),
    })
}

fn limits(workers: usize, hard_limit: Duration, checkpoint_every: usize) -> BatchLimits {
    BatchLimits {
        workers,
        settle: Duration::from_millis(1),
        hard_limit,
        checkpoint_every,
    }
}

#[tokio::test]
async fn classification_batch_isolates_failures_and_checkpoints() {
    let mut sites = HashMap::new();
    sites.insert(
        "https://acme.example/submit".to_string(),
        SitePage {
            html: r#"<p>please log in</p><input type="password" name="pw">"#.to_string(),
            title: "Acme Submit".to_string(),
            ..Default::default()
        },
    );
    sites.insert(
        "https://gone.example/".to_string(),
        SitePage {
            nav_error: Some(
                "dns error: failed to lookup address information: Name or service not known"
                    .to_string(),
            ),
            ..Default::default()
        },
    );
    sites.insert(
        "https://oauth.example/".to_string(),
        SitePage {
            html: r##"<a href="#">Continue with Google</a>"##.to_string(),
            title: "Directory".to_string(),
            ..Default::default()
        },
    );
    let sites = Arc::new(sites);

    let entries = vec![
        entry("Acme", "https://acme.example/submit"),
        entry("Gone", "https://gone.example/"),
        entry("OAuth", "https://oauth.example/"),
    ];
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("directories.json");
    let store = Arc::new(EntryStore::from_entries(&path, entries));
    let items = work(&store.snapshot().await);

    let stats = run_batch(
        store.clone(),
        items,
        pool_of(&sites, 2),
        Stage::Classify { deep: false },
        profile(),
        limits(2, Duration::from_secs(5), 3),
    )
    .await
    .unwrap();

    assert_eq!(stats.ok, 2);
    assert_eq!(stats.errored, 1);
    assert_eq!(stats.timed_out, 0);

    let snapshot = store.snapshot().await;
    assert_eq!(snapshot[0].auth_type, Some(AuthType::EmailPassword));
    assert_eq!(snapshot[0].requires_login, Some(true));
    assert_eq!(snapshot[0].site_status, Some(SiteStatus::Active));

    // One dead target neither crashes the batch nor touches its neighbors.
    assert_eq!(snapshot[1].site_status, Some(SiteStatus::Error));
    assert!(snapshot[1].analysis_error.is_some());
    assert_eq!(snapshot[2].auth_type, Some(AuthType::GoogleOnly));

    // The persisted store round-trips to the in-memory state.
    let reloaded = load_entries(&path).await.unwrap();
    assert_eq!(reloaded, snapshot);
}

#[tokio::test]
async fn hard_deadline_abandons_hanging_targets() {
    let mut sites = HashMap::new();
    sites.insert(
        "https://slow.example/".to_string(),
        SitePage {
            hang: true,
            ..Default::default()
        },
    );
    let sites = Arc::new(sites);

    let entries = vec![entry("Slow", "https://slow.example/")];
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("directories.json");
    let store = Arc::new(EntryStore::from_entries(&path, entries));
    let items = work(&store.snapshot().await);

    let started = std::time::Instant::now();
    let stats = run_batch(
        store.clone(),
        items,
        pool_of(&sites, 1),
        Stage::Classify { deep: false },
        profile(),
        limits(1, Duration::from_millis(200), 50),
    )
    .await
    .unwrap();

    assert!(started.elapsed() < Duration::from_secs(10));
    assert_eq!(stats.timed_out, 1);
    assert_eq!(
        store.snapshot().await[0].site_status,
        Some(SiteStatus::Timeout)
    );
}

#[tokio::test]
async fn deep_recheck_uses_the_dom_probe() {
    let mut sites = HashMap::new();
    sites.insert(
        "https://spa.example/".to_string(),
        SitePage {
            html: "<div id=\"root\"></div>".to_string(),
            title: "Directory".to_string(),
            probe: Some(json!({
                "input_count": 4,
                "form_count": 1,
                "signup_buttons": [],
                "oauth_buttons": [],
            })),
            ..Default::default()
        },
    );
    let sites = Arc::new(sites);

    let entries = vec![entry("Spa", "https://spa.example/")];
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("directories.json");
    let store = Arc::new(EntryStore::from_entries(&path, entries));
    let items = work(&store.snapshot().await);

    run_batch(
        store.clone(),
        items,
        pool_of(&sites, 1),
        Stage::Classify { deep: true },
        profile(),
        limits(1, Duration::from_secs(5), 50),
    )
    .await
    .unwrap();

    assert_eq!(store.snapshot().await[0].auth_type, Some(AuthType::None));
}

#[tokio::test]
async fn discovery_then_submission_walks_the_plan() {
    let elements = json!([
        {
            "ordinal": 0, "tag": "input", "type": "email", "name": "email",
            "id": "", "placeholder": "you@example.com", "aria_label": "",
            "label_text": "", "required": true, "laid_out": true,
            "form_ordinal": 0,
            "form": { "action": "/submit", "method": "post", "id": "f", "class": "" }
        },
        {
            "ordinal": 1, "tag": "textarea", "type": "textarea", "name": "description",
            "id": "", "placeholder": "", "aria_label": "", "label_text": "",
            "required": false, "laid_out": true, "form_ordinal": 0,
            "form": { "action": "/submit", "method": "post", "id": "f", "class": "" }
        },
        {
            "ordinal": 2, "tag": "input", "type": "hidden", "name": "csrf",
            "id": "", "placeholder": "", "aria_label": "", "label_text": "",
            "required": false, "laid_out": true, "form_ordinal": 0,
            "form": { "action": "/submit", "method": "post", "id": "f", "class": "" }
        },
        {
            "ordinal": 3, "tag": "input", "type": "text", "name": "invisible",
            "id": "", "placeholder": "", "aria_label": "", "label_text": "",
            "required": false, "laid_out": false, "form_ordinal": 0,
            "form": { "action": "/submit", "method": "post", "id": "f", "class": "" }
        }
    ]);
    let mut sites = HashMap::new();
    sites.insert(
        "https://open.example/submit".to_string(),
        SitePage {
            html: "<form></form>".to_string(),
            title: "Submit".to_string(),
            elements: Some(elements),
            ..Default::default()
        },
    );
    let sites = Arc::new(sites);

    let mut seed = entry("Open", "https://open.example/submit");
    seed.site_status = Some(SiteStatus::Active);
    seed.auth_type = Some(AuthType::None);
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("directories.json");
    let store = Arc::new(EntryStore::from_entries(&path, vec![seed]));
    let items = work(&store.snapshot().await);

    run_batch(
        store.clone(),
        items.clone(),
        pool_of(&sites, 1),
        Stage::Discover,
        profile(),
        limits(1, Duration::from_secs(5), 50),
    )
    .await
    .unwrap();

    {
        let snapshot = store.snapshot().await;
        assert_eq!(
            snapshot[0].submission_status,
            Some(SubmissionStatus::Discovered)
        );
        let fields = &snapshot[0].forms[0].fields;
        // Hidden and non-laid-out elements never reach the plan.
        assert_eq!(fields.len(), 2);
        assert_eq!(fields[0].name, "email");
        assert_eq!(fields[0].label, "you@example.com");
    }

    run_batch(
        store.clone(),
        items,
        pool_of(&sites, 1),
        Stage::Submit,
        profile(),
        limits(1, Duration::from_secs(5), 50),
    )
    .await
    .unwrap();

    let snapshot = store.snapshot().await;
    assert_eq!(
        snapshot[0].submission_status,
        Some(SubmissionStatus::Submitted)
    );
    let report = snapshot[0].submit_result.as_ref().unwrap();
    assert_eq!(report.filled, 2);
    assert!(report.submitted);
}
