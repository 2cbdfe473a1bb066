//! The rendering capability boundary. Core logic talks to a page only
//! through [`RenderingSurface`], so batches can run against a fake surface
//! in tests and against WebDriver sessions in production.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use thirtyfour::error::WebDriverError;
use thirtyfour::extensions::cdp::ChromeDevTools;
use thirtyfour::{By, ChromiumLikeCapabilities, DesiredCapabilities, WebDriver};
use tokio::sync::Mutex;

use crate::services::fetcher::DESKTOP_USER_AGENT;

#[derive(Debug, thiserror::Error)]
pub enum SurfaceError {
    #[error("navigation failed: {0}")]
    Navigation(String),
    #[error("evaluation failed: {0}")]
    Evaluation(String),
    #[error("surface unresponsive: {0}")]
    Unresponsive(String),
}

impl From<WebDriverError> for SurfaceError {
    fn from(err: WebDriverError) -> Self {
        SurfaceError::Evaluation(err.to_string())
    }
}

/// A file-upload control found on the page, addressed by its position among
/// the page's file inputs.
#[derive(Debug, Clone, PartialEq)]
pub struct FileInputInfo {
    pub ordinal: usize,
    pub name: String,
    pub id: String,
}

/// One tab/page worth of rendering capability: navigate, read back the
/// rendered document, evaluate a script with arguments, and assign files to
/// upload controls.
#[async_trait]
pub trait RenderingSurface: Send + Sync {
    async fn navigate(&self, url: &str) -> Result<(), SurfaceError>;
    async fn current_url(&self) -> Result<String, SurfaceError>;
    async fn title(&self) -> Result<String, SurfaceError>;
    async fn page_source(&self) -> Result<String, SurfaceError>;
    async fn evaluate(&self, script: &str, args: Vec<Value>) -> Result<Value, SurfaceError>;
    async fn file_inputs(&self) -> Result<Vec<FileInputInfo>, SurfaceError>;
    async fn upload_file(&self, ordinal: usize, path: &Path) -> Result<(), SurfaceError>;
    /// Return the surface to a neutral state between targets.
    async fn reset(&self) -> Result<(), SurfaceError>;
    /// Tear the surface down for good at the end of a batch.
    async fn dispose(&self) -> Result<(), SurfaceError>;
}

/// Which resource types a surface refuses to load. Blocking is configured
/// once at surface creation, not per navigation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockedResources {
    /// Images, media, fonts and stylesheets; the classification passes.
    Full,
    /// Media and fonts only; the submission pass needs images for uploads.
    MediaAndFonts,
}

impl BlockedResources {
    fn url_patterns(&self) -> Vec<&'static str> {
        let media_and_fonts = [
            "*.mp4", "*.webm", "*.mp3", "*.ogg", "*.avi", "*.woff", "*.woff2", "*.ttf", "*.otf",
            "*.eot",
        ];
        let images_and_styles = [
            "*.png", "*.jpg", "*.jpeg", "*.gif", "*.webp", "*.svg", "*.ico", "*.css",
        ];
        match self {
            BlockedResources::MediaAndFonts => media_and_fonts.to_vec(),
            BlockedResources::Full => {
                let mut patterns = media_and_fonts.to_vec();
                patterns.extend(images_and_styles);
                patterns
            }
        }
    }
}

/// A WebDriver-backed surface, one browser session per pool slot.
pub struct WebDriverSurface {
    driver: WebDriver,
}

impl WebDriverSurface {
    pub async fn connect(
        webdriver_url: &str,
        headless: bool,
        nav_timeout: Duration,
        blocked: BlockedResources,
    ) -> anyhow::Result<Self> {
        let mut caps = DesiredCapabilities::chrome();
        caps.add_arg(&format!("--user-agent={}", DESKTOP_USER_AGENT))?;
        caps.add_arg("--lang=en-US")?;
        caps.add_arg("--window-size=1280,720")?;
        if headless {
            caps.add_arg("--headless=new")?;
        }

        let driver = WebDriver::new(webdriver_url, caps).await?;
        driver.set_page_load_timeout(nav_timeout).await?;

        let dev_tools = ChromeDevTools::new(driver.handle.clone());
        dev_tools.execute_cdp("Network.enable").await?;
        dev_tools
            .execute_cdp_with_params(
                "Network.setBlockedURLs",
                json!({ "urls": blocked.url_patterns() }),
            )
            .await?;

        Ok(WebDriverSurface { driver })
    }
}

#[async_trait]
impl RenderingSurface for WebDriverSurface {
    async fn navigate(&self, url: &str) -> Result<(), SurfaceError> {
        self.driver
            .goto(url)
            .await
            .map_err(|e| SurfaceError::Navigation(e.to_string()))
    }

    async fn current_url(&self) -> Result<String, SurfaceError> {
        Ok(self.driver.current_url().await?.to_string())
    }

    async fn title(&self) -> Result<String, SurfaceError> {
        Ok(self.driver.title().await?)
    }

    async fn page_source(&self) -> Result<String, SurfaceError> {
        Ok(self.driver.source().await?)
    }

    async fn evaluate(&self, script: &str, args: Vec<Value>) -> Result<Value, SurfaceError> {
        let ret = self.driver.execute(script, args).await?;
        Ok(ret.json().clone())
    }

    async fn file_inputs(&self) -> Result<Vec<FileInputInfo>, SurfaceError> {
        let elements = self.driver.find_all(By::Css("input[type='file']")).await?;
        let mut inputs = vec![];
        for (ordinal, element) in elements.iter().enumerate() {
            let name = element.attr("name").await?.unwrap_or_default();
            let id = element.attr("id").await?.unwrap_or_default();
            inputs.push(FileInputInfo { ordinal, name, id });
        }
        Ok(inputs)
    }

    async fn upload_file(&self, ordinal: usize, path: &Path) -> Result<(), SurfaceError> {
        let elements = self.driver.find_all(By::Css("input[type='file']")).await?;
        let element = elements.get(ordinal).ok_or_else(|| {
            SurfaceError::Evaluation(format!("file input {} disappeared", ordinal))
        })?;
        element.send_keys(path.to_string_lossy().as_ref()).await?;
        Ok(())
    }

    async fn reset(&self) -> Result<(), SurfaceError> {
        self.driver
            .goto("about:blank")
            .await
            .map_err(|e| SurfaceError::Unresponsive(e.to_string()))
    }

    async fn dispose(&self) -> Result<(), SurfaceError> {
        self.driver.clone().quit().await?;
        Ok(())
    }
}

/// Fixed-size pool of surfaces. The orchestrator's semaphore guarantees a
/// slot is free before `acquire` runs, so the pop never underflows.
pub struct SurfacePool {
    slots: Mutex<Vec<Arc<dyn RenderingSurface>>>,
}

impl SurfacePool {
    pub fn new(surfaces: Vec<Arc<dyn RenderingSurface>>) -> Self {
        SurfacePool {
            slots: Mutex::new(surfaces),
        }
    }

    pub async fn acquire(&self) -> Arc<dyn RenderingSurface> {
        self.slots
            .lock()
            .await
            .pop()
            .expect("surface pool underflow; semaphore out of sync")
    }

    pub async fn release(&self, surface: Arc<dyn RenderingSurface>) {
        self.slots.lock().await.push(surface);
    }

    pub async fn dispose_all(&self) {
        let surfaces: Vec<_> = self.slots.lock().await.drain(..).collect();
        for surface in surfaces {
            if let Err(e) = surface.dispose().await {
                log::warn!("Failed to dispose surface: {}", e);
            }
        }
    }
}
