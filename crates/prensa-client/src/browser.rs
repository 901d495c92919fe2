use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use prensa_core::error::AppError;

/// Cookie-consent accept button on supported sites.
const CONSENT_SELECTOR: &str = r#"a.mrf-button[data-mrf-role="userAgreeToAll"]"#;

/// Timeouts for one article session. Every wait is bounded; there are
/// no fixed sleeps anywhere in the session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub nav_timeout: Duration,
    pub consent_timeout: Duration,
    pub settle_timeout: Duration,
    pub poll_interval: Duration,
    pub scroll_passes: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            nav_timeout: Duration::from_secs(30),
            consent_timeout: Duration::from_secs(3),
            settle_timeout: Duration::from_secs(2),
            poll_interval: Duration::from_millis(100),
            scroll_passes: 3,
        }
    }
}

/// Poll `probe` until it yields `Some`, up to `timeout`. On deadline,
/// returns a `WaitTimeout` carrying the condition name and the time
/// actually waited, so logs say what was being waited on.
pub async fn wait_for<F, Fut, T>(
    condition: &str,
    timeout: Duration,
    interval: Duration,
    mut probe: F,
) -> Result<T, AppError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Option<T>>,
{
    let started = Instant::now();
    loop {
        if let Some(value) = probe().await {
            return Ok(value);
        }
        if started.elapsed() >= timeout {
            return Err(AppError::WaitTimeout {
                condition: condition.to_string(),
                waited_ms: started.elapsed().as_millis() as u64,
            });
        }
        tokio::time::sleep(interval).await;
    }
}

/// A shared headless Chromium process. One engine per run; each
/// article gets its own page, opened and closed by
/// [`BrowserEngine::render_article`].
#[derive(Clone)]
pub struct BrowserEngine {
    browser: Arc<Browser>,
    config: SessionConfig,
}

impl BrowserEngine {
    /// Launches headless Chromium with the default session timeouts.
    ///
    /// Requires a Chromium / Chrome binary reachable via `$PATH` (or
    /// the well-known locations checked by `find_chrome_binary`).
    pub async fn launch() -> Result<Self, AppError> {
        Self::launch_with(SessionConfig::default()).await
    }

    pub async fn launch_with(config: SessionConfig) -> Result<Self, AppError> {
        let mut builder = BrowserConfig::builder();
        builder = builder.no_sandbox().disable_default_args();

        // Snap-packaged Chromium exposes a wrapper that rejects
        // standard Chrome CLI flags, so prefer the real binary when
        // we can find one.
        if let Some(bin) = find_chrome_binary() {
            tracing::info!("Using Chrome binary: {}", bin.display());
            builder = builder.chrome_executable(bin);
        }

        let browser_config = builder
            .arg("--headless=new")
            .arg("--disable-gpu")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-extensions")
            .arg("--disable-popup-blocking")
            .arg("--disable-translate")
            .arg("--no-first-run")
            .build()
            .map_err(|e| AppError::Browser(format!("browser config error: {e}")))?;

        let (browser, mut handler) = Browser::launch(browser_config)
            .await
            .map_err(|e| AppError::Browser(format!("failed to launch browser: {e}")))?;

        // The CDP handler must be polled continuously for the
        // connection to work.
        tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    tracing::warn!("Browser CDP handler error: {event:?}");
                    break;
                }
            }
        });

        Ok(Self {
            browser: Arc::new(browser),
            config,
        })
    }

    /// Open a page for `url`, accept the consent dialog if present,
    /// let lazy content settle, and return the rendered HTML.
    ///
    /// The page is closed on every exit path, including navigation
    /// failure.
    pub async fn render_article(&self, url: &str) -> Result<String, AppError> {
        let page = self
            .browser
            .new_page("about:blank")
            .await
            .map_err(|e| AppError::Browser(format!("failed to open page: {e}")))?;

        let result = self.drive(&page, url).await;
        if let Err(e) = page.close().await {
            tracing::warn!(%url, error = %e, "Failed to close page");
        }
        result
    }

    async fn drive(&self, page: &Page, url: &str) -> Result<String, AppError> {
        tokio::time::timeout(self.config.nav_timeout, async {
            page.goto(url)
                .await
                .map_err(|e| AppError::Navigation(format!("{url}: {e}")))?;
            page.wait_for_navigation()
                .await
                .map_err(|e| AppError::Navigation(format!("{url}: {e}")))?;
            Ok::<(), AppError>(())
        })
        .await
        .map_err(|_| AppError::Navigation(format!("{url}: navigation timed out")))??;

        self.accept_consent(page, url).await;
        self.settle(page, url).await;

        page.content()
            .await
            .map_err(|e| AppError::Browser(format!("failed to read page content: {e}")))
    }

    /// Click the consent button if it shows up. Absence is the normal
    /// case on revisits, so the timeout is short and non-fatal.
    async fn accept_consent(&self, page: &Page, url: &str) {
        let found = wait_for(
            "consent button",
            self.config.consent_timeout,
            self.config.poll_interval,
            || async { page.find_element(CONSENT_SELECTOR).await.ok() },
        )
        .await;

        match found {
            Ok(button) => {
                if let Err(e) = button.click().await {
                    tracing::warn!(%url, error = %e, "Consent button found but click failed");
                } else {
                    tracing::debug!(%url, "Consent accepted");
                }
            }
            Err(_) => {
                tracing::debug!(%url, "No consent dialog");
            }
        }
    }

    /// Scroll to the bottom repeatedly so lazy-loaded comments render.
    async fn settle(&self, page: &Page, url: &str) {
        run_scroll_passes(
            self.config.scroll_passes,
            self.config.settle_timeout,
            self.config.poll_interval,
            url,
            || self.document_height(page),
            || async {
                page.evaluate("window.scrollTo(0, document.body.scrollHeight)")
                    .await
                    .map(|_| ())
                    .map_err(|e| AppError::Browser(e.to_string()))
            },
        )
        .await;
    }

    async fn document_height(&self, page: &Page) -> Result<i64, AppError> {
        page.evaluate("document.body.scrollHeight")
            .await
            .map_err(|e| AppError::Browser(e.to_string()))?
            .into_value::<i64>()
            .map_err(|e| AppError::Browser(format!("height evaluation: {e}")))
    }
}

/// Run the configured number of scroll passes. Each pass scrolls to
/// the bottom and waits (bounded) for the document to grow; a pass
/// whose wait times out is tolerated and the remaining passes still
/// run, since content loading slower than one settle window would
/// otherwise never be reached. Only a page-level failure (unreadable
/// height, failed scroll) ends the loop early.
async fn run_scroll_passes<H, HF, S, SF>(
    passes: u32,
    settle_timeout: Duration,
    poll_interval: Duration,
    url: &str,
    height: H,
    scroll: S,
) where
    H: Fn() -> HF,
    HF: Future<Output = Result<i64, AppError>>,
    S: Fn() -> SF,
    SF: Future<Output = Result<(), AppError>>,
{
    for pass in 1..=passes {
        let before = match height().await {
            Ok(h) => h,
            Err(e) => {
                tracing::warn!(%url, pass, error = %e, "Could not read document height");
                return;
            }
        };

        if let Err(e) = scroll().await {
            tracing::warn!(%url, pass, error = %e, "Scroll failed");
            return;
        }

        let height = &height;
        let grew = wait_for(
            "document height growth",
            settle_timeout,
            poll_interval,
            || async move {
                match height().await {
                    Ok(h) if h > before => Some(h),
                    _ => None,
                }
            },
        )
        .await;

        if grew.is_err() {
            tracing::debug!(%url, pass, "No height growth this pass");
        }
    }
}

/// Tries to locate the real Chrome/Chromium binary.
///
/// On systems where Chromium is installed via snap, the wrapper at
/// `/snap/bin/chromium` strips unknown CLI flags, breaking headless
/// mode. Look for the real binary inside the snap first, then fall
/// back to well-known system paths. `CHROME_BIN` overrides everything.
fn find_chrome_binary() -> Option<PathBuf> {
    if let Ok(p) = std::env::var("CHROME_BIN") {
        let path = PathBuf::from(&p);
        if path.exists() {
            return Some(path);
        }
    }

    let candidates: &[&str] = &[
        "/snap/chromium/current/usr/lib/chromium-browser/chrome",
        "/var/lib/flatpak/exports/bin/org.chromium.Chromium",
        "/usr/bin/google-chrome-stable",
        "/usr/bin/google-chrome",
        "/usr/bin/chromium",
        "/usr/bin/chromium-browser",
    ];

    candidates.iter().map(PathBuf::from).find(|p| p.exists())
}
