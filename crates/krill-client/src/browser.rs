//! Headless-Chrome browser provider using the Chrome DevTools Protocol.
//!
//! One Chromium process per session, with a throwaway user-data dir, so a
//! wedged renderer from one scrape attempt can never contaminate the next.
//! Career sites routinely fingerprint headless browsers, hence the
//! anti-automation launch flags and the desktop user agent.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use chromiumoxide::{Browser, BrowserConfig};
use futures::StreamExt;
use futures::future::BoxFuture;
use krill_core::error::AppError;
use krill_core::traits::{BrowserProvider, BrowserSession, PageSource};
use tempfile::TempDir;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

const DEFAULT_PAGE_TIMEOUT_SECS: u64 = 30;

/// Prefix for throwaway Chrome profile directories. Doubles as the handle
/// for finding orphaned Chrome processes left behind by a crashed run.
const PROFILE_PREFIX: &str = "krill-profile-";

const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Browser launch settings, env-driven.
#[derive(Debug, Clone)]
pub struct BrowserSettings {
    pub headless: bool,
    /// Per-page navigation/render timeout.
    pub page_timeout: Duration,
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            headless: true,
            page_timeout: Duration::from_secs(DEFAULT_PAGE_TIMEOUT_SECS),
        }
    }
}

impl BrowserSettings {
    /// Read `HEADLESS_MODE` and `SCRAPER_TIMEOUT` (seconds) from the
    /// environment, defaulting on absence or garbage.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let headless = env::var("HEADLESS_MODE")
            .ok()
            .and_then(|v| v.parse::<bool>().ok())
            .unwrap_or(defaults.headless);
        let page_timeout = env::var("SCRAPER_TIMEOUT")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .filter(|n| *n > 0)
            .map(Duration::from_secs)
            .unwrap_or(defaults.page_timeout);
        Self {
            headless,
            page_timeout,
        }
    }
}

/// Launches one isolated Chrome process per acquired session.
#[derive(Debug, Clone)]
pub struct ChromeBrowser {
    settings: BrowserSettings,
}

impl ChromeBrowser {
    pub fn new(settings: BrowserSettings) -> Self {
        Self { settings }
    }

    /// Tries to locate the real Chrome/Chromium binary.
    ///
    /// On systems where Chromium is installed via **snap**, the wrapper at
    /// `/snap/bin/chromium` strips unknown CLI flags, breaking headless
    /// mode. We look for the real binary inside the snap first, then fall
    /// back to well-known system paths. If nothing is found we return
    /// `None` and let `chromiumoxide` do its own lookup.
    fn find_chrome_binary() -> Option<PathBuf> {
        // Explicit override wins.
        if let Ok(p) = env::var("CHROME_BIN") {
            let path = PathBuf::from(&p);
            if path.exists() {
                return Some(path);
            }
        }

        let candidates: &[&str] = &[
            // Snap (Ubuntu default)
            "/snap/chromium/current/usr/lib/chromium-browser/chrome",
            // Flatpak
            "/var/lib/flatpak/exports/bin/org.chromium.Chromium",
            // Common apt / manual installs
            "/usr/bin/google-chrome-stable",
            "/usr/bin/google-chrome",
            "/usr/bin/chromium",
            "/usr/bin/chromium-browser",
        ];
        candidates.iter().map(PathBuf::from).find(|p| p.exists())
    }

    /// Best-effort kill of Chrome processes still holding a krill profile
    /// dir — leftovers from a previous crash. Failure is logged, never
    /// propagated.
    async fn reap_orphans() {
        match tokio::process::Command::new("pkill")
            .arg("-f")
            .arg(PROFILE_PREFIX)
            .status()
            .await
        {
            // pkill exits 1 when nothing matched; that's the normal case.
            Ok(status) if status.code() == Some(0) => {
                tracing::warn!("Killed orphaned browser processes from a previous run");
            }
            Ok(_) => {}
            Err(e) => {
                tracing::debug!(error = %e, "Orphan browser sweep unavailable");
            }
        }
    }
}

impl BrowserProvider for ChromeBrowser {
    type Session = ChromeSession;

    async fn acquire(&self) -> Result<ChromeSession, AppError> {
        Self::reap_orphans().await;

        let profile_dir = tempfile::Builder::new()
            .prefix(PROFILE_PREFIX)
            .tempdir()
            .map_err(|e| AppError::BrowserError(format!("Profile dir creation failed: {e}")))?;

        let mut builder = BrowserConfig::builder()
            .no_sandbox()
            .disable_default_args()
            .user_data_dir(profile_dir.path());

        if let Some(bin) = Self::find_chrome_binary() {
            tracing::debug!("Using Chrome binary: {}", bin.display());
            builder = builder.chrome_executable(bin);
        }

        if self.settings.headless {
            builder = builder.arg("--headless=new");
        }
        let config = builder
            .arg("--disable-gpu")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-extensions")
            .arg("--disable-popup-blocking")
            .arg("--disable-translate")
            .arg("--no-first-run")
            .arg("--window-size=1920,1080")
            .arg("--disable-blink-features=AutomationControlled")
            .arg(format!("--user-agent={USER_AGENT}"))
            .build()
            .map_err(|e| AppError::BrowserError(format!("Browser config error: {e}")))?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| AppError::BrowserError(format!("Failed to launch browser: {e}")))?;

        // The CDP handler must be polled continuously for the connection to work.
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    tracing::warn!("Browser CDP handler error: {event:?}");
                    break;
                }
            }
        });

        Ok(ChromeSession {
            browser: Mutex::new(Some(browser)),
            handler_task: Mutex::new(Some(handler_task)),
            _profile_dir: profile_dir,
            page_timeout: self.settings.page_timeout,
        })
    }
}

/// A live Chrome process. Dropped profile dir is cleaned up by `tempfile`;
/// the process itself is torn down in [`BrowserSession::close`].
pub struct ChromeSession {
    browser: Mutex<Option<Browser>>,
    handler_task: Mutex<Option<JoinHandle<()>>>,
    _profile_dir: TempDir,
    page_timeout: Duration,
}

impl PageSource for ChromeSession {
    fn html<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<String, AppError>> {
        Box::pin(async move {
            let guard = self.browser.lock().await;
            let browser = guard
                .as_ref()
                .ok_or_else(|| AppError::BrowserError("Session already closed".to_string()))?;

            let result = tokio::time::timeout(self.page_timeout, async {
                let page = browser
                    .new_page(url)
                    .await
                    .map_err(|e| AppError::NetworkError(format!("Failed to navigate to {url}: {e}")))?;

                // Wait until <body> is present — a minimal signal that the
                // page has rendered its main content.
                page.find_element("body")
                    .await
                    .map_err(|e| AppError::ScrapeError(format!("Page did not render body: {e}")))?;

                let html = page
                    .content()
                    .await
                    .map_err(|e| AppError::ScrapeError(format!("Failed to read page content: {e}")))?;

                let _ = page.close().await;
                Ok::<String, AppError>(html)
            })
            .await;

            match result {
                Ok(inner) => inner,
                Err(_) => Err(AppError::Timeout(self.page_timeout.as_secs())),
            }
        })
    }
}

impl BrowserSession for ChromeSession {
    /// Idempotent teardown: the first call kills the Chrome process and
    /// stops the CDP handler, later calls are no-ops. Errors are logged
    /// and swallowed so teardown never masks a scrape result.
    async fn close(&self) {
        if let Some(mut browser) = self.browser.lock().await.take() {
            if let Err(e) = browser.close().await {
                tracing::warn!(error = %e, "Browser close failed");
            }
            if let Err(e) = browser.wait().await {
                tracing::warn!(error = %e, "Browser did not exit cleanly");
            }
        }
        if let Some(task) = self.handler_task.lock().await.take() {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_defaults() {
        let s = BrowserSettings::default();
        assert!(s.headless);
        assert_eq!(s.page_timeout, Duration::from_secs(30));
    }
}
