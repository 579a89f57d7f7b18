use std::time::Duration;

use chromiumoxide::browser::{Browser as CrBrowser, BrowserConfig as CrBrowserConfig};
use chromiumoxide::handler::viewport::Viewport;
use futures::StreamExt;

use crate::error::{Error, Result};
use crate::page::Page;

/// Chrome flags that improve performance without affecting functionality.
const PERF_ARGS: &[&str] = &[
    "disable-gpu",
    "disable-extensions",
    "metrics-recording-only",
    "mute-audio",
    "no-default-browser-check",
    "disable-client-side-phishing-detection",
    "disable-popup-blocking",
    "disable-prompt-on-repost",
];

pub struct SessionConfig {
    pub headless: bool,
    pub viewport_width: u32,
    pub viewport_height: u32,
    pub chrome_path: Option<String>,
    /// Default timeout for operations like `wait_for_selector` (default: 30s).
    pub default_timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            headless: true,
            viewport_width: 1920,
            viewport_height: 1080,
            chrome_path: None,
            default_timeout: Duration::from_secs(30),
        }
    }
}

pub struct SessionBuilder {
    config: SessionConfig,
}

impl SessionBuilder {
    pub fn new() -> Self {
        Self { config: SessionConfig::default() }
    }

    pub fn headless(mut self, headless: bool) -> Self {
        self.config.headless = headless;
        self
    }

    pub fn viewport(mut self, width: u32, height: u32) -> Self {
        self.config.viewport_width = width;
        self.config.viewport_height = height;
        self
    }

    pub fn chrome_path(mut self, path: impl Into<String>) -> Self {
        self.config.chrome_path = Some(path.into());
        self
    }

    /// Set the default timeout for operations like `wait_for_selector`.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.default_timeout = timeout;
        self
    }

    pub fn build_config(self) -> SessionConfig {
        self.config
    }

    pub async fn build(self) -> Result<Session> {
        Session::launch(self.build_config()).await
    }
}

impl Default for SessionBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Owns the browser process and hands out page handles. The engine never
/// touches this type; it only consumes the `Page` handles a session
/// produces, so any other page source works too.
pub struct Session {
    browser: CrBrowser,
    default_timeout: Duration,
    _handler_task: tokio::task::JoinHandle<()>,
}

impl Session {
    /// Create a new SessionBuilder for configuring and launching a browser.
    pub fn builder() -> SessionBuilder {
        SessionBuilder::new()
    }

    /// Launch a browser instance with the given configuration.
    pub async fn launch(config: SessionConfig) -> Result<Self> {
        let mut builder = CrBrowserConfig::builder();

        if config.headless {
            builder = builder.new_headless_mode().no_sandbox();
        } else {
            builder = builder.with_head().no_sandbox();
        }

        for arg in PERF_ARGS {
            builder = builder.arg(*arg);
        }

        if let Some(ref path) = config.chrome_path {
            builder = builder.chrome_executable(path);
        }

        builder = builder.viewport(Viewport {
            width: config.viewport_width,
            height: config.viewport_height,
            device_scale_factor: None,
            emulating_mobile: false,
            is_landscape: false,
            has_touch: false,
        });

        let cr_config = builder
            .build()
            .map_err(|e| Error::LaunchError(e.to_string()))?;

        let (browser, mut handler) = CrBrowser::launch(cr_config)
            .await
            .map_err(|e| Error::LaunchError(e.to_string()))?;

        let handler_task = tokio::spawn(async move {
            while let Some(_event) = handler.next().await {}
        });

        Ok(Self {
            browser,
            default_timeout: config.default_timeout,
            _handler_task: handler_task,
        })
    }

    /// Open a new page (tab) navigated to the given URL.
    pub async fn new_page(&self, url: &str) -> Result<Page> {
        let cr_page = self
            .browser
            .new_page(url)
            .await
            .map_err(|e| Error::NavigationError(e.to_string()))?;
        Ok(Page::new(cr_page, self.default_timeout))
    }
}
