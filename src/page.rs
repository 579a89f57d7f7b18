use std::time::Duration;

use chromiumoxide::page::Page as CrPage;

use crate::element::Element;
use crate::error::{Error, Result};

/// Wrapper around a chromiumoxide Page. This is the opaque page handle the
/// engine consumes; navigation and lifecycle stay with the owning session.
pub struct Page {
    inner: CrPage,
    default_timeout: Duration,
}

impl Page {
    pub(crate) fn new(inner: CrPage, default_timeout: Duration) -> Self {
        Self { inner, default_timeout }
    }

    /// Navigate to the given URL and wait for the page to load.
    pub async fn goto(&self, url: &str) -> Result<()> {
        self.inner
            .goto(url)
            .await
            .map_err(|e| Error::NavigationError(e.to_string()))?;
        Ok(())
    }

    /// Evaluate a JavaScript expression that yields a string.
    pub async fn evaluate_string(&self, expression: &str) -> Result<String> {
        let result = self
            .inner
            .evaluate(expression)
            .await
            .map_err(|e| Error::JsError(e.to_string()))?;
        result.into_value().map_err(|e| Error::JsError(e.to_string()))
    }

    /// Evaluate a JavaScript expression without caring about the return value.
    pub async fn evaluate_void(&self, expression: &str) -> Result<()> {
        self.inner
            .evaluate(expression)
            .await
            .map_err(|e| Error::JsError(e.to_string()))?;
        Ok(())
    }

    /// Find an element matching the given CSS selector.
    pub async fn find_element(&self, selector: &str) -> Result<Element> {
        let el = self
            .inner
            .find_element(selector)
            .await
            .map_err(|e| Error::ElementNotFound(e.to_string()))?;
        Ok(Element::new(el))
    }

    /// Wait for an element matching the given CSS selector to appear in the
    /// DOM. Polls every 100ms up to the configured default timeout.
    pub async fn wait_for_selector(&self, selector: &str) -> Result<Element> {
        let timeout = self.default_timeout;
        let interval = Duration::from_millis(100);
        let start = std::time::Instant::now();

        loop {
            match self.find_element(selector).await {
                Ok(el) => return Ok(el),
                Err(_) if start.elapsed() < timeout => {
                    tokio::time::sleep(interval).await;
                }
                Err(_) => {
                    return Err(Error::Timeout(format!(
                        "Timed out waiting for selector: {}",
                        selector
                    )));
                }
            }
        }
    }

    /// Close the page and release its renderer resources. The handle itself
    /// survives so callers can observe the resulting stale-document errors.
    pub async fn close(&self) -> Result<()> {
        self.inner
            .clone()
            .close()
            .await
            .map_err(|e| Error::NavigationError(e.to_string()))?;
        Ok(())
    }
}
