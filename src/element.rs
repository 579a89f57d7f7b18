use chromiumoxide::element::Element as CrElement;

use crate::error::{Error, Result};

/// Wrapper around a chromiumoxide Element, providing a simplified API.
pub struct Element {
    inner: CrElement,
}

impl Element {
    pub(crate) fn new(inner: CrElement) -> Self {
        Self { inner }
    }

    /// Scroll this element into view.
    pub async fn scroll_into_view(&self) -> Result<()> {
        self.inner
            .scroll_into_view()
            .await
            .map_err(Error::CdpError)?;
        Ok(())
    }
}
