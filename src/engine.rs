use tracing::info;

use crate::config::{ExecConfig, MatchConfig};
use crate::error::Result;
use crate::executor::{CancelHandle, Executor};
use crate::extract;
use crate::matcher::{self, FillPlan};
use crate::page::Page;
use crate::profile::Profile;
use crate::report::RunReport;

/// Ties the pipeline together: validate profile, extract descriptors, build
/// the plan, execute it. One engine can serve any number of runs; each run
/// owns its page handle exclusively, so independent pages may be filled
/// concurrently against the same read-only profile.
#[derive(Debug, Clone, Default)]
pub struct FillEngine {
    pub match_config: MatchConfig,
    pub exec_config: ExecConfig,
}

impl FillEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_match_config(mut self, config: MatchConfig) -> Self {
        self.match_config = config;
        self
    }

    pub fn with_exec_config(mut self, config: ExecConfig) -> Self {
        self.exec_config = config;
        self
    }

    /// Validate, extract and match, without touching the page beyond
    /// read-only inspection. Useful for previewing what a run would do.
    pub async fn plan(&self, profile: &Profile, page: &Page) -> Result<FillPlan> {
        profile.validate()?;
        let descriptors = extract::extract_fields(page).await?;
        info!(fields = descriptors.len(), "building fill plan");
        Ok(matcher::build_plan(profile, &descriptors, &self.match_config))
    }

    /// Full run: plan and apply. Field-level problems land in the report;
    /// only profile- and document-level errors surface as `Err`.
    pub async fn run(&self, profile: &Profile, page: &Page) -> Result<RunReport> {
        self.run_cancellable(profile, page, &CancelHandle::new()).await
    }

    pub async fn run_cancellable(
        &self,
        profile: &Profile,
        page: &Page,
        cancel: &CancelHandle,
    ) -> Result<RunReport> {
        let plan = self.plan(profile, page).await?;
        Executor::with_config(page, self.exec_config.clone())
            .run_cancellable(&plan, cancel)
            .await
    }
}
