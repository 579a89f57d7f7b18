use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::coerce::CoercedValue;
use crate::config::ExecConfig;
use crate::descriptor::{FieldDescriptor, FieldKind};
use crate::error::{FieldError, Result};
use crate::matcher::{FillPlan, PlanAction};
use crate::page::Page;
use crate::report::{FieldReport, FillOutcome, RunReport};

/// Cooperative cancellation flag, checked between field applies.
/// Already-applied fields are left as-is; there is no rollback.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// What the in-page apply routine reports back.
#[derive(Debug, Deserialize)]
struct ApplyResult {
    ok: bool,
    #[serde(default)]
    error: String,
    #[serde(default)]
    observed: serde_json::Value,
}

/// Applies a fill plan against a live page. The only component with
/// externally visible side effects; it owns the page handle exclusively for
/// the duration of a run.
pub struct Executor<'a> {
    page: &'a Page,
    config: ExecConfig,
}

impl<'a> Executor<'a> {
    pub fn new(page: &'a Page) -> Self {
        Self { page, config: ExecConfig::default() }
    }

    pub fn with_config(page: &'a Page, config: ExecConfig) -> Self {
        Self { page, config }
    }

    pub async fn run(&self, plan: &FillPlan) -> Result<RunReport> {
        self.run_cancellable(plan, &CancelHandle::new()).await
    }

    /// Apply every plan entry in document order. Field-level failures are
    /// folded into the report; nothing here aborts the run.
    pub async fn run_cancellable(&self, plan: &FillPlan, cancel: &CancelHandle) -> Result<RunReport> {
        info!(entries = plan.entries.len(), "applying fill plan");
        let mut fields = Vec::with_capacity(plan.entries.len());
        let mut cancelled = false;

        for entry in &plan.entries {
            cancelled = cancelled || cancel.is_cancelled();
            let (source, outcome) = match &entry.action {
                PlanAction::Unmatched => (None, FillOutcome::SkippedUnmatched),
                PlanAction::Incoercible { source, error } => (
                    Some(*source),
                    FillOutcome::ExecutionFailed { cause: error.clone() },
                ),
                PlanAction::Fill { source, .. } if cancelled => {
                    (Some(*source), FillOutcome::NotAttempted)
                }
                PlanAction::Fill { source, value } => {
                    (Some(*source), self.apply(&entry.descriptor, value).await)
                }
            };
            if outcome.is_failure() {
                warn!(field = %entry.descriptor.id, label = %entry.descriptor.label, ?outcome, "field degraded");
            }
            fields.push(FieldReport {
                field_id: entry.descriptor.id.clone(),
                label: entry.descriptor.label.clone(),
                kind: entry.descriptor.kind,
                source,
                outcome,
            });
        }

        let report = RunReport { fields, unassigned: plan.unassigned.clone() };
        info!(
            filled = report.filled(),
            unmatched = report.unmatched(),
            failed = report.failed(),
            "fill run finished"
        );
        Ok(report)
    }

    /// Apply one value: wait for the element, set it, let the page's own
    /// change listeners run, re-read, and compare. One retry on any mismatch
    /// or exception before degrading the entry.
    async fn apply(&self, desc: &FieldDescriptor, value: &CoercedValue) -> FillOutcome {
        match self.wait_interactable(desc).await {
            Ok(el) => {
                // Best effort; an element that cannot scroll can often still
                // be set programmatically.
                let _ = el.scroll_into_view().await;
            }
            Err(cause) => return FillOutcome::ExecutionFailed { cause },
        }

        let mut last_observed = String::new();
        for attempt in 0..2u8 {
            match self.apply_once(desc, value).await {
                Ok(observed) => {
                    if verified(value, &observed) {
                        debug!(field = %desc.id, attempt, "filled");
                        return FillOutcome::Filled;
                    }
                    last_observed = render_observed(&observed);
                }
                Err(cause) => {
                    if attempt == 1 {
                        return FillOutcome::ExecutionFailed { cause };
                    }
                }
            }
        }
        FillOutcome::VerificationFailed {
            expected: value.clone(),
            observed: last_observed,
        }
    }

    /// Bounded poll for the element to exist and be enabled. Exceeding the
    /// budget degrades this field only, never the run.
    async fn wait_interactable(&self, desc: &FieldDescriptor) -> std::result::Result<crate::element::Element, FieldError> {
        let selector = format!("[data-autoform-id=\"{}\"]:not([disabled])", desc.id);
        let start = Instant::now();
        loop {
            match self.page.find_element(&selector).await {
                Ok(el) => return Ok(el),
                Err(_) if start.elapsed() < self.config.field_timeout => {
                    tokio::time::sleep(self.config.poll_interval).await;
                }
                Err(_) => return Err(FieldError::Timeout),
            }
        }
    }

    async fn apply_once(
        &self,
        desc: &FieldDescriptor,
        value: &CoercedValue,
    ) -> std::result::Result<serde_json::Value, FieldError> {
        let js = build_apply_js(desc, value)?;
        let evaluated = tokio::time::timeout(self.config.field_timeout, self.page.evaluate_string(&js))
            .await
            .map_err(|_| FieldError::Timeout)?
            .map_err(|e| FieldError::Element(e.to_string()))?;
        let result: ApplyResult = serde_json::from_str(&evaluated)
            .map_err(|e| FieldError::Element(format!("bad apply payload: {e}")))?;
        if result.ok {
            Ok(result.observed)
        } else {
            Err(FieldError::Element(result.error))
        }
    }
}

/// Compare the re-read page state against the intended value.
fn verified(expected: &CoercedValue, observed: &serde_json::Value) -> bool {
    match expected {
        CoercedValue::Text(s) | CoercedValue::Choice(s) => observed.as_str() == Some(s),
        CoercedValue::Choices(wanted) => match observed.as_array() {
            Some(got) => {
                let mut got: Vec<&str> = got.iter().filter_map(|v| v.as_str()).collect();
                let mut wanted: Vec<&str> = wanted.iter().map(String::as_str).collect();
                got.sort_unstable();
                wanted.sort_unstable();
                got == wanted
            }
            None => false,
        },
        CoercedValue::Toggle(b) => observed.as_bool() == Some(*b),
    }
}

fn render_observed(observed: &serde_json::Value) -> String {
    match observed.as_str() {
        Some(s) => s.to_string(),
        None => observed.to_string(),
    }
}

/// Build the per-kind apply routine. Each routine sets the value through the
/// mechanism appropriate to the control, dispatches the bubbling
/// input/change events the page's own validation listens for, then re-reads
/// the live value and returns it.
fn build_apply_js(
    desc: &FieldDescriptor,
    value: &CoercedValue,
) -> std::result::Result<String, FieldError> {
    let sel = js_literal(&format!("[data-autoform-id=\"{}\"]", desc.id))?;
    let body = match (desc.kind, value) {
        (
            FieldKind::Text
            | FieldKind::Email
            | FieldKind::Tel
            | FieldKind::Textarea
            | FieldKind::Date
            | FieldKind::Month,
            CoercedValue::Text(s),
        ) => {
            let val = js_literal(s)?;
            format!(
                r#"el.focus();
                   el.value = {val};
                   el.dispatchEvent(new Event('input', {{ bubbles: true }}));
                   el.dispatchEvent(new Event('change', {{ bubbles: true }}));
                   el.blur();
                   return {{ ok: true, observed: el.value }};"#
            )
        }
        (FieldKind::SingleSelect, CoercedValue::Choice(v)) => {
            let val = js_literal(v)?;
            format!(
                r#"el.value = {val};
                   el.dispatchEvent(new Event('input', {{ bubbles: true }}));
                   el.dispatchEvent(new Event('change', {{ bubbles: true }}));
                   return {{ ok: true, observed: el.value }};"#
            )
        }
        (FieldKind::RadioGroup, CoercedValue::Choice(v)) => {
            let val = js_literal(v)?;
            format!(
                r#"const scope = el.form || document;
                   const radios = Array.from(scope.querySelectorAll('input[type="radio"]'))
                       .filter(r => r.name === el.name);
                   const target = radios.find(r => r.value === {val});
                   if (target) {{
                       target.checked = true;
                       target.dispatchEvent(new Event('input', {{ bubbles: true }}));
                       target.dispatchEvent(new Event('change', {{ bubbles: true }}));
                   }}
                   const checked = radios.find(r => r.checked);
                   return {{ ok: true, observed: checked ? checked.value : '' }};"#
            )
        }
        (FieldKind::MultiSelect, CoercedValue::Choices(vs)) if desc.tag == "select" => {
            let vals = js_array(vs)?;
            format!(
                r#"const wanted = {vals};
                   for (const o of el.options) o.selected = wanted.includes(o.value);
                   el.dispatchEvent(new Event('input', {{ bubbles: true }}));
                   el.dispatchEvent(new Event('change', {{ bubbles: true }}));
                   return {{ ok: true, observed: Array.from(el.selectedOptions).map(o => o.value) }};"#
            )
        }
        (FieldKind::MultiSelect, CoercedValue::Choices(vs)) => {
            // Checkbox group sharing one name.
            let vals = js_array(vs)?;
            format!(
                r#"const wanted = {vals};
                   const scope = el.form || document;
                   const boxes = Array.from(scope.querySelectorAll('input[type="checkbox"]'))
                       .filter(b => b.name === el.name);
                   for (const b of boxes) {{
                       const want = wanted.includes(b.value);
                       if (b.checked !== want) {{
                           b.checked = want;
                           b.dispatchEvent(new Event('input', {{ bubbles: true }}));
                           b.dispatchEvent(new Event('change', {{ bubbles: true }}));
                       }}
                   }}
                   return {{ ok: true, observed: boxes.filter(b => b.checked).map(b => b.value) }};"#
            )
        }
        (FieldKind::Checkbox, CoercedValue::Toggle(b)) => {
            format!(
                r#"el.checked = {b};
                   el.dispatchEvent(new Event('input', {{ bubbles: true }}));
                   el.dispatchEvent(new Event('change', {{ bubbles: true }}));
                   return {{ ok: true, observed: el.checked }};"#
            )
        }
        (kind, value) => {
            return Err(FieldError::IncoercibleValue {
                kind: kind.to_string(),
                reason: format!("plan value {value:?} does not fit this control"),
            })
        }
    };

    Ok(format!(
        r#"
        JSON.stringify((() => {{
            const el = document.querySelector({sel});
            if (!el) return {{ ok: false, error: 'element not found' }};
            try {{
                {body}
            }} catch (e) {{
                return {{ ok: false, error: String(e) }};
            }}
        }})())
        "#
    ))
}

fn js_literal(s: &str) -> std::result::Result<String, FieldError> {
    serde_json::to_string(s).map_err(|e| FieldError::Element(format!("value encoding failed: {e}")))
}

fn js_array(vs: &[String]) -> std::result::Result<String, FieldError> {
    serde_json::to_string(vs).map_err(|e| FieldError::Element(format!("value encoding failed: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field(kind: FieldKind, tag: &str) -> FieldDescriptor {
        FieldDescriptor {
            id: "af-0".into(),
            kind,
            tag: tag.into(),
            label: String::new(),
            placeholder: String::new(),
            name: "f".into(),
            dom_id: String::new(),
            required: false,
            max_length: None,
            options: Vec::new(),
        }
    }

    #[test]
    fn cancel_handle_is_shared_across_clones() {
        let handle = CancelHandle::new();
        let clone = handle.clone();
        assert!(!clone.is_cancelled());
        handle.cancel();
        assert!(clone.is_cancelled());
    }

    #[test]
    fn text_verification_compares_exact_value() {
        let v = CoercedValue::Text("Jane".into());
        assert!(verified(&v, &serde_json::json!("Jane")));
        assert!(!verified(&v, &serde_json::json!("")));
        assert!(!verified(&v, &serde_json::json!(null)));
    }

    #[test]
    fn choices_verification_is_order_insensitive() {
        let v = CoercedValue::Choices(vec!["rust".into(), "sql".into()]);
        assert!(verified(&v, &serde_json::json!(["sql", "rust"])));
        assert!(!verified(&v, &serde_json::json!(["rust"])));
    }

    #[test]
    fn apply_js_escapes_hostile_values() {
        let js = build_apply_js(
            &field(FieldKind::Text, "input"),
            &CoercedValue::Text("\"; alert(1); //".into()),
        )
        .unwrap();
        assert!(js.contains(r#""\"; alert(1); //""#), "{js}");
    }

    #[test]
    fn multi_select_routine_depends_on_control_tag() {
        let vs = CoercedValue::Choices(vec!["rust".into()]);
        let select_js = build_apply_js(&field(FieldKind::MultiSelect, "select"), &vs).unwrap();
        assert!(select_js.contains("selectedOptions"));
        let boxes_js = build_apply_js(&field(FieldKind::MultiSelect, "input"), &vs).unwrap();
        assert!(boxes_js.contains("checkbox"));
    }

    #[test]
    fn mismatched_plan_value_is_rejected() {
        let err = build_apply_js(&field(FieldKind::Text, "input"), &CoercedValue::Toggle(true))
            .unwrap_err();
        assert!(matches!(err, FieldError::IncoercibleValue { .. }));
    }
}
