use std::fmt;

use serde::Serialize;

use crate::coerce::CoercedValue;
use crate::descriptor::FieldKind;
use crate::error::FieldError;
use crate::profile::AttributePath;

/// Final outcome for one plan entry. Immutable once recorded.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase", tag = "status")]
pub enum FillOutcome {
    Filled,
    SkippedUnmatched,
    VerificationFailed { expected: CoercedValue, observed: String },
    ExecutionFailed { cause: FieldError },
    /// The run was cancelled before this entry was reached.
    NotAttempted,
}

impl FillOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            FillOutcome::VerificationFailed { .. } | FillOutcome::ExecutionFailed { .. }
        )
    }
}

/// One row of the run report: which field, where the value came from, and
/// how applying it went.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldReport {
    pub field_id: String,
    pub label: String,
    pub kind: FieldKind,
    pub source: Option<AttributePath>,
    pub outcome: FillOutcome,
}

/// Aggregated per-field outcomes for one run, plus the profile attributes
/// that never found a field. Pure aggregation, no I/O; serializable for a
/// presentation layer.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    pub fields: Vec<FieldReport>,
    pub unassigned: Vec<AttributePath>,
}

impl RunReport {
    pub fn total(&self) -> usize {
        self.fields.len()
    }

    pub fn filled(&self) -> usize {
        self.count(|o| matches!(o, FillOutcome::Filled))
    }

    pub fn unmatched(&self) -> usize {
        self.count(|o| matches!(o, FillOutcome::SkippedUnmatched))
    }

    pub fn failed(&self) -> usize {
        self.count(FillOutcome::is_failure)
    }

    pub fn not_attempted(&self) -> usize {
        self.count(|o| matches!(o, FillOutcome::NotAttempted))
    }

    fn count(&self, pred: impl Fn(&FillOutcome) -> bool) -> usize {
        self.fields.iter().filter(|f| pred(&f.outcome)).count()
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} fields: {} filled, {} unmatched, {} failed, {} not attempted",
            self.total(),
            self.filled(),
            self.unmatched(),
            self.failed(),
            self.not_attempted()
        )?;
        for field in &self.fields {
            let label = if field.label.is_empty() { &field.field_id } else { &field.label };
            let status = match &field.outcome {
                FillOutcome::Filled => "filled".to_string(),
                FillOutcome::SkippedUnmatched => "unmatched".to_string(),
                FillOutcome::VerificationFailed { expected, observed } => {
                    format!("verification failed (expected {expected:?}, observed {observed:?})")
                }
                FillOutcome::ExecutionFailed { cause } => format!("failed: {cause}"),
                FillOutcome::NotAttempted => "not attempted".to_string(),
            };
            let source = field
                .source
                .map(|s| format!(" <- {s}"))
                .unwrap_or_default();
            writeln!(f, "  [{}] {label}{source}: {status}", field.kind)?;
        }
        if !self.unassigned.is_empty() {
            let list: Vec<String> = self.unassigned.iter().map(|a| a.to_string()).collect();
            writeln!(f, "  unassigned profile attributes: {}", list.join(", "))?;
        }
        Ok(())
    }
}
