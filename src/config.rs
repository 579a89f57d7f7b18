use std::collections::HashMap;
use std::time::Duration;

use crate::profile::AttributePath;

/// Per-attribute alias tokens that indicate a match against a field's
/// name/label/placeholder. Injectable so callers can extend it with
/// localized or domain-specific vocabulary instead of patching the matcher.
#[derive(Debug, Clone)]
pub struct AliasTable {
    entries: HashMap<AttributePath, Vec<String>>,
}

impl AliasTable {
    pub fn empty() -> Self {
        Self { entries: HashMap::new() }
    }

    pub fn aliases(&self, attr: AttributePath) -> &[String] {
        self.entries.get(&attr).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Replace the alias list for one attribute.
    pub fn set<I, S>(&mut self, attr: AttributePath, aliases: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.entries.insert(attr, aliases.into_iter().map(Into::into).collect());
    }

    /// Append one alias to an attribute's list.
    pub fn add(&mut self, attr: AttributePath, alias: impl Into<String>) {
        self.entries.entry(attr).or_default().push(alias.into());
    }
}

impl Default for AliasTable {
    fn default() -> Self {
        use AttributePath::*;
        let mut table = Self::empty();
        table.set(FullName, ["name", "full name", "fullname", "your name", "applicant name"]);
        table.set(Email, ["email", "e-mail", "mail", "email address", "contact email"]);
        table.set(Phone, ["phone", "telephone", "tel", "mobile", "phone number", "cell"]);
        table.set(Address, ["address", "street address", "location", "city"]);
        table.set(Institution, ["school", "university", "college", "institution", "alma mater"]);
        table.set(Degree, ["degree", "qualification", "education level", "highest degree"]);
        table.set(FieldOfStudy, ["major", "field of study", "discipline", "area of study"]);
        table.set(EducationStart, ["education start date", "enrollment date", "start of studies"]);
        table.set(EducationEnd, ["graduation date", "graduation year", "completion date"]);
        table.set(Employer, ["company", "employer", "organization", "current company", "workplace"]);
        table.set(JobTitle, ["title", "job title", "position", "role", "current title"]);
        table.set(ExperienceStart, ["start date", "employment start", "from"]);
        table.set(ExperienceEnd, ["end date", "employment end", "until"]);
        table.set(JobDescription, ["job description", "responsibilities", "duties", "summary of experience"]);
        table.set(Skills, ["skills", "technologies", "tech stack", "competencies", "skill set"]);
        table
    }
}

/// Matcher tuning: the alias table plus the score floors/ceilings of the
/// strategy cascade. Defaults are deliberately conservative; a false
/// Unmatched is cheaper than corrupting an unrelated field.
#[derive(Debug, Clone)]
pub struct MatchConfig {
    pub aliases: AliasTable,
    /// Minimum label/placeholder similarity to qualify at all.
    pub label_floor: f32,
    /// Placeholders are a weaker signal than labels; their score is capped.
    pub placeholder_ceiling: f32,
    /// Minimum option-text similarity for choice-field coercion.
    pub option_floor: f32,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            aliases: AliasTable::default(),
            label_floor: 0.5,
            placeholder_ceiling: 0.6,
            option_floor: 0.55,
        }
    }
}

/// Executor timing: bounded wait for each element to become interactable.
#[derive(Debug, Clone)]
pub struct ExecConfig {
    pub field_timeout: Duration,
    pub poll_interval: Duration,
}

impl Default for ExecConfig {
    fn default() -> Self {
        Self {
            field_timeout: Duration::from_secs(10),
            poll_interval: Duration::from_millis(100),
        }
    }
}
