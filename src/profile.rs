use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

fn email_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("static regex"))
}

/// Canonical structured representation of a candidate, as produced by an
/// upstream resume-extraction collaborator. Pure data; the only behavior is
/// validation and attribute resolution.
///
/// Field names follow the camelCase convention of the upstream JSON
/// (`fullName`, `startDate`, ...). Every field is defaulted so a partial
/// extraction still deserializes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Profile {
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub address: Option<String>,
    pub education: Vec<Education>,
    pub experience: Vec<Experience>,
    pub skills: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Education {
    pub institution: String,
    pub degree: String,
    pub field: String,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Experience {
    pub employer: String,
    pub title: String,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub description: Option<String>,
}

impl Profile {
    /// Check the required identity fields before any DOM interaction.
    /// `fullName` and `email` must be present and the email must be
    /// syntactically plausible.
    pub fn validate(&self) -> Result<()> {
        if self.full_name.trim().is_empty() {
            return Err(Error::InvalidProfile("fullName is empty".into()));
        }
        if self.email.trim().is_empty() {
            return Err(Error::InvalidProfile("email is empty".into()));
        }
        if !email_re().is_match(self.email.trim()) {
            return Err(Error::InvalidProfile(format!(
                "email is not syntactically valid: {}",
                self.email
            )));
        }
        Ok(())
    }

    /// Resolve an attribute path to its value. List-valued paths resolve to
    /// the first (most recent) sequence element, except [`AttributePath::Skills`]
    /// which resolves to the whole set. Returns `None` when the underlying
    /// data is absent or blank.
    pub fn value_of(&self, path: AttributePath) -> Option<AttributeValue> {
        use AttributePath::*;
        let text = |s: &str| {
            let s = s.trim();
            (!s.is_empty()).then(|| AttributeValue::Text(s.to_string()))
        };
        let date = |s: &Option<String>| {
            let s = s.as_deref().unwrap_or("").trim().to_string();
            (!s.is_empty()).then_some(AttributeValue::Date(s))
        };
        match path {
            FullName => text(&self.full_name),
            Email => text(&self.email),
            Phone => text(&self.phone),
            Address => text(self.address.as_deref().unwrap_or("")),
            Institution => text(&self.education.first()?.institution),
            Degree => text(&self.education.first()?.degree),
            FieldOfStudy => text(&self.education.first()?.field),
            EducationStart => date(&self.education.first()?.start_date),
            EducationEnd => date(&self.education.first()?.end_date),
            Employer => text(&self.experience.first()?.employer),
            JobTitle => text(&self.experience.first()?.title),
            ExperienceStart => date(&self.experience.first()?.start_date),
            ExperienceEnd => date(&self.experience.first()?.end_date),
            JobDescription => text(self.experience.first()?.description.as_deref().unwrap_or("")),
            Skills => {
                let skills: Vec<String> = self
                    .skills
                    .iter()
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect();
                (!skills.is_empty()).then_some(AttributeValue::List(skills))
            }
        }
    }

    /// All attribute paths with a present, non-blank value, in canonical
    /// order. The fixed order is what keeps matching deterministic.
    pub fn present_attributes(&self) -> Vec<AttributePath> {
        AttributePath::ALL
            .iter()
            .copied()
            .filter(|p| self.value_of(*p).is_some())
            .collect()
    }
}

/// Identifies one attribute of a [`Profile`]. Sequence-backed paths address
/// the first element of their sequence; `Skills` addresses the full set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AttributePath {
    FullName,
    Email,
    Phone,
    Address,
    Institution,
    Degree,
    FieldOfStudy,
    EducationStart,
    EducationEnd,
    Employer,
    JobTitle,
    ExperienceStart,
    ExperienceEnd,
    JobDescription,
    Skills,
}

impl AttributePath {
    /// Canonical ordering, used both for iteration and as the final matcher
    /// tie-break.
    pub const ALL: [AttributePath; 15] = [
        AttributePath::FullName,
        AttributePath::Email,
        AttributePath::Phone,
        AttributePath::Address,
        AttributePath::Institution,
        AttributePath::Degree,
        AttributePath::FieldOfStudy,
        AttributePath::EducationStart,
        AttributePath::EducationEnd,
        AttributePath::Employer,
        AttributePath::JobTitle,
        AttributePath::ExperienceStart,
        AttributePath::ExperienceEnd,
        AttributePath::JobDescription,
        AttributePath::Skills,
    ];

    pub fn semantic_type(self) -> SemanticType {
        use AttributePath::*;
        match self {
            Email => SemanticType::Email,
            Phone => SemanticType::Phone,
            EducationStart | EducationEnd | ExperienceStart | ExperienceEnd => SemanticType::Date,
            JobDescription => SemanticType::LongText,
            Skills => SemanticType::TagList,
            _ => SemanticType::FreeText,
        }
    }
}

impl fmt::Display for AttributePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use AttributePath::*;
        let s = match self {
            FullName => "fullName",
            Email => "email",
            Phone => "phone",
            Address => "address",
            Institution => "education[0].institution",
            Degree => "education[0].degree",
            FieldOfStudy => "education[0].field",
            EducationStart => "education[0].startDate",
            EducationEnd => "education[0].endDate",
            Employer => "experience[0].employer",
            JobTitle => "experience[0].title",
            ExperienceStart => "experience[0].startDate",
            ExperienceEnd => "experience[0].endDate",
            JobDescription => "experience[0].description",
            Skills => "skills",
        };
        f.write_str(s)
    }
}

impl serde::Serialize for AttributePath {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Broad semantic shape of an attribute value, used by the matcher's
/// type-compatibility veto and by the coercer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SemanticType {
    FreeText,
    Email,
    Phone,
    Date,
    LongText,
    TagList,
}

/// A resolved attribute value, carrying enough shape for coercion.
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    Text(String),
    Date(String),
    List(Vec<String>),
}

impl AttributeValue {
    /// Flatten to a single string, joining list values with a comma. This is
    /// what lands in plain text targets.
    pub fn as_text(&self) -> String {
        match self {
            AttributeValue::Text(s) | AttributeValue::Date(s) => s.clone(),
            AttributeValue::List(items) => items.join(", "),
        }
    }

    /// Individual value items: one for scalars, each element for lists.
    pub fn items(&self) -> Vec<&str> {
        match self {
            AttributeValue::Text(s) | AttributeValue::Date(s) => vec![s.as_str()],
            AttributeValue::List(items) => items.iter().map(String::as_str).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal() -> Profile {
        Profile {
            full_name: "Jane Doe".into(),
            email: "jane@x.com".into(),
            ..Profile::default()
        }
    }

    #[test]
    fn validates_minimal_profile() {
        assert!(minimal().validate().is_ok());
    }

    #[test]
    fn rejects_missing_name() {
        let p = Profile {
            full_name: "  ".into(),
            ..minimal()
        };
        assert!(matches!(p.validate(), Err(Error::InvalidProfile(_))));
    }

    #[test]
    fn rejects_malformed_email() {
        for bad in ["jane", "jane@", "@x.com", "jane@nodot", "a b@x.com"] {
            let p = Profile {
                email: bad.into(),
                ..minimal()
            };
            assert!(p.validate().is_err(), "accepted {bad:?}");
        }
    }

    #[test]
    fn deserializes_upstream_camel_case_json() {
        let json = r#"{
            "fullName": "Jane Doe",
            "email": "jane@x.com",
            "education": [{"institution": "MIT", "degree": "BSc", "field": "CS", "startDate": "2015-09"}],
            "experience": [{"employer": "Acme", "title": "Engineer"}],
            "skills": ["Rust", "SQL"]
        }"#;
        let p: Profile = serde_json::from_str(json).unwrap();
        assert_eq!(p.full_name, "Jane Doe");
        assert_eq!(p.education[0].start_date.as_deref(), Some("2015-09"));
        assert_eq!(p.skills.len(), 2);
    }

    #[test]
    fn value_of_resolves_first_sequence_element() {
        let p = Profile {
            education: vec![
                Education {
                    institution: "MIT".into(),
                    degree: "BSc".into(),
                    ..Education::default()
                },
                Education {
                    institution: "Old School".into(),
                    ..Education::default()
                },
            ],
            ..minimal()
        };
        assert_eq!(
            p.value_of(AttributePath::Institution),
            Some(AttributeValue::Text("MIT".into()))
        );
    }

    #[test]
    fn value_of_skills_is_full_set() {
        let p = Profile {
            skills: vec!["Rust".into(), " ".into(), "SQL".into()],
            ..minimal()
        };
        assert_eq!(
            p.value_of(AttributePath::Skills),
            Some(AttributeValue::List(vec!["Rust".into(), "SQL".into()]))
        );
    }

    #[test]
    fn present_attributes_skips_blank_values() {
        let p = minimal();
        let present = p.present_attributes();
        assert_eq!(present, vec![AttributePath::FullName, AttributePath::Email]);
    }

    #[test]
    fn attribute_path_displays_dotted_source_path() {
        assert_eq!(AttributePath::Degree.to_string(), "education[0].degree");
        assert_eq!(AttributePath::Skills.to_string(), "skills");
    }
}
