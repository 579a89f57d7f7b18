use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;

use crate::config::MatchConfig;
use crate::descriptor::{ChoiceOption, FieldDescriptor, FieldKind};
use crate::error::FieldError;
use crate::matcher::similarity;
use crate::profile::AttributeValue;

/// A value in the exact representation the executor applies to the target
/// element.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum CoercedValue {
    /// Literal string for text-like inputs and textareas.
    Text(String),
    /// The `value` of the option to select (single select / radio group).
    Choice(String),
    /// The `value`s of the options to select (multi select / checkbox group).
    Choices(Vec<String>),
    /// Checked state for a lone checkbox.
    Toggle(bool),
}

impl fmt::Display for CoercedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoercedValue::Text(s) | CoercedValue::Choice(s) => f.write_str(s),
            CoercedValue::Choices(vs) => f.write_str(&vs.join(", ")),
            CoercedValue::Toggle(b) => write!(f, "{b}"),
        }
    }
}

/// Convert a source attribute value into the representation required by the
/// target field's kind.
pub fn coerce(
    value: &AttributeValue,
    desc: &FieldDescriptor,
    config: &MatchConfig,
) -> Result<CoercedValue, FieldError> {
    match desc.kind {
        FieldKind::Text | FieldKind::Email | FieldKind::Tel | FieldKind::Textarea => {
            let text = match value {
                AttributeValue::Date(raw) => render_date(raw, desc)?,
                other => other.as_text(),
            };
            Ok(CoercedValue::Text(truncate(text, desc.max_length)))
        }
        FieldKind::Date | FieldKind::Month => match value {
            AttributeValue::Date(raw) => Ok(CoercedValue::Text(render_date(raw, desc)?)),
            other => Err(FieldError::IncoercibleValue {
                kind: desc.kind.to_string(),
                reason: format!("expected a date value, got {:?}", other.as_text()),
            }),
        },
        FieldKind::SingleSelect | FieldKind::RadioGroup => {
            let text = value.as_text();
            let mut best: Option<(&ChoiceOption, f32)> = None;
            for option in submittable(&desc.options) {
                let score = option_score(&text, option);
                if best.map_or(true, |(_, b)| score > b) {
                    best = Some((option, score));
                }
            }
            match best {
                Some((option, score)) if score >= config.option_floor => {
                    Ok(CoercedValue::Choice(option.value.clone()))
                }
                Some((_, score)) => Err(FieldError::NoMatchingOption { best: score }),
                None => Err(FieldError::NoMatchingOption { best: 0.0 }),
            }
        }
        FieldKind::MultiSelect => {
            let items = value.items();
            let mut chosen = Vec::new();
            let mut best = 0.0f32;
            for option in submittable(&desc.options) {
                let score = items
                    .iter()
                    .map(|item| option_score(item, option))
                    .fold(0.0, f32::max);
                best = best.max(score);
                if score >= config.option_floor {
                    chosen.push(option.value.clone());
                }
            }
            if chosen.is_empty() {
                Err(FieldError::NoMatchingOption { best })
            } else {
                Ok(CoercedValue::Choices(chosen))
            }
        }
        FieldKind::Checkbox => Ok(CoercedValue::Toggle(!value.as_text().is_empty())),
    }
}

/// Best similarity between an attribute value and any option of the field.
/// The matcher uses this to gate choice-kind assignments before committing
/// to them.
pub(crate) fn best_option_score(value: &AttributeValue, options: &[ChoiceOption]) -> f32 {
    let mut best = 0.0f32;
    for option in submittable(options) {
        for item in value.items() {
            best = best.max(option_score(item, option));
        }
    }
    best
}

fn option_score(item: &str, option: &ChoiceOption) -> f32 {
    similarity(item, &option.display_text).max(similarity(item, &option.value))
}

/// Options with an empty `value` are placeholders ("-- select --") and can
/// never be submitted.
fn submittable(options: &[ChoiceOption]) -> impl Iterator<Item = &ChoiceOption> {
    options.iter().filter(|o| !o.value.is_empty())
}

fn truncate(s: String, max_length: Option<u32>) -> String {
    match max_length {
        Some(max) if s.chars().count() > max as usize => s.chars().take(max as usize).collect(),
        _ => s,
    }
}

// ── Dates ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq)]
struct ParsedDate {
    year: i32,
    month: Option<u32>,
    day: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum DatePattern {
    Iso,
    MonthDayYear,
    DayMonthYear,
    MonthSlashYear,
    YearOnly,
}

fn date_res() -> &'static [Regex; 5] {
    static RES: OnceLock<[Regex; 5]> = OnceLock::new();
    RES.get_or_init(|| {
        [
            Regex::new(r"^(\d{4})-(\d{1,2})(?:-(\d{1,2}))?$").expect("static regex"),
            Regex::new(r"^(\d{1,2})/(\d{1,2})/(\d{4})$").expect("static regex"),
            Regex::new(r"^(\d{1,2})/(\d{4})$").expect("static regex"),
            Regex::new(r"^([A-Za-z]{3,9})\.?,?\s+(\d{4})$").expect("static regex"),
            Regex::new(r"^(\d{4})$").expect("static regex"),
        ]
    })
}

const MONTHS: [&str; 12] = [
    "jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "oct", "nov", "dec",
];

fn parse_date(raw: &str) -> Option<ParsedDate> {
    let raw = raw.trim();
    let [iso, mdy, my, month_name, year_only] = date_res();
    let num = |m: Option<regex::Match>| m.and_then(|m| m.as_str().parse::<u32>().ok());

    let parsed = if let Some(c) = iso.captures(raw) {
        ParsedDate { year: c[1].parse().ok()?, month: num(c.get(2)), day: num(c.get(3)) }
    } else if let Some(c) = mdy.captures(raw) {
        ParsedDate { year: c[3].parse().ok()?, month: num(c.get(1)), day: num(c.get(2)) }
    } else if let Some(c) = my.captures(raw) {
        ParsedDate { year: c[2].parse().ok()?, month: num(c.get(1)), day: None }
    } else if let Some(c) = month_name.captures(raw) {
        let prefix = c[1].to_lowercase();
        let month = MONTHS.iter().position(|m| prefix.starts_with(m))? as u32 + 1;
        ParsedDate { year: c[2].parse().ok()?, month: Some(month), day: None }
    } else if let Some(c) = year_only.captures(raw) {
        ParsedDate { year: c[1].parse().ok()?, month: None, day: None }
    } else {
        return None;
    };

    if parsed.month.is_some_and(|m| !(1..=12).contains(&m))
        || parsed.day.is_some_and(|d| !(1..=31).contains(&d))
    {
        return None;
    }
    Some(parsed)
}

/// Infer the expected output pattern from the field's kind and its
/// placeholder/name/label tokens. `None` means nothing was inferable and the
/// locale-agnostic ISO fallback applies.
fn infer_pattern(desc: &FieldDescriptor) -> Option<DatePattern> {
    if desc.kind == FieldKind::Date {
        return Some(DatePattern::Iso);
    }
    let hay = format!("{} {} {}", desc.placeholder, desc.name, desc.label).to_lowercase();
    if hay.contains("dd/mm/yyyy") {
        Some(DatePattern::DayMonthYear)
    } else if hay.contains("mm/dd/yyyy") {
        Some(DatePattern::MonthDayYear)
    } else if hay.contains("yyyy-mm-dd") {
        Some(DatePattern::Iso)
    } else if hay.contains("mm/yyyy") {
        Some(DatePattern::MonthSlashYear)
    } else if hay.contains("year") {
        Some(DatePattern::YearOnly)
    } else {
        None
    }
}

fn render_date(raw: &str, desc: &FieldDescriptor) -> Result<String, FieldError> {
    let parsed = parse_date(raw).ok_or_else(|| FieldError::IncoercibleValue {
        kind: desc.kind.to_string(),
        reason: format!("unparseable date {raw:?}"),
    })?;

    // Native month inputs accept exactly yyyy-mm; a day component gets
    // sanitized to an empty value by the browser.
    if desc.kind == FieldKind::Month {
        let month = parsed.month.ok_or(FieldError::UnknownDateFormat)?;
        return Ok(format!("{:04}-{:02}", parsed.year, month));
    }

    match infer_pattern(desc) {
        Some(DatePattern::Iso) => {
            if desc.kind == FieldKind::Date {
                // Native date inputs need a full y-m-d; a missing day
                // defaults to the first of the month.
                let month = parsed.month.ok_or(FieldError::UnknownDateFormat)?;
                Ok(format!("{:04}-{:02}-{:02}", parsed.year, month, parsed.day.unwrap_or(1)))
            } else {
                Ok(render_iso(parsed))
            }
        }
        Some(DatePattern::MonthDayYear) => {
            let month = parsed.month.ok_or(FieldError::UnknownDateFormat)?;
            Ok(format!("{:02}/{:02}/{:04}", month, parsed.day.unwrap_or(1), parsed.year))
        }
        Some(DatePattern::DayMonthYear) => {
            let month = parsed.month.ok_or(FieldError::UnknownDateFormat)?;
            Ok(format!("{:02}/{:02}/{:04}", parsed.day.unwrap_or(1), month, parsed.year))
        }
        Some(DatePattern::MonthSlashYear) => {
            let month = parsed.month.ok_or(FieldError::UnknownDateFormat)?;
            Ok(format!("{:02}/{:04}", month, parsed.year))
        }
        Some(DatePattern::YearOnly) => Ok(format!("{:04}", parsed.year)),
        // ISO fallback, rendered to the precision the source actually has.
        None => Ok(render_iso(parsed)),
    }
}

fn render_iso(parsed: ParsedDate) -> String {
    match (parsed.month, parsed.day) {
        (Some(m), Some(d)) => format!("{:04}-{:02}-{:02}", parsed.year, m, d),
        (Some(m), None) => format!("{:04}-{:02}", parsed.year, m),
        _ => format!("{:04}", parsed.year),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::AttributeValue::{Date, List, Text as TextVal};

    fn field(kind: FieldKind) -> FieldDescriptor {
        FieldDescriptor {
            id: "af-0".into(),
            kind,
            tag: if kind == FieldKind::SingleSelect { "select" } else { "input" }.into(),
            label: String::new(),
            placeholder: String::new(),
            name: String::new(),
            dom_id: String::new(),
            required: false,
            max_length: None,
            options: Vec::new(),
        }
    }

    fn options(pairs: &[(&str, &str)]) -> Vec<ChoiceOption> {
        pairs
            .iter()
            .map(|(v, t)| ChoiceOption { value: (*v).into(), display_text: (*t).into() })
            .collect()
    }

    #[test]
    fn text_passes_through_and_truncates() {
        let mut f = field(FieldKind::Text);
        f.max_length = Some(5);
        let got = coerce(&TextVal("Jane Doe".into()), &f, &MatchConfig::default()).unwrap();
        assert_eq!(got, CoercedValue::Text("Jane ".into()));
    }

    #[test]
    fn skills_flatten_into_a_plain_text_field() {
        let f = field(FieldKind::Text);
        let got = coerce(
            &List(vec!["Rust".into(), "SQL".into()]),
            &f,
            &MatchConfig::default(),
        )
        .unwrap();
        assert_eq!(got, CoercedValue::Text("Rust, SQL".into()));
    }

    #[test]
    fn degree_value_matches_closest_option() {
        let mut f = field(FieldKind::SingleSelect);
        f.options = options(&[("bs", "Bachelor's"), ("ms", "Master's")]);
        let got = coerce(
            &TextVal("Bachelor of Science".into()),
            &f,
            &MatchConfig::default(),
        )
        .unwrap();
        assert_eq!(got, CoercedValue::Choice("bs".into()));
    }

    #[test]
    fn unrelated_value_yields_no_matching_option() {
        let mut f = field(FieldKind::SingleSelect);
        f.options = options(&[("bs", "Bachelor's"), ("ms", "Master's")]);
        let err = coerce(&TextVal("zebra".into()), &f, &MatchConfig::default()).unwrap_err();
        assert!(matches!(err, FieldError::NoMatchingOption { .. }));
    }

    #[test]
    fn placeholder_options_are_never_chosen() {
        let mut f = field(FieldKind::SingleSelect);
        f.options = options(&[("", "-- select --"), ("bs", "Bachelor's")]);
        let got = coerce(&TextVal("Bachelor".into()), &f, &MatchConfig::default()).unwrap();
        assert_eq!(got, CoercedValue::Choice("bs".into()));
    }

    #[test]
    fn multi_select_picks_the_matching_subset() {
        let mut f = field(FieldKind::MultiSelect);
        f.options = options(&[("rust", "Rust"), ("go", "Go"), ("sql", "SQL")]);
        let got = coerce(
            &List(vec!["Rust".into(), "SQL".into()]),
            &f,
            &MatchConfig::default(),
        )
        .unwrap();
        assert_eq!(got, CoercedValue::Choices(vec!["rust".into(), "sql".into()]));
    }

    #[test]
    fn parses_common_source_date_shapes() {
        assert_eq!(
            parse_date("2019-06-01"),
            Some(ParsedDate { year: 2019, month: Some(6), day: Some(1) })
        );
        assert_eq!(
            parse_date("2019-06"),
            Some(ParsedDate { year: 2019, month: Some(6), day: None })
        );
        assert_eq!(
            parse_date("06/2019"),
            Some(ParsedDate { year: 2019, month: Some(6), day: None })
        );
        assert_eq!(
            parse_date("June 2019"),
            Some(ParsedDate { year: 2019, month: Some(6), day: None })
        );
        assert_eq!(
            parse_date("2019"),
            Some(ParsedDate { year: 2019, month: None, day: None })
        );
        assert_eq!(parse_date("sometime"), None);
        assert_eq!(parse_date("2019-13"), None);
    }

    #[test]
    fn native_date_input_gets_full_iso() {
        let f = field(FieldKind::Date);
        let got = coerce(&Date("June 2019".into()), &f, &MatchConfig::default()).unwrap();
        assert_eq!(got, CoercedValue::Text("2019-06-01".into()));
    }

    #[test]
    fn month_input_gets_year_month_without_day() {
        let f = field(FieldKind::Month);
        let got = coerce(&Date("June 2019".into()), &f, &MatchConfig::default()).unwrap();
        assert_eq!(got, CoercedValue::Text("2019-06".into()));
        let got = coerce(&Date("2019-06-15".into()), &f, &MatchConfig::default()).unwrap();
        assert_eq!(got, CoercedValue::Text("2019-06".into()));

        let err = coerce(&Date("2019".into()), &f, &MatchConfig::default()).unwrap_err();
        assert_eq!(err, FieldError::UnknownDateFormat);
    }

    #[test]
    fn placeholder_pattern_drives_text_date_format() {
        let mut f = field(FieldKind::Text);
        f.placeholder = "MM/DD/YYYY".into();
        let got = coerce(&Date("2019-06-15".into()), &f, &MatchConfig::default()).unwrap();
        assert_eq!(got, CoercedValue::Text("06/15/2019".into()));

        f.placeholder = "dd/mm/yyyy".into();
        let got = coerce(&Date("2019-06-15".into()), &f, &MatchConfig::default()).unwrap();
        assert_eq!(got, CoercedValue::Text("15/06/2019".into()));
    }

    #[test]
    fn year_label_reduces_to_year() {
        let mut f = field(FieldKind::Text);
        f.label = "Graduation year".into();
        let got = coerce(&Date("2019-06".into()), &f, &MatchConfig::default()).unwrap();
        assert_eq!(got, CoercedValue::Text("2019".into()));
    }

    #[test]
    fn iso_fallback_keeps_source_precision() {
        let f = field(FieldKind::Text);
        let got = coerce(&Date("06/2019".into()), &f, &MatchConfig::default()).unwrap();
        assert_eq!(got, CoercedValue::Text("2019-06".into()));
    }

    #[test]
    fn month_pattern_without_month_component_fails() {
        let mut f = field(FieldKind::Text);
        f.placeholder = "MM/YYYY".into();
        let err = coerce(&Date("2019".into()), &f, &MatchConfig::default()).unwrap_err();
        assert_eq!(err, FieldError::UnknownDateFormat);
    }

    #[test]
    fn garbage_date_is_incoercible() {
        let f = field(FieldKind::Date);
        let err = coerce(&Date("whenever".into()), &f, &MatchConfig::default()).unwrap_err();
        assert!(matches!(err, FieldError::IncoercibleValue { .. }));
    }
}
