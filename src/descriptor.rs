use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::profile::SemanticType;

/// Classified control kind of a fillable form element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FieldKind {
    Text,
    Email,
    Tel,
    Textarea,
    Date,
    Month,
    SingleSelect,
    MultiSelect,
    Checkbox,
    RadioGroup,
}

impl FieldKind {
    pub fn is_choice(self) -> bool {
        matches!(
            self,
            FieldKind::SingleSelect | FieldKind::MultiSelect | FieldKind::RadioGroup
        )
    }

    /// Type-compatibility veto: can a value of this semantic shape land in a
    /// field of this kind at all? A structural mismatch forces the match
    /// score to zero no matter how well the text matched.
    pub fn accepts(self, semantic: SemanticType) -> bool {
        use SemanticType::*;
        match self {
            FieldKind::Text => matches!(semantic, FreeText | Email | Phone | Date | TagList),
            FieldKind::Email => semantic == Email,
            FieldKind::Tel => semantic == Phone,
            FieldKind::Textarea => matches!(semantic, FreeText | LongText | TagList),
            FieldKind::Date | FieldKind::Month => semantic == Date,
            FieldKind::SingleSelect | FieldKind::RadioGroup => semantic == FreeText,
            FieldKind::MultiSelect => semantic == TagList,
            // A lone checkbox carries no profile-mappable semantics.
            FieldKind::Checkbox => false,
        }
    }
}

impl std::fmt::Display for FieldKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            FieldKind::Text => "text",
            FieldKind::Email => "email",
            FieldKind::Tel => "tel",
            FieldKind::Textarea => "textarea",
            FieldKind::Date => "date",
            FieldKind::Month => "month",
            FieldKind::SingleSelect => "singleSelect",
            FieldKind::MultiSelect => "multiSelect",
            FieldKind::Checkbox => "checkbox",
            FieldKind::RadioGroup => "radioGroup",
        };
        f.write_str(s)
    }
}

/// One selectable option of a choice-kind field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChoiceOption {
    pub value: String,
    pub display_text: String,
}

/// Normalized description of one fillable form element, created fresh per
/// extraction pass and never mutated.
///
/// `id` is the value of the `data-autoform-id` attribute the extractor stamps
/// onto the element; it stays addressable even when the element has no name
/// or DOM id of its own. For grouped controls (radio groups, checkbox
/// groups) it addresses the first member.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDescriptor {
    pub id: String,
    pub kind: FieldKind,
    pub tag: String,
    pub label: String,
    pub placeholder: String,
    pub name: String,
    pub dom_id: String,
    pub required: bool,
    pub max_length: Option<u32>,
    pub options: Vec<ChoiceOption>,
}

/// Raw per-element record returned by the in-page extraction routine, before
/// classification and grouping.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub(crate) struct RawField {
    pub tag: String,
    pub r#type: String,
    pub name: String,
    pub id: String,
    pub autoform_id: String,
    pub value: String,
    pub placeholder: String,
    pub aria_label: String,
    pub label: String,
    pub preceding_text: String,
    pub required: bool,
    pub disabled: bool,
    pub hidden: bool,
    /// True when the extraction pass stamped the element for the first time,
    /// i.e. any pre-existing value was put there by the page, not by us.
    pub first_seen: bool,
    pub checked: bool,
    pub multiple: bool,
    pub max_length: i64,
    pub options: Vec<RawOption>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub(crate) struct RawOption {
    pub value: String,
    pub text: String,
}

impl RawField {
    /// Label resolution cascade: explicit caption, aria-label, placeholder,
    /// nearest preceding text within the same visual group.
    fn resolved_label(&self) -> String {
        for candidate in [&self.label, &self.aria_label, &self.placeholder, &self.preceding_text] {
            let trimmed = candidate.trim();
            if !trimmed.is_empty() {
                return trimmed.to_string();
            }
        }
        String::new()
    }

    fn token_haystack(&self) -> String {
        format!("{} {} {}", self.name, self.id, self.placeholder).to_lowercase()
    }
}

/// Classify one raw record. `None` means the element is not fillable
/// (buttons, hidden inputs, unsupported types).
fn classify_kind(raw: &RawField) -> Option<FieldKind> {
    match raw.tag.as_str() {
        "textarea" => Some(FieldKind::Textarea),
        "select" => Some(if raw.multiple {
            FieldKind::MultiSelect
        } else {
            FieldKind::SingleSelect
        }),
        "input" => match raw.r#type.as_str() {
            "email" => Some(FieldKind::Email),
            "tel" => Some(FieldKind::Tel),
            "date" => Some(FieldKind::Date),
            // Month controls reject a day component, so they keep their own
            // kind and get a year-month rendering.
            "month" => Some(FieldKind::Month),
            "checkbox" => Some(FieldKind::Checkbox),
            "radio" => Some(FieldKind::RadioGroup),
            "hidden" | "submit" | "button" | "reset" | "image" | "file" | "password" => None,
            // Generic text input: fall back to token heuristics over
            // name/id/placeholder before settling on plain text. Tokens are
            // matched by prefix, not raw substring ("hotel" must not read as
            // a tel field, but "telephone" and "birthdate" still qualify).
            _ => {
                let hay = raw.token_haystack();
                let tokens: Vec<&str> = hay
                    .split(|c: char| !c.is_alphanumeric())
                    .filter(|t| !t.is_empty())
                    .collect();
                let has = |needles: &[&str]| {
                    tokens.iter().any(|t| needles.iter().any(|n| t.starts_with(n)))
                };
                if has(&["email", "mail"]) {
                    Some(FieldKind::Email)
                } else if has(&["phone", "mobile", "tel"]) {
                    Some(FieldKind::Tel)
                } else if has(&["date", "dob", "birth"]) {
                    Some(FieldKind::Date)
                } else {
                    Some(FieldKind::Text)
                }
            }
        },
        _ => None,
    }
}

/// Turn the raw extraction records into descriptors: filter out hidden,
/// disabled and page-prefilled elements, classify kinds, and collapse
/// same-name radios and checkboxes into one grouped descriptor each,
/// preserving document order throughout.
pub(crate) fn build_descriptors(raws: Vec<RawField>) -> Vec<FieldDescriptor> {
    let mut descriptors: Vec<FieldDescriptor> = Vec::new();

    // Radio groups with a page-made default selection count as already
    // populated, same as prefilled text inputs. A member checked behind our
    // own stamp (first_seen = false) is ours and keeps the group fillable.
    let preselected: HashSet<&str> = raws
        .iter()
        .filter(|r| {
            r.tag == "input" && r.r#type == "radio" && r.first_seen && r.checked && !r.name.is_empty()
        })
        .map(|r| r.name.as_str())
        .collect();

    for raw in &raws {
        if raw.hidden || raw.disabled {
            continue;
        }
        let Some(kind) = classify_kind(raw) else {
            continue;
        };

        match kind {
            FieldKind::RadioGroup | FieldKind::Checkbox if !raw.name.is_empty() => {
                if kind == FieldKind::RadioGroup && preselected.contains(raw.name.as_str()) {
                    continue;
                }
                let member_option = ChoiceOption {
                    value: raw.value.clone(),
                    display_text: raw.resolved_label(),
                };
                // Later members of an already-seen group only contribute
                // their option.
                if let Some(group) = descriptors
                    .iter_mut()
                    .find(|d| d.tag == "input" && d.kind.is_choice_input(kind) && d.name == raw.name)
                {
                    group.options.push(member_option);
                    // Two or more same-name checkboxes act as a multi-value
                    // control rather than a lone toggle.
                    if kind == FieldKind::Checkbox {
                        group.kind = FieldKind::MultiSelect;
                    }
                    continue;
                }
                descriptors.push(FieldDescriptor {
                    id: raw.autoform_id.clone(),
                    kind,
                    tag: raw.tag.clone(),
                    // The group caption is rarely an explicit <label>; the
                    // nearest preceding text is the best group-level signal.
                    label: if raw.preceding_text.trim().is_empty() {
                        raw.resolved_label()
                    } else {
                        raw.preceding_text.trim().to_string()
                    },
                    placeholder: String::new(),
                    name: raw.name.clone(),
                    dom_id: raw.id.clone(),
                    required: raw.required,
                    max_length: None,
                    options: vec![member_option],
                });
            }
            FieldKind::Checkbox => {
                if raw.first_seen && raw.checked {
                    continue; // pre-checked by the page
                }
                descriptors.push(plain_descriptor(raw, kind));
            }
            FieldKind::SingleSelect | FieldKind::MultiSelect => {
                descriptors.push(FieldDescriptor {
                    options: raw
                        .options
                        .iter()
                        .map(|o| ChoiceOption {
                            value: o.value.clone(),
                            display_text: o.text.trim().to_string(),
                        })
                        .collect(),
                    ..plain_descriptor(raw, kind)
                });
            }
            _ => {
                // Text-like: skip values the page itself put there.
                if raw.first_seen && !raw.value.trim().is_empty() {
                    continue;
                }
                descriptors.push(plain_descriptor(raw, kind));
            }
        }
    }

    descriptors
}

fn plain_descriptor(raw: &RawField, kind: FieldKind) -> FieldDescriptor {
    FieldDescriptor {
        id: raw.autoform_id.clone(),
        kind,
        tag: raw.tag.clone(),
        label: raw.resolved_label(),
        placeholder: raw.placeholder.trim().to_string(),
        name: raw.name.clone(),
        dom_id: raw.id.clone(),
        required: raw.required,
        max_length: (raw.max_length > 0).then_some(raw.max_length as u32),
        options: Vec::new(),
    }
}

impl FieldKind {
    /// Whether an existing grouped descriptor can absorb another raw member
    /// of the given input kind. Checkbox groups get promoted to MultiSelect
    /// on their second member, so both spellings must match.
    fn is_choice_input(self, member: FieldKind) -> bool {
        match member {
            FieldKind::RadioGroup => self == FieldKind::RadioGroup,
            FieldKind::Checkbox => matches!(self, FieldKind::Checkbox | FieldKind::MultiSelect),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(tag: &str, ty: &str, name: &str) -> RawField {
        RawField {
            tag: tag.into(),
            r#type: ty.into(),
            name: name.into(),
            autoform_id: format!("af-{name}"),
            first_seen: true,
            max_length: -1,
            ..RawField::default()
        }
    }

    #[test]
    fn classifies_semantic_type_attribute_first() {
        assert_eq!(classify_kind(&raw("input", "email", "x")), Some(FieldKind::Email));
        assert_eq!(classify_kind(&raw("input", "tel", "x")), Some(FieldKind::Tel));
        assert_eq!(classify_kind(&raw("input", "date", "x")), Some(FieldKind::Date));
        assert_eq!(classify_kind(&raw("input", "month", "x")), Some(FieldKind::Month));
        assert_eq!(classify_kind(&raw("textarea", "", "x")), Some(FieldKind::Textarea));
    }

    #[test]
    fn generic_text_falls_back_to_token_heuristics() {
        assert_eq!(
            classify_kind(&raw("input", "text", "contact_email")),
            Some(FieldKind::Email)
        );
        assert_eq!(
            classify_kind(&raw("input", "text", "mobile_number")),
            Some(FieldKind::Tel)
        );
        assert_eq!(classify_kind(&raw("input", "text", "city")), Some(FieldKind::Text));
    }

    #[test]
    fn kind_tokens_match_on_word_prefixes_only() {
        assert_eq!(classify_kind(&raw("input", "text", "hotel")), Some(FieldKind::Text));
        assert_eq!(classify_kind(&raw("input", "text", "candidate_id")), Some(FieldKind::Text));
        assert_eq!(classify_kind(&raw("input", "text", "telephone")), Some(FieldKind::Tel));
        assert_eq!(classify_kind(&raw("input", "text", "birthdate")), Some(FieldKind::Date));
    }

    #[test]
    fn buttons_and_hidden_inputs_are_not_fillable() {
        for ty in ["submit", "button", "hidden", "file", "password"] {
            assert_eq!(classify_kind(&raw("input", ty, "x")), None, "type={ty}");
        }
    }

    #[test]
    fn label_cascade_prefers_explicit_caption() {
        let mut r = raw("input", "text", "x");
        r.label = "Full Name".into();
        r.aria_label = "aria".into();
        r.placeholder = "ph".into();
        assert_eq!(r.resolved_label(), "Full Name");
        r.label.clear();
        assert_eq!(r.resolved_label(), "aria");
        r.aria_label.clear();
        assert_eq!(r.resolved_label(), "ph");
        r.placeholder.clear();
        r.preceding_text = "Nearby text".into();
        assert_eq!(r.resolved_label(), "Nearby text");
    }

    #[test]
    fn hidden_and_disabled_elements_are_excluded() {
        let mut hidden = raw("input", "text", "a");
        hidden.hidden = true;
        let mut disabled = raw("input", "text", "b");
        disabled.disabled = true;
        assert!(build_descriptors(vec![hidden, disabled]).is_empty());
    }

    #[test]
    fn page_prefilled_text_inputs_are_excluded() {
        let mut prefilled = raw("input", "text", "a");
        prefilled.value = "set by page".into();
        // A value behind our own stamp (first_seen = false) survives.
        let mut ours = raw("input", "text", "b");
        ours.value = "set by us".into();
        ours.first_seen = false;
        let descriptors = build_descriptors(vec![prefilled, ours]);
        assert_eq!(descriptors.len(), 1);
        assert_eq!(descriptors[0].name, "b");
    }

    #[test]
    fn same_name_radios_collapse_into_one_group() {
        let mut a = raw("input", "radio", "color");
        a.value = "red".into();
        a.label = "Red".into();
        a.preceding_text = "Favorite color".into();
        let mut b = raw("input", "radio", "color");
        b.value = "blue".into();
        b.label = "Blue".into();
        b.autoform_id = "af-color-2".into();

        let descriptors = build_descriptors(vec![a, b]);
        assert_eq!(descriptors.len(), 1);
        let group = &descriptors[0];
        assert_eq!(group.kind, FieldKind::RadioGroup);
        assert_eq!(group.label, "Favorite color");
        assert_eq!(group.options.len(), 2);
        assert_eq!(group.options[1].value, "blue");
    }

    #[test]
    fn page_preselected_radio_groups_are_excluded() {
        let mut a = raw("input", "radio", "color");
        a.value = "red".into();
        let mut b = raw("input", "radio", "color");
        b.value = "blue".into();
        b.autoform_id = "af-color-2".into();
        b.checked = true;

        assert!(build_descriptors(vec![a.clone(), b.clone()]).is_empty());

        // A selection behind our own stamp is ours, not the page's, so the
        // group stays fillable on re-extraction.
        a.first_seen = false;
        b.first_seen = false;
        let descriptors = build_descriptors(vec![a, b]);
        assert_eq!(descriptors.len(), 1);
        assert_eq!(descriptors[0].kind, FieldKind::RadioGroup);
    }

    #[test]
    fn same_name_checkboxes_become_multi_select() {
        let mut a = raw("input", "checkbox", "skills");
        a.value = "rust".into();
        a.label = "Rust".into();
        let mut b = raw("input", "checkbox", "skills");
        b.value = "sql".into();
        b.label = "SQL".into();
        b.autoform_id = "af-skills-2".into();

        let descriptors = build_descriptors(vec![a, b]);
        assert_eq!(descriptors.len(), 1);
        assert_eq!(descriptors[0].kind, FieldKind::MultiSelect);
        assert_eq!(descriptors[0].options.len(), 2);
    }

    #[test]
    fn select_options_are_carried_over() {
        let mut sel = raw("select", "", "degree");
        sel.options = vec![
            RawOption { value: "bs".into(), text: "Bachelor's".into() },
            RawOption { value: "ms".into(), text: "Master's".into() },
        ];
        let descriptors = build_descriptors(vec![sel]);
        assert_eq!(descriptors[0].kind, FieldKind::SingleSelect);
        assert_eq!(descriptors[0].options[0].value, "bs");
    }

    #[test]
    fn type_veto_rejects_structural_mismatches() {
        use crate::profile::SemanticType::*;
        assert!(!FieldKind::Checkbox.accepts(Date));
        assert!(!FieldKind::Email.accepts(Phone));
        assert!(!FieldKind::Date.accepts(FreeText));
        assert!(FieldKind::Text.accepts(Date));
        assert!(FieldKind::MultiSelect.accepts(TagList));
        assert!(!FieldKind::SingleSelect.accepts(TagList));
    }
}
