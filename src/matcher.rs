use std::collections::HashSet;

use tracing::{debug, trace};

use crate::coerce::{self, CoercedValue};
use crate::config::MatchConfig;
use crate::descriptor::FieldDescriptor;
use crate::error::FieldError;
use crate::profile::{AttributePath, AttributeValue, Profile};

/// A scored, tentative (attribute, descriptor) association. Transient; only
/// the winning candidates survive into the plan.
#[derive(Debug, Clone)]
struct MatchCandidate {
    attr: AttributePath,
    attr_order: usize,
    descriptor: usize,
    score: f32,
    strategy: &'static str,
}

/// The complete mapping for one run: one entry per extracted descriptor plus
/// the profile attributes that found no home.
#[derive(Debug, Clone)]
pub struct FillPlan {
    pub entries: Vec<PlanEntry>,
    pub unassigned: Vec<AttributePath>,
}

#[derive(Debug, Clone)]
pub struct PlanEntry {
    pub descriptor: FieldDescriptor,
    pub action: PlanAction,
}

#[derive(Debug, Clone)]
pub enum PlanAction {
    /// Apply `value`, drawn from `source`.
    Fill { value: CoercedValue, source: AttributePath },
    /// The attribute matched but its value could not be represented in this
    /// field; surfaces as an execution failure in the report.
    Incoercible { source: AttributePath, error: FieldError },
    /// No attribute claimed this field.
    Unmatched,
}

/// Build a fill plan: score every (attribute, descriptor) pair through the
/// strategy cascade, then assign greedily by descending score. Ties break on
/// descriptor document order, then attribute canonical order, so the result
/// is fully deterministic. Greedy-by-score is a deliberate simplification
/// over optimal bipartite matching.
pub fn build_plan(
    profile: &Profile,
    descriptors: &[FieldDescriptor],
    config: &MatchConfig,
) -> FillPlan {
    let attrs = profile.present_attributes();

    let mut candidates: Vec<MatchCandidate> = Vec::new();
    for (attr_order, &attr) in attrs.iter().enumerate() {
        let Some(value) = profile.value_of(attr) else { continue };
        for (descriptor, desc) in descriptors.iter().enumerate() {
            if let Some((score, strategy)) = score_pair(attr, &value, desc, config) {
                trace!(%attr, field = %desc.id, score, strategy, "match candidate");
                candidates.push(MatchCandidate { attr, attr_order, descriptor, score, strategy });
            }
        }
    }

    candidates.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then(a.descriptor.cmp(&b.descriptor))
            .then(a.attr_order.cmp(&b.attr_order))
    });

    let mut assigned: Vec<Option<AttributePath>> = vec![None; descriptors.len()];
    let mut used_attrs: HashSet<AttributePath> = HashSet::new();
    for c in &candidates {
        if assigned[c.descriptor].is_some() || used_attrs.contains(&c.attr) {
            continue;
        }
        debug!(
            attr = %c.attr,
            field = %descriptors[c.descriptor].id,
            label = %descriptors[c.descriptor].label,
            score = c.score,
            strategy = c.strategy,
            "assigned"
        );
        assigned[c.descriptor] = Some(c.attr);
        used_attrs.insert(c.attr);
    }

    let entries = descriptors
        .iter()
        .zip(&assigned)
        .map(|(desc, slot)| {
            let action = match slot {
                Some(attr) => {
                    // present_attributes guarantees the value resolves
                    let value = profile.value_of(*attr).unwrap_or(AttributeValue::Text(String::new()));
                    match coerce::coerce(&value, desc, config) {
                        Ok(coerced) => PlanAction::Fill { value: coerced, source: *attr },
                        Err(error) => {
                            debug!(attr = %attr, field = %desc.id, %error, "coercion failed");
                            PlanAction::Incoercible { source: *attr, error }
                        }
                    }
                }
                None => PlanAction::Unmatched,
            };
            PlanEntry { descriptor: desc.clone(), action }
        })
        .collect();

    let unassigned = attrs.into_iter().filter(|a| !used_attrs.contains(a)).collect();

    FillPlan { entries, unassigned }
}

/// Ordered strategy cascade for one (attribute, descriptor) pair. Returns
/// the first strategy with an opinion, or `None` when nothing qualifies.
fn score_pair(
    attr: AttributePath,
    value: &AttributeValue,
    desc: &FieldDescriptor,
    config: &MatchConfig,
) -> Option<(f32, &'static str)> {
    // Structural veto comes before any text signal.
    if !desc.kind.accepts(attr.semantic_type()) {
        return None;
    }

    let aliases = config.aliases.aliases(attr);
    let scored = exact_name_score(desc, aliases)
        .map(|s| (s, "exact-name"))
        .or_else(|| {
            let s = best_similarity(&desc.label, aliases);
            (s >= config.label_floor).then_some((s, "label"))
        })
        .or_else(|| {
            let s = best_similarity(&desc.placeholder, aliases);
            (s >= config.label_floor).then_some((s.min(config.placeholder_ceiling), "placeholder"))
        })?;

    // Choice fields additionally need at least one option compatible with
    // the attribute's value domain, or an unrelated select would get
    // corrupted by a lucky label match.
    if desc.kind.is_choice() && coerce::best_option_score(value, &desc.options) < config.option_floor
    {
        return None;
    }

    Some(scored)
}

fn exact_name_score(desc: &FieldDescriptor, aliases: &[String]) -> Option<f32> {
    let name = normalize(&desc.name);
    let dom_id = normalize(&desc.dom_id);
    aliases
        .iter()
        .any(|a| {
            let a = normalize(a);
            !a.is_empty() && (name == a || dom_id == a)
        })
        .then_some(1.0)
}

fn best_similarity(text: &str, aliases: &[String]) -> f32 {
    aliases
        .iter()
        .map(|a| similarity(text, a))
        .fold(0.0, f32::max)
}

/// Lowercase, drop apostrophes, map remaining punctuation to spaces,
/// collapse whitespace.
pub(crate) fn normalize(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut last_space = true;
    for ch in s.chars() {
        if ch == '\'' || ch == '\u{2019}' {
            continue;
        }
        if ch.is_alphanumeric() {
            out.extend(ch.to_lowercase());
            last_space = false;
        } else if !last_space {
            out.push(' ');
            last_space = true;
        }
    }
    while out.ends_with(' ') {
        out.pop();
    }
    out
}

/// Similarity in [0,1] between two short texts: exact (1.0), word-boundary
/// containment (0.85), then the better of whole-string edit distance and
/// per-token fuzzy overlap.
pub(crate) fn similarity(a: &str, b: &str) -> f32 {
    let na = normalize(a);
    let nb = normalize(b);
    if na.is_empty() || nb.is_empty() {
        return 0.0;
    }
    if na == nb {
        return 1.0;
    }
    let mut best: f32 = if contains_words(&na, &nb) || contains_words(&nb, &na) {
        0.85
    } else {
        0.0
    };
    best = best.max(strsim::normalized_levenshtein(&na, &nb) as f32);
    best.max(token_similarity(&na, &nb))
}

/// Does `hay` contain `needle` as a contiguous word sequence? Plain
/// substring containment is too loose ("tel" inside "hotel").
fn contains_words(hay: &str, needle: &str) -> bool {
    let hay: Vec<&str> = hay.split(' ').collect();
    let needle: Vec<&str> = needle.split(' ').collect();
    if needle.is_empty() || needle.len() > hay.len() {
        return false;
    }
    hay.windows(needle.len()).any(|w| w == needle.as_slice())
}

/// Average best-per-token Jaro-Winkler of the shorter side against the
/// longer, counting only strong (>= 0.85) token matches so near-random
/// token pairs contribute nothing. Capped below exact match.
fn token_similarity(a: &str, b: &str) -> f32 {
    let ta: Vec<&str> = a.split(' ').filter(|t| t.len() >= 2).collect();
    let tb: Vec<&str> = b.split(' ').filter(|t| t.len() >= 2).collect();
    let (short, long) = if ta.len() <= tb.len() { (ta, tb) } else { (tb, ta) };
    if short.is_empty() || long.is_empty() {
        return 0.0;
    }
    let sum: f32 = short
        .iter()
        .map(|s| {
            let best = long
                .iter()
                .map(|l| strsim::jaro_winkler(s, l) as f32)
                .fold(0.0, f32::max);
            if best >= 0.85 {
                best
            } else {
                0.0
            }
        })
        .sum();
    (sum / short.len() as f32) * 0.95
}
