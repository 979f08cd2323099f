//! Fuzzy tag repair.
//!
//! Model output regularly misspells or re-cases element names. Repair maps
//! each unknown tag name to the unique vocabulary entry within a small edit
//! distance, and separately recovers markup cut off mid-stream.

use std::sync::LazyLock;

use regex::{Captures, Regex};
use serde::Serialize;
use tracing::debug;

use crate::domain::vocabulary::{self, ELEMENTS};

/// Largest edit distance at which a tag name is corrected.
pub const MAX_REPAIR_DISTANCE: usize = 2;

static TAG_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<(/?)([A-Za-z][A-Za-z0-9_:.-]*)").expect("tag name pattern is valid")
});

static TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<(/?)([A-Za-z][A-Za-z0-9_:.-]*)[^<>]*?(/?)>").expect("tag pattern is valid")
});

/// One tag name rewritten by repair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Correction {
    /// Name as written by the model.
    pub from: String,
    /// Vocabulary entry it was mapped to.
    pub to: &'static str,
}

/// Markup after tag-name repair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Repaired {
    /// The rewritten markup.
    pub markup: String,
    /// Every rewrite performed, in document order.
    pub corrections: Vec<Correction>,
}

/// Unit-cost Levenshtein distance over Unicode scalar values.
#[must_use]
pub fn edit_distance(a: &str, b: &str) -> usize {
    let b: Vec<char> = b.chars().collect();
    let mut previous: Vec<usize> = (0..=b.len()).collect();
    let mut current = vec![0; b.len() + 1];

    for (i, ca) in a.chars().enumerate() {
        current[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let substitute = previous[j] + usize::from(ca != *cb);
            current[j + 1] = substitute.min(previous[j + 1] + 1).min(current[j] + 1);
        }
        std::mem::swap(&mut previous, &mut current);
    }
    previous[b.len()]
}

/// Returns the vocabulary entry `name` should become, if any.
///
/// Names are compared lower-cased. A name is mapped only when exactly one
/// entry sits at the minimum distance and that distance is at most
/// [`MAX_REPAIR_DISTANCE`].
#[must_use]
pub fn nearest_element(name: &str) -> Option<&'static str> {
    let lowered = name.to_ascii_lowercase();
    let mut best: Option<(&'static str, usize)> = None;
    let mut tied = false;

    for &candidate in ELEMENTS {
        let distance = edit_distance(&lowered, candidate);
        match best {
            Some((_, d)) if distance == d => tied = true,
            Some((_, d)) if distance > d => {}
            _ => {
                best = Some((candidate, distance));
                tied = false;
            }
        }
    }

    match best {
        Some((candidate, distance)) if distance <= MAX_REPAIR_DISTANCE && !tied => Some(candidate),
        _ => None,
    }
}

/// Rewrites every opening and closing tag name outside the vocabulary to its
/// nearest entry. Known names and names with no close match are untouched, so
/// already-valid markup comes back byte-identical.
#[must_use]
pub fn repair_tag_names(markup: &str) -> Repaired {
    let mut corrections = Vec::new();
    let rewritten = TAG_NAME.replace_all(markup, |caps: &Captures<'_>| {
        let slash = &caps[1];
        let name = &caps[2];
        if vocabulary::is_known(name) {
            return caps[0].to_owned();
        }
        match nearest_element(name) {
            Some(replacement) => {
                debug!(from = name, to = replacement, "repairing tag name");
                corrections.push(Correction {
                    from: name.to_owned(),
                    to: replacement,
                });
                format!("<{slash}{replacement}")
            }
            None => caps[0].to_owned(),
        }
    });

    Repaired {
        markup: rewritten.into_owned(),
        corrections,
    }
}

/// Recovers markup that was cut off mid-stream: drops an unterminated
/// trailing tag and closes every element still open at the end, innermost
/// first.
#[must_use]
pub fn recover_truncated(markup: &str) -> String {
    let mut body = markup;
    if let Some(lt) = body.rfind('<')
        && body.rfind('>').is_none_or(|gt| gt < lt)
    {
        body = &body[..lt];
    }

    let mut open: Vec<&str> = Vec::new();
    for caps in TAG.captures_iter(body) {
        let name = caps.get(2).map_or("", |m| m.as_str());
        let closing = !caps[1].is_empty();
        let self_closing = !caps[3].is_empty();
        if closing {
            if let Some(depth) = open.iter().rposition(|n| *n == name) {
                open.truncate(depth);
            }
        } else if !self_closing {
            open.push(name);
        }
    }

    let mut recovered = body.to_owned();
    for name in open.iter().rev() {
        recovered.push_str("</");
        recovered.push_str(name);
        recovered.push('>');
    }
    recovered
}
