//! Semantics-preserving filter simplification
//!
//! Single-pass bottom-up rewriting; children are simplified before the rules
//! of their parent are applied.
//!
//! Rewrites:
//! - And(.., And(x, y), ..) → And(.., x, y, ..), likewise for Or
//! - And(.., True, ..) → And(..), Or(.., False, ..) → Or(..)
//! - And(.., False, ..) → False, Or(.., True, ..) → True
//! - And(x, x) → And(x) (duplicates by content key)
//! - And() → True, Or() → False, And(x) → x, Or(x) → x
//! - Not(Not(x)) → x, Not(True) → False, Not(False) → True
//! - IsIn(p, []) → False, IsIn(p, [v]) → IsEqual(p, v)
//!
//! Comparisons under `Not` are left alone: `Not(x > v)` accepts rows where
//! `x` is absent or null, which `x <= v` does not.

use ahash::AHashSet;

use crate::filter::Filter;

impl Filter {
    /// An equivalent, usually smaller, filter
    pub fn simplify(&self) -> Filter {
        match self {
            Filter::And(operands) => simplify_composite(true, operands),
            Filter::Or(operands) => simplify_composite(false, operands),
            Filter::Not(inner) => match inner.simplify() {
                Filter::True => Filter::False,
                Filter::False => Filter::True,
                other => Filter::not(other),
            },
            Filter::IsIn(is_in) if is_in.values().is_empty() => Filter::False,
            Filter::IsIn(is_in) => is_in.as_equality().unwrap_or_else(|| self.clone()),
            _ => self.clone(),
        }
    }
}

fn simplify_composite(conjunction: bool, operands: &[Filter]) -> Filter {
    let (neutral, dominant) = if conjunction {
        (Filter::True, Filter::False)
    } else {
        (Filter::False, Filter::True)
    };

    let mut seen = AHashSet::new();
    let mut terms = Vec::with_capacity(operands.len());

    for operand in operands {
        let simplified = operand.simplify();
        let flattened = match (conjunction, &simplified) {
            (true, Filter::And(inner)) | (false, Filter::Or(inner)) => inner.to_vec(),
            _ => vec![simplified],
        };

        for term in flattened {
            if term == neutral {
                continue;
            }
            if term == dominant {
                return dominant;
            }
            if seen.insert(term.content_key()) {
                terms.push(term);
            }
        }
    }

    match terms.len() {
        0 => neutral,
        1 => terms.remove(0),
        _ if conjunction => Filter::and_all(terms),
        _ => Filter::or_all(terms),
    }
}
