//! Normalization between parsing and instruction emission.
//!
//! Simplification rewrites the tree into the small shape the emitter
//! handles: counted repetitions become copies plus `?`/`*` chains,
//! non-capturing groups dissolve, nested sequences flatten and bracket
//! expressions collapse to sorted non-overlapping ranges.
//!
//! Counted repetitions multiply, so the expanded size is bounded *before*
//! any expansion happens. A pattern like `a{50000}{50000}` is rejected by
//! arithmetic alone rather than by attempting to build its tree.

use crate::ast::{Ast, ClassItem, ClassSet, GroupKind, RepetitionKind};
use crate::error::CompileError;

/// Normalizes a parsed tree, or fails with
/// [`CompileError::PatternTooLarge`] if the tree would expand past
/// `instruction_limit` instructions.
pub fn simplify(ast: Ast, instruction_limit: usize) -> Result<Ast, CompileError> {
    if expanded_cost(&ast) > instruction_limit as u64 {
        return Err(CompileError::PatternTooLarge);
    }

    Ok(normalize(ast))
}

/// A saturating over-approximation of the instruction count the tree
/// expands to.
fn expanded_cost(ast: &Ast) -> u64 {
    match ast {
        Ast::Empty => 0,
        Ast::Char(_) | Ast::AnyChar | Ast::Class(_) | Ast::Assertion(_) => 1,
        Ast::Literal(run) => run.chars().count() as u64,
        Ast::Concat(items) => items
            .iter()
            .fold(0u64, |acc, item| acc.saturating_add(expanded_cost(item))),
        Ast::Alternation(arms) => arms.iter().fold(0u64, |acc, arm| {
            acc.saturating_add(expanded_cost(arm)).saturating_add(2)
        }),
        Ast::Group { inner, .. } => expanded_cost(inner).saturating_add(2),
        Ast::Repetition { kind, inner, .. } => {
            let per_copy = expanded_cost(inner).saturating_add(2);
            let copies = match *kind {
                RepetitionKind::ZeroOrOne
                | RepetitionKind::ZeroOrMore
                | RepetitionKind::OneOrMore => 1,
                RepetitionKind::Range { lower, upper } => {
                    upper.unwrap_or(lower.saturating_add(1)).max(1) as u64
                }
            };
            per_copy.saturating_mul(copies)
        }
    }
}

fn normalize(ast: Ast) -> Ast {
    match ast {
        Ast::Empty | Ast::Char(_) | Ast::Literal(_) | Ast::AnyChar | Ast::Assertion(_) => ast,
        Ast::Class(set) => Ast::Class(normalize_class(set)),
        Ast::Concat(items) => concat(items.into_iter().map(normalize).collect()),
        Ast::Alternation(arms) => {
            let mut flat = vec![];
            for arm in arms.into_iter().map(normalize) {
                match arm {
                    Ast::Alternation(nested) => flat.extend(nested),
                    arm => flat.push(arm),
                }
            }
            Ast::Alternation(flat)
        }
        Ast::Group { kind, inner } => {
            let inner = normalize(*inner);
            match kind {
                GroupKind::NonCapturing => inner,
                GroupKind::Capturing { .. } => Ast::Group {
                    kind,
                    inner: Box::new(inner),
                },
            }
        }
        Ast::Repetition { kind, lazy, inner } => {
            let inner = normalize(*inner);
            if matches!(inner, Ast::Empty) {
                return Ast::Empty;
            }

            match kind {
                RepetitionKind::ZeroOrOne
                | RepetitionKind::ZeroOrMore
                | RepetitionKind::OneOrMore => Ast::Repetition {
                    kind,
                    lazy,
                    inner: Box::new(inner),
                },
                RepetitionKind::Range { lower, upper } => {
                    expand_counted(inner, lower, upper, lazy)
                }
            }
        }
    }
}

/// Rewrites `x{m,n}` as `m` mandatory copies followed by a nest of
/// optional tails, and `x{m,}` as `m` copies and a star. Capture slots
/// inside a duplicated subtree repeat verbatim, so a group inside a
/// counted repetition reports its final iteration, the same answer the
/// un-expanded loop would give.
pub(crate) fn expand_counted(inner: Ast, lower: usize, upper: Option<usize>, lazy: bool) -> Ast {
    let mut items: Vec<Ast> = std::iter::repeat_with(|| inner.clone())
        .take(lower)
        .collect();

    match upper {
        None => items.push(Ast::Repetition {
            kind: RepetitionKind::ZeroOrMore,
            lazy,
            inner: Box::new(inner),
        }),
        Some(upper) => {
            // innermost-first: x{0,2} is (x(x)?)?
            let mut tail = Ast::Empty;
            for _ in lower..upper {
                tail = Ast::Repetition {
                    kind: RepetitionKind::ZeroOrOne,
                    lazy,
                    inner: Box::new(concat(vec![inner.clone(), tail])),
                };
            }
            items.push(tail);
        }
    }

    concat(items)
}

/// Builds a sequence node: splices nested sequences, drops empties and
/// folds adjacent literal characters into runs.
fn concat(items: Vec<Ast>) -> Ast {
    let mut flat = vec![];
    for item in items {
        match item {
            Ast::Concat(nested) => {
                for nested_item in nested {
                    push_folding(&mut flat, nested_item);
                }
            }
            item => push_folding(&mut flat, item),
        }
    }

    match flat.len() {
        0 => Ast::Empty,
        1 => flat.pop().unwrap_or(Ast::Empty),
        _ => Ast::Concat(flat),
    }
}

fn push_folding(flat: &mut Vec<Ast>, item: Ast) {
    let suffix = match item {
        Ast::Empty => return,
        Ast::Char(c) => c.to_string(),
        Ast::Literal(run) => run,
        item => {
            flat.push(item);
            return;
        }
    };

    match flat.last_mut() {
        Some(Ast::Literal(run)) => run.push_str(&suffix),
        Some(Ast::Char(prev)) => {
            let run = format!("{}{}", prev, suffix);
            flat.pop();
            flat.push(Ast::Literal(run));
        }
        _ => flat.push(if suffix.chars().nth(1).is_some() {
            Ast::Literal(suffix)
        } else {
            match suffix.chars().next() {
                Some(c) => Ast::Char(c),
                None => return,
            }
        }),
    }
}

/// Collapses class items to sorted, non-overlapping, non-adjacent ranges.
fn normalize_class(set: ClassSet) -> ClassSet {
    let mut bounds: Vec<(u32, u32)> = set
        .items
        .iter()
        .map(|item| match *item {
            ClassItem::Char(c) => (c as u32, c as u32),
            ClassItem::Range(lo, hi) => (lo as u32, hi as u32),
        })
        .collect();
    bounds.sort_unstable();

    let mut merged: Vec<(u32, u32)> = vec![];
    for (lo, hi) in bounds {
        match merged.last_mut() {
            Some((_, prev_hi)) if lo <= prev_hi.saturating_add(1) => {
                *prev_hi = (*prev_hi).max(hi);
            }
            _ => merged.push((lo, hi)),
        }
    }

    let items = merged
        .into_iter()
        .filter_map(|(lo, hi)| match (char::from_u32(lo), char::from_u32(hi)) {
            (Some(lo), Some(hi)) if lo == hi => Some(ClassItem::Char(lo)),
            (Some(lo), Some(hi)) => Some(ClassItem::Range(lo, hi)),
            _ => None,
        })
        .collect();

    ClassSet::new(set.negated, items)
}
