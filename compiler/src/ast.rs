//! The syntax tree produced by the parser and consumed by the lowering
//! passes.
//!
//! The tree stays close to pattern syntax: repetition ranges, non-capturing
//! groups and adjacent subexpressions survive parsing untouched and are
//! normalized away by simplification before instruction emission.

/// A parsed subpattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Ast {
    /// The empty pattern, also the body of `()` and of a bare alternation
    /// arm as in `a|`.
    Empty,
    /// A single literal character.
    Char(char),
    /// A run of literal characters in sequence. The parser never produces
    /// this node; simplification folds adjacent `Char`s into it.
    Literal(String),
    /// `.`, any character except a line feed.
    AnyChar,
    /// A bracket expression or a class escape such as `\d`.
    Class(ClassSet),
    /// A zero-width assertion.
    Assertion(AssertionKind),
    /// Two or more subpatterns in sequence.
    Concat(Vec<Ast>),
    /// Two or more subpatterns joined by `|`, in priority order.
    Alternation(Vec<Ast>),
    /// A parenthesized subpattern.
    Group {
        kind: GroupKind,
        inner: Box<Ast>,
    },
    /// A quantified subpattern.
    Repetition {
        kind: RepetitionKind,
        /// Prefer the fewest repetitions, per a trailing `?`.
        lazy: bool,
        inner: Box<Ast>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupKind {
    /// `(...)`, capturing into the 1-based slot assigned in source order.
    Capturing { slot: usize },
    /// `(?:...)`, grouping only.
    NonCapturing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssertionKind {
    /// `^`. Anchors to line starts under multiline options, otherwise to
    /// the start of input.
    StartOfLine,
    /// `$`. Anchors to line ends under multiline options, otherwise to the
    /// end of input.
    EndOfLine,
    /// `\A`.
    StartOfInput,
    /// `\z`.
    EndOfInput,
    /// `\b`.
    WordBoundary,
    /// `\B`.
    NonWordBoundary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepetitionKind {
    /// `?`
    ZeroOrOne,
    /// `*`
    ZeroOrMore,
    /// `+`
    OneOrMore,
    /// `{m}`, `{m,}` or `{m,n}`; `{m}` carries an upper bound equal to its
    /// lower bound and `{m,}` carries none.
    Range {
        lower: usize,
        upper: Option<usize>,
    },
}

/// The contents of a bracket expression, or of a class escape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassSet {
    pub negated: bool,
    pub items: Vec<ClassItem>,
}

impl ClassSet {
    pub fn new(negated: bool, items: Vec<ClassItem>) -> Self {
        Self { negated, items }
    }

    /// The positive form of a class, `[...]`.
    pub fn positive(items: Vec<ClassItem>) -> Self {
        Self::new(false, items)
    }

    /// The negated form of a class, `[^...]`.
    pub fn negative(items: Vec<ClassItem>) -> Self {
        Self::new(true, items)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ClassItem {
    Char(char),
    Range(char, char),
}

/// The class escapes, shared between top-level position and bracket
/// expressions.
pub(crate) fn digit_items() -> Vec<ClassItem> {
    vec![ClassItem::Range('0', '9')]
}

pub(crate) fn word_items() -> Vec<ClassItem> {
    vec![
        ClassItem::Range('0', '9'),
        ClassItem::Range('A', 'Z'),
        ClassItem::Char('_'),
        ClassItem::Range('a', 'z'),
    ]
}

pub(crate) fn space_items() -> Vec<ClassItem> {
    vec![
        ClassItem::Char('\t'),
        ClassItem::Char('\n'),
        ClassItem::Char('\u{b}'),
        ClassItem::Char('\u{c}'),
        ClassItem::Char('\r'),
        ClassItem::Char(' '),
    ]
}
