use thiserror::Error;

/// A syntax error, carrying the byte offset into the pattern at which the
/// offending construct begins.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("{kind} at offset {pos}")]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub pos: usize,
}

impl ParseError {
    pub(crate) fn new(kind: ParseErrorKind, pos: usize) -> Self {
        Self { kind, pos }
    }
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ParseErrorKind {
    /// An unclosed `(` or a stray `)`.
    #[error("unbalanced group")]
    UnbalancedGroup,
    /// A malformed or inverted `{m,n}` bound, or a quantifier with nothing
    /// to quantify.
    #[error("invalid repetition range")]
    InvalidRepetitionRange,
    /// A `\` escape the grammar does not define.
    #[error("invalid escape sequence")]
    InvalidEscape,
    /// An unclosed bracket expression or an inverted range within one.
    #[error("invalid character class")]
    InvalidClass,
    /// Syntax the engine deliberately rejects: backreferences, lookaround
    /// and inline flags.
    #[error("unsupported construct")]
    UnsupportedConstruct,
}

/// A lowering failure on a syntactically valid pattern.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum CompileError {
    /// The pattern expands past the configured instruction limit.
    #[error("compiled pattern exceeds the instruction limit")]
    PatternTooLarge,
}

/// Any failure turning a pattern into a runnable program.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Compile(#[from] CompileError),
}
