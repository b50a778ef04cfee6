//! A recursive-descent parser from pattern text to [`Ast`].
//!
//! The grammar is the POSIX-flavored core: alternation, concatenation,
//! greedy and lazy quantifiers including counted ranges, capturing and
//! non-capturing groups, bracket expressions, class escapes and zero-width
//! anchors. Constructs that would break the linear-time guarantee of the
//! runtime, backreferences and lookaround, are rejected at parse time
//! rather than silently mis-handled.

use crate::ast::{
    digit_items, space_items, word_items, AssertionKind, Ast, ClassItem, ClassSet, GroupKind,
    RepetitionKind,
};
use crate::error::{ParseError, ParseErrorKind};

/// Parses a pattern into its syntax tree, assigning capture slots to
/// groups in source order starting at 1.
pub fn parse(pattern: &str) -> Result<Ast, ParseError> {
    let mut parser = Parser::new(pattern);
    let ast = parser.parse_alternation()?;

    match parser.peek() {
        // a stray close paren is the only way input can remain.
        Some(_) => Err(ParseError::new(
            ParseErrorKind::UnbalancedGroup,
            parser.pos,
        )),
        None => Ok(ast),
    }
}

struct Parser<'a> {
    pattern: &'a str,
    /// Byte offset of the next unread character.
    pos: usize,
    /// The next capture slot to hand out; slot 0 belongs to the full match.
    next_slot: usize,
}

impl<'a> Parser<'a> {
    fn new(pattern: &'a str) -> Self {
        Self {
            pattern,
            pos: 0,
            next_slot: 1,
        }
    }

    fn peek(&self) -> Option<char> {
        self.pattern[self.pos..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += ch.len_utf8();
        Some(ch)
    }

    fn eat(&mut self, want: char) -> bool {
        if self.peek() == Some(want) {
            self.pos += want.len_utf8();
            true
        } else {
            false
        }
    }

    fn error(&self, kind: ParseErrorKind, pos: usize) -> ParseError {
        ParseError::new(kind, pos)
    }

    fn parse_alternation(&mut self) -> Result<Ast, ParseError> {
        let mut arms = vec![self.parse_concat()?];
        while self.eat('|') {
            arms.push(self.parse_concat()?);
        }

        if arms.len() == 1 {
            Ok(arms.pop().unwrap_or(Ast::Empty))
        } else {
            Ok(Ast::Alternation(arms))
        }
    }

    fn parse_concat(&mut self) -> Result<Ast, ParseError> {
        let mut items = vec![];
        loop {
            match self.peek() {
                None | Some('|') | Some(')') => break,
                Some(_) => items.push(self.parse_quantified()?),
            }
        }

        match items.len() {
            0 => Ok(Ast::Empty),
            1 => Ok(items.pop().unwrap_or(Ast::Empty)),
            _ => Ok(Ast::Concat(items)),
        }
    }

    /// Parses one atom followed by any number of stacked quantifiers, as in
    /// `a{2}{3}`.
    fn parse_quantified(&mut self) -> Result<Ast, ParseError> {
        let mut node = self.parse_atom()?;

        loop {
            let start = self.pos;
            let kind = match self.peek() {
                Some('?') => {
                    self.bump();
                    RepetitionKind::ZeroOrOne
                }
                Some('*') => {
                    self.bump();
                    RepetitionKind::ZeroOrMore
                }
                Some('+') => {
                    self.bump();
                    RepetitionKind::OneOrMore
                }
                Some('{') => match self.parse_counted_repetition()? {
                    Some(kind) => kind,
                    // not counted-repetition syntax; the brace was a
                    // literal and has not been consumed.
                    None => break,
                },
                _ => break,
            };

            if !quantifiable(&node) {
                return Err(self.error(ParseErrorKind::InvalidRepetitionRange, start));
            }

            let lazy = self.eat('?');
            node = Ast::Repetition {
                kind,
                lazy,
                inner: Box::new(node),
            };
        }

        Ok(node)
    }

    /// Attempts `{m}`, `{m,}` or `{m,n}` with the cursor on the opening
    /// brace. Returns `None` without consuming anything when the brace
    /// does not open counted-repetition syntax, in which case it matches
    /// literally.
    fn parse_counted_repetition(&mut self) -> Result<Option<RepetitionKind>, ParseError> {
        let start = self.pos;
        self.bump();

        if !self.peek().is_some_and(|ch| ch.is_ascii_digit()) {
            self.pos = start;
            return Ok(None);
        }

        let lower = self.parse_decimal(start)?;
        let upper = if self.eat(',') {
            if self.peek().is_some_and(|ch| ch.is_ascii_digit()) {
                Some(self.parse_decimal(start)?)
            } else {
                None
            }
        } else {
            Some(lower)
        };

        if !self.eat('}') {
            return Err(self.error(ParseErrorKind::InvalidRepetitionRange, start));
        }
        if upper.is_some_and(|upper| upper < lower) {
            return Err(self.error(ParseErrorKind::InvalidRepetitionRange, start));
        }

        Ok(Some(RepetitionKind::Range { lower, upper }))
    }

    fn parse_decimal(&mut self, err_pos: usize) -> Result<usize, ParseError> {
        let mut value: usize = 0;
        let mut any = false;

        while let Some(ch) = self.peek() {
            let Some(digit) = ch.to_digit(10) else { break };
            self.bump();
            any = true;
            value = value
                .checked_mul(10)
                .and_then(|v| v.checked_add(digit as usize))
                .ok_or_else(|| self.error(ParseErrorKind::InvalidRepetitionRange, err_pos))?;
        }

        if any {
            Ok(value)
        } else {
            Err(self.error(ParseErrorKind::InvalidRepetitionRange, err_pos))
        }
    }

    fn parse_atom(&mut self) -> Result<Ast, ParseError> {
        let start = self.pos;

        match self.bump() {
            Some('(') => self.parse_group(start),
            Some('[') => self.parse_class(start),
            Some('.') => Ok(Ast::AnyChar),
            Some('^') => Ok(Ast::Assertion(AssertionKind::StartOfLine)),
            Some('$') => Ok(Ast::Assertion(AssertionKind::EndOfLine)),
            Some('\\') => self.parse_escape(start),
            Some('*') | Some('+') | Some('?') => {
                Err(self.error(ParseErrorKind::InvalidRepetitionRange, start))
            }
            Some(ch) => Ok(Ast::Char(ch)),
            None => Err(self.error(ParseErrorKind::UnbalancedGroup, start)),
        }
    }

    /// Parses a group body with the cursor just past the opening paren.
    fn parse_group(&mut self, start: usize) -> Result<Ast, ParseError> {
        let kind = if self.eat('?') {
            if self.eat(':') {
                GroupKind::NonCapturing
            } else {
                // lookaround, named groups and inline flags all begin
                // `(?` followed by something other than `:`.
                return Err(self.error(ParseErrorKind::UnsupportedConstruct, start));
            }
        } else {
            let slot = self.next_slot;
            self.next_slot += 1;
            GroupKind::Capturing { slot }
        };

        let inner = self.parse_alternation()?;
        if !self.eat(')') {
            return Err(self.error(ParseErrorKind::UnbalancedGroup, start));
        }

        Ok(Ast::Group {
            kind,
            inner: Box::new(inner),
        })
    }

    /// Parses a bracket expression with the cursor just past the opening
    /// bracket.
    fn parse_class(&mut self, start: usize) -> Result<Ast, ParseError> {
        let negated = self.eat('^');
        let mut items = vec![];

        // a close bracket first thing is a literal member.
        if self.eat(']') {
            items.push(ClassItem::Char(']'));
        }

        loop {
            match self.peek() {
                None => return Err(self.error(ParseErrorKind::InvalidClass, start)),
                Some(']') => {
                    self.bump();
                    break;
                }
                Some(_) => {
                    let item_pos = self.pos;
                    match self.parse_class_member(item_pos)? {
                        ClassMember::Single(lo) => {
                            // a dash binds as a range unless it closes the
                            // class.
                            let is_range = self.peek() == Some('-')
                                && self.pattern[self.pos..].chars().nth(1) != Some(']')
                                && self.pattern[self.pos..].chars().nth(1).is_some();
                            if !is_range {
                                items.push(ClassItem::Char(lo));
                                continue;
                            }

                            self.bump();
                            let hi_pos = self.pos;
                            let hi = match self.parse_class_member(hi_pos)? {
                                ClassMember::Single(hi) => hi,
                                ClassMember::Items(_) => {
                                    return Err(
                                        self.error(ParseErrorKind::InvalidClass, hi_pos)
                                    );
                                }
                            };
                            if lo > hi {
                                return Err(self.error(ParseErrorKind::InvalidClass, item_pos));
                            }
                            items.push(ClassItem::Range(lo, hi));
                        }
                        ClassMember::Items(class_items) => items.extend(class_items),
                    }
                }
            }
        }

        Ok(Ast::Class(ClassSet::new(negated, items)))
    }

    /// Parses one member of a bracket expression: a literal, an escaped
    /// character, or a class escape contributing several items.
    fn parse_class_member(&mut self, pos: usize) -> Result<ClassMember, ParseError> {
        let ch = self
            .bump()
            .ok_or_else(|| self.error(ParseErrorKind::InvalidClass, pos))?;
        if ch != '\\' {
            return Ok(ClassMember::Single(ch));
        }

        match self.bump() {
            Some('d') => Ok(ClassMember::Items(digit_items())),
            Some('w') => Ok(ClassMember::Items(word_items())),
            Some('s') => Ok(ClassMember::Items(space_items())),
            Some(ch) => self.resolve_char_escape(ch, pos).map(ClassMember::Single),
            None => Err(self.error(ParseErrorKind::InvalidEscape, pos)),
        }
    }

    /// Parses a top-level escape with the cursor just past the backslash.
    fn parse_escape(&mut self, start: usize) -> Result<Ast, ParseError> {
        let ch = self
            .bump()
            .ok_or_else(|| self.error(ParseErrorKind::InvalidEscape, start))?;

        match ch {
            'd' => Ok(Ast::Class(ClassSet::positive(digit_items()))),
            'D' => Ok(Ast::Class(ClassSet::negative(digit_items()))),
            'w' => Ok(Ast::Class(ClassSet::positive(word_items()))),
            'W' => Ok(Ast::Class(ClassSet::negative(word_items()))),
            's' => Ok(Ast::Class(ClassSet::positive(space_items()))),
            'S' => Ok(Ast::Class(ClassSet::negative(space_items()))),
            'b' => Ok(Ast::Assertion(AssertionKind::WordBoundary)),
            'B' => Ok(Ast::Assertion(AssertionKind::NonWordBoundary)),
            'A' => Ok(Ast::Assertion(AssertionKind::StartOfInput)),
            'z' => Ok(Ast::Assertion(AssertionKind::EndOfInput)),
            '1'..='9' | 'p' | 'P' => {
                // backreferences and unicode property classes.
                Err(self.error(ParseErrorKind::UnsupportedConstruct, start))
            }
            ch => self.resolve_char_escape(ch, start).map(Ast::Char),
        }
    }

    /// Resolves the escapes that denote a single character, shared between
    /// top-level position and bracket expressions.
    fn resolve_char_escape(&mut self, ch: char, start: usize) -> Result<char, ParseError> {
        match ch {
            'n' => Ok('\n'),
            'r' => Ok('\r'),
            't' => Ok('\t'),
            'f' => Ok('\u{c}'),
            'v' => Ok('\u{b}'),
            'a' => Ok('\u{7}'),
            '0' => Ok('\0'),
            'x' => self.parse_hex_escape(start, 2),
            'u' => self.parse_hex_escape(start, 4),
            ch if !ch.is_alphanumeric() => Ok(ch),
            _ => Err(self.error(ParseErrorKind::InvalidEscape, start)),
        }
    }

    /// Parses `\xHH`/`\uHHHH`, or the braced form `\x{...}`/`\u{...}`.
    fn parse_hex_escape(&mut self, start: usize, fixed_len: usize) -> Result<char, ParseError> {
        let braced = self.eat('{');
        let mut value: u32 = 0;
        let mut digits = 0;

        loop {
            if !braced && digits == fixed_len {
                break;
            }
            match self.peek().and_then(|ch| ch.to_digit(16)) {
                Some(digit) => {
                    self.bump();
                    digits += 1;
                    value = value
                        .checked_mul(16)
                        .and_then(|v| v.checked_add(digit))
                        .ok_or_else(|| self.error(ParseErrorKind::InvalidEscape, start))?;
                }
                None if braced => break,
                None => return Err(self.error(ParseErrorKind::InvalidEscape, start)),
            }
        }

        if digits == 0 || (braced && !self.eat('}')) {
            return Err(self.error(ParseErrorKind::InvalidEscape, start));
        }

        char::from_u32(value).ok_or_else(|| self.error(ParseErrorKind::InvalidEscape, start))
    }
}

enum ClassMember {
    Single(char),
    Items(Vec<ClassItem>),
}

/// Anchors and the empty pattern take no quantifier.
fn quantifiable(node: &Ast) -> bool {
    !matches!(node, Ast::Assertion(_) | Ast::Empty)
}
