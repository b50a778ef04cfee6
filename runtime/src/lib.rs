//! The runtime half of the engine: the instruction set that patterns compile
//! down to, and the Pike-style NFA evaluator that executes a compiled
//! [`Instructions`] program against an input buffer.
//!
//! Programs are produced by the companion compiler crate and are immutable
//! once built. All per-search state (thread lists, save slots) is owned by
//! the search call itself, so a single program may be shared read-only
//! across any number of concurrent searches.
//!
//! # Example
//!
//! ```
//! use relin_runtime::*;
//!
//! // approximate to `(a)` against any input position.
//! let program = Instructions::default().with_opcodes(vec![
//!     Opcode::StartSave(InstStartSave::new(0)),
//!     Opcode::StartSave(InstStartSave::new(1)),
//!     Opcode::Consume(InstConsume::new('a')),
//!     Opcode::EndSave(InstEndSave::new(1)),
//!     Opcode::EndSave(InstEndSave::new(0)),
//!     Opcode::Match,
//! ]);
//!
//! let m = program.search(b"bab", 0).expect("should match");
//! assert_eq!(1..2, m.full_range());
//! assert_eq!(Some(1..2), m.group(1));
//! ```

use std::fmt::{Debug, Display};
use std::ops::Range;

mod input;
mod pikevm;
mod sparse_set;

pub mod dfa;

pub use input::Mode;
pub use pikevm::Matches;

/// Represents the completed state of a save-group slot pair after a search,
/// either untouched (the group never participated in the winning thread's
/// path) or a completed byte range over the input.
///
/// A completed zero-length range is distinct from [`SaveGroupSlot::None`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SaveGroupSlot {
    #[default]
    None,
    Complete {
        start: usize,
        end: usize,
    },
}

impl SaveGroupSlot {
    /// Returns a boolean representing if the savegroup slot is of the `None`
    /// variant, signifying the group did not take part in the match.
    pub fn is_none(&self) -> bool {
        matches!(self, SaveGroupSlot::None)
    }

    /// Returns a boolean representing if the savegroup slot is of the
    /// `Complete` variant, signifying the group matched.
    pub fn is_complete(&self) -> bool {
        !self.is_none()
    }

    /// Returns a completed save group from its constituent parts.
    pub const fn complete(start: usize, end: usize) -> Self {
        Self::Complete { start, end }
    }

    /// Converts the slot into a byte range over the input, if complete.
    pub fn as_range(&self) -> Option<Range<usize>> {
        match *self {
            SaveGroupSlot::None => None,
            SaveGroupSlot::Complete { start, end } => Some(start..end),
        }
    }
}

/// Represents a save group as tracked on a live thread during evaluation. A
/// group opens when its `StartSave` instruction is crossed and completes
/// when the paired `EndSave` is crossed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) enum SaveGroup {
    #[default]
    None,
    Open {
        start: usize,
    },
    Complete {
        start: usize,
        end: usize,
    },
}

impl From<SaveGroup> for SaveGroupSlot {
    fn from(src: SaveGroup) -> Self {
        match src {
            SaveGroup::Complete { start, end } => SaveGroupSlot::Complete { start, end },
            SaveGroup::None | SaveGroup::Open { .. } => SaveGroupSlot::None,
        }
    }
}

/// A successful search result: the full match range plus one slot per save
/// group in the program.
///
/// Group 0 always spans the full match. Higher group indices correspond to
/// parenthesized subpatterns in source order. A group that exists in the
/// pattern but did not take part in the winning path reports `None`, which
/// callers can distinguish from an empty range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternMatch {
    groups: Box<[SaveGroupSlot]>,
}

impl PatternMatch {
    pub(crate) fn new(groups: Box<[SaveGroupSlot]>) -> Self {
        Self { groups }
    }

    /// The start of the full match, in bytes.
    pub fn start(&self) -> usize {
        self.full_range().start
    }

    /// The end of the full match, exclusive, in bytes.
    pub fn end(&self) -> usize {
        self.full_range().end
    }

    /// The byte range of the full match.
    ///
    /// Well-formed programs bracket the whole pattern in save slot 0, so
    /// the winning thread always carries a completed slot 0.
    pub fn full_range(&self) -> Range<usize> {
        self.groups
            .first()
            .and_then(|slot| slot.as_range())
            .unwrap_or(0..0)
    }

    /// The byte range captured by the group at `idx`, if it participated in
    /// the match. Group 0 is the full match.
    pub fn group(&self, idx: usize) -> Option<Range<usize>> {
        self.groups.get(idx).and_then(|slot| slot.as_range())
    }

    /// The number of groups in the program, counting group 0.
    pub fn group_len(&self) -> usize {
        self.groups.len()
    }

    /// All group slots in index order, starting at group 0.
    pub fn groups(&self) -> &[SaveGroupSlot] {
        &self.groups
    }
}

/// A compiled program: an optional table of character sets referenced by
/// `ConsumeSet` instructions, the instruction sequence itself, the input
/// decode mode and an optional prefix skip hint.
///
/// Immutable once constructed and safe to share across threads.
#[derive(Debug, PartialEq)]
pub struct Instructions {
    mode: Mode,
    fast_forward: FastForward,
    sets: Vec<CharacterSet>,
    program: Vec<Instruction>,
    save_groups: usize,
}

impl Instructions {
    #[must_use]
    pub fn new(sets: Vec<CharacterSet>, program: Vec<Opcode>) -> Self {
        Self::default().with_sets(sets).with_opcodes(program)
    }

    pub fn with_opcodes(self, program: Vec<Opcode>) -> Self {
        let program: Vec<_> = program
            .into_iter()
            .enumerate()
            .map(|(id, opcode)| Instruction::new(id, opcode))
            .collect();
        let save_groups = save_groups_of(&program);

        Self {
            program,
            save_groups,
            ..self
        }
    }

    pub fn with_sets(self, sets: Vec<CharacterSet>) -> Self {
        Self { sets, ..self }
    }

    pub fn with_fast_forward(self, fast_forward: FastForward) -> Self {
        Self {
            fast_forward,
            ..self
        }
    }

    pub fn with_mode(self, mode: Mode) -> Self {
        Self { mode, ..self }
    }

    /// The number of instructions in the program.
    pub fn len(&self) -> usize {
        self.program.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The input decode mode the program was compiled for.
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// The number of save groups the program tracks, counting the implicit
    /// full-match group 0.
    pub fn save_groups(&self) -> usize {
        self.save_groups
    }

    pub(crate) fn fast_forward(&self) -> &FastForward {
        &self.fast_forward
    }

    pub(crate) fn sets(&self) -> &[CharacterSet] {
        &self.sets
    }

    /// Runs the program against `haystack`, beginning the scan at byte
    /// offset `start`, and returns the leftmost-first match if any.
    ///
    /// Absence of a match is a normal result, not an error.
    pub fn search(&self, haystack: &[u8], start: usize) -> Option<PatternMatch> {
        pikevm::search(self, haystack, start, false)
    }

    /// Returns a lazy iterator over all successive non-overlapping matches
    /// in `haystack`. Each step re-runs [`Instructions::search`] from the
    /// end of the previous match, advancing by at least one byte after an
    /// empty match.
    pub fn search_all<'r, 'h>(&'r self, haystack: &'h [u8]) -> Matches<'r, 'h> {
        Matches::new(self, haystack)
    }

    /// Returns whether the program matches anywhere in `haystack`, stopping
    /// at the earliest match.
    pub fn is_match(&self, haystack: &[u8]) -> bool {
        pikevm::search(self, haystack, 0, true).is_some()
    }
}

impl Default for Instructions {
    fn default() -> Self {
        Self {
            mode: Mode::Char,
            fast_forward: FastForward::None,
            sets: vec![],
            program: vec![],
            save_groups: 0,
        }
    }
}

impl Display for Instructions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for inst in self.program.iter() {
            writeln!(f, "{}", inst)?
        }

        Ok(())
    }
}

impl std::ops::Index<InstIndex> for Instructions {
    type Output = Opcode;

    fn index(&self, index: InstIndex) -> &Self::Output {
        &self.program[index.as_usize()].opcode
    }
}

impl AsRef<[Instruction]> for Instructions {
    fn as_ref(&self) -> &[Instruction] {
        &self.program
    }
}

fn save_groups_of(program: &[Instruction]) -> usize {
    program
        .iter()
        .filter_map(|inst| match inst.opcode {
            Opcode::StartSave(InstStartSave { slot_id })
            | Opcode::EndSave(InstEndSave { slot_id }) => Some(slot_id + 1),
            _ => None,
        })
        .max()
        .unwrap_or(0)
}

/// A pointer into a program, newtyped to keep instruction ids distinct from
/// the many other `usize`s floating around the evaluator.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InstIndex(u32);

impl InstIndex {
    #[inline]
    pub fn as_u32(self) -> u32 {
        self.0
    }

    #[inline]
    pub fn as_usize(self) -> usize {
        self.0 as usize
    }
}

impl From<u32> for InstIndex {
    fn from(ptr: u32) -> Self {
        Self(ptr)
    }
}

impl std::ops::Add<u32> for InstIndex {
    type Output = Self;

    fn add(self, rhs: u32) -> Self::Output {
        InstIndex::from(self.0 + rhs)
    }
}

/// A single program entry: the instruction's own id paired with its opcode.
#[derive(Debug, PartialEq)]
pub struct Instruction {
    pub(crate) id: usize,
    pub(crate) opcode: Opcode,
}

impl Instruction {
    #[must_use]
    pub fn new(id: usize, opcode: Opcode) -> Self {
        Self { id, opcode }
    }
}

impl Display for Instruction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:04}: {}", self.id, self.opcode)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Opcode {
    /// Consumes any single symbol.
    Any,
    /// Consumes one exact symbol.
    Consume(InstConsume),
    /// Consumes one symbol contained in an indexed character set.
    ConsumeSet(InstConsumeSet),
    /// A zero-width assertion, passable only when its condition holds at
    /// the current position.
    Epsilon(InstEpsilon),
    /// Forks evaluation down two branches; the first operand is explored
    /// with higher priority.
    Split(InstSplit),
    /// An unconditional branch.
    Jmp(InstJmp),
    /// Opens a save-group slot at the current position.
    StartSave(InstStartSave),
    /// Completes a save-group slot at the current position.
    EndSave(InstEndSave),
    /// Accepts, recording the thread's save groups as the current best
    /// match.
    Match,
}

impl Opcode {
    /// Returns whether the opcode consumes an input symbol when executed.
    pub fn is_consuming(&self) -> bool {
        matches!(
            self,
            Opcode::Any | Opcode::Consume(_) | Opcode::ConsumeSet(_)
        )
    }
}

impl Display for Opcode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Opcode::Any => write!(f, "Any"),
            Opcode::Consume(i) => Display::fmt(&i, f),
            Opcode::ConsumeSet(i) => Display::fmt(&i, f),
            Opcode::Epsilon(i) => Display::fmt(&i, f),
            Opcode::Split(i) => Display::fmt(&i, f),
            Opcode::Jmp(i) => Display::fmt(&i, f),
            Opcode::StartSave(i) => Display::fmt(&i, f),
            Opcode::EndSave(i) => Display::fmt(&i, f),
            Opcode::Match => write!(f, "Match"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InstConsume {
    pub value: char,
}

impl InstConsume {
    #[must_use]
    pub fn new(value: char) -> Self {
        Self { value }
    }
}

impl Display for InstConsume {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Consume: {:?}", self.value)
    }
}

/// ConsumeSet provides richer matching than the more constrained Consume or
/// Any instructions, allowing a match against a set of characters. This
/// functions as a brevity tool to prevent long alternations.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InstConsumeSet {
    pub idx: usize,
}

impl InstConsumeSet {
    pub fn new(idx: usize) -> Self {
        Self::member_of(idx)
    }

    pub fn member_of(idx: usize) -> Self {
        Self { idx }
    }
}

impl Display for InstConsumeSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ConsumeSet: {{{:04}}}", self.idx)
    }
}

/// The set of zero-width conditions an `Epsilon` instruction can assert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EpsilonCond {
    /// Holds only at byte offset 0 of the haystack.
    StartOfInput,
    /// Holds only at the end of the haystack.
    EndOfInput,
    /// Holds at offset 0 or immediately after a `\n`.
    StartOfLine,
    /// Holds at the end of the haystack or immediately before a `\n`.
    EndOfLine,
    /// Holds where exactly one side of the position is a word character.
    WordBoundary,
    /// The complement of `WordBoundary`.
    NonWordBoundary,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InstEpsilon {
    pub cond: EpsilonCond,
}

impl InstEpsilon {
    pub fn new(cond: EpsilonCond) -> Self {
        Self { cond }
    }
}

impl Display for InstEpsilon {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let cond = match self.cond {
            EpsilonCond::StartOfInput => "Start of Input",
            EpsilonCond::EndOfInput => "End of Input",
            EpsilonCond::StartOfLine => "Start of Line",
            EpsilonCond::EndOfLine => "End of Line",
            EpsilonCond::WordBoundary => "Word Boundary",
            EpsilonCond::NonWordBoundary => "Non-Word Boundary",
        };

        write!(f, "Epsilon: {{{}}}", cond)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InstSplit {
    pub x_branch: InstIndex,
    pub y_branch: InstIndex,
}

impl InstSplit {
    #[must_use]
    pub fn new(x: InstIndex, y: InstIndex) -> Self {
        Self {
            x_branch: x,
            y_branch: y,
        }
    }
}

impl Display for InstSplit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Split: ({:04}), ({:04})",
            self.x_branch.as_u32(),
            self.y_branch.as_u32()
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InstJmp {
    pub next: InstIndex,
}

impl InstJmp {
    pub fn new(next: InstIndex) -> Self {
        Self { next }
    }
}

impl Display for InstJmp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "JumpAbs: ({:04})", self.next.as_u32())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InstStartSave {
    pub slot_id: usize,
}

impl InstStartSave {
    #[must_use]
    pub fn new(slot_id: usize) -> Self {
        Self { slot_id }
    }
}

impl Display for InstStartSave {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "StartSave[{:04}]", self.slot_id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InstEndSave {
    pub slot_id: usize,
}

impl InstEndSave {
    #[must_use]
    pub fn new(slot_id: usize) -> Self {
        Self { slot_id }
    }
}

impl Display for InstEndSave {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "EndSave[{:04}]", self.slot_id)
    }
}

/// A hint for skipping ahead to the next plausible match start when the
/// thread list drains. Computed at compile time from the program's leading
/// mandatory consuming instructions.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum FastForward {
    #[default]
    None,
    /// The match must begin with this exact ASCII character.
    Char(char),
    /// The match must begin with this exact ASCII literal run.
    Literal(String),
    /// The match must begin with a member of the indexed character set.
    Set(usize),
}

/// Represents a type that can be used as a comparative character set.
pub(crate) trait CharacterRangeSetVerifiable {
    fn in_set(&self, value: char) -> bool;

    fn not_in_set(&self, value: char) -> bool {
        !self.in_set(value)
    }
}

impl CharacterRangeSetVerifiable for std::ops::RangeInclusive<char> {
    fn in_set(&self, value: char) -> bool {
        self.contains(&value)
    }
}

impl CharacterRangeSetVerifiable for char {
    fn in_set(&self, value: char) -> bool {
        *self == value
    }
}

impl<CRSV: CharacterRangeSetVerifiable> CharacterRangeSetVerifiable for Vec<CRSV> {
    fn in_set(&self, value: char) -> bool {
        self.iter().any(|r| r.in_set(value))
    }
}

/// Representing a runtime-dispatchable set of characters by associating a
/// set's membership to a character alphabet.
#[derive(Debug, Clone, PartialEq)]
pub struct CharacterSet {
    membership: SetMembership,
    set: CharacterAlphabet,
}

impl CharacterSet {
    pub fn inclusive(set: CharacterAlphabet) -> Self {
        Self {
            membership: SetMembership::Inclusive,
            set,
        }
    }

    pub fn exclusive(set: CharacterAlphabet) -> Self {
        Self {
            membership: SetMembership::Exclusive,
            set,
        }
    }

    pub fn invert_membership(self) -> Self {
        let Self { membership, set } = self;

        Self {
            membership: match membership {
                SetMembership::Inclusive => SetMembership::Exclusive,
                SetMembership::Exclusive => SetMembership::Inclusive,
            },
            set,
        }
    }

    /// Returns whether `value` is matched by the set, honoring membership
    /// polarity.
    pub fn matches(&self, value: char) -> bool {
        match self.membership {
            SetMembership::Inclusive => self.set.in_set(value),
            SetMembership::Exclusive => self.set.not_in_set(value),
        }
    }
}

/// Represents a runtime dispatchable set of characters.
#[derive(Debug, Clone, PartialEq)]
pub enum CharacterAlphabet {
    /// Represents a range of values i.e. `0-9`, `a-z`, `A-Z`, etc...
    Range(std::ops::RangeInclusive<char>),
    /// Represents an explicitly defined set of values. i.e. `[a,b,z]`
    Explicit(Vec<char>),
    /// Represents a set of ranges of values i.e. `[0-9a-zA-Z]`, etc...
    Ranges(Vec<std::ops::RangeInclusive<char>>),
}

impl CharacterRangeSetVerifiable for CharacterAlphabet {
    fn in_set(&self, value: char) -> bool {
        match self {
            CharacterAlphabet::Range(r) => r.in_set(value),
            CharacterAlphabet::Explicit(v) => v.in_set(value),
            CharacterAlphabet::Ranges(ranges) => ranges.in_set(value),
        }
    }
}

/// Denotes whether a given set is inclusive or exclusive to a match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SetMembership {
    /// The value must be a member of the set.
    Inclusive,
    /// The value must not be a member of the set.
    Exclusive,
}
