//! Lowering from the normalized tree to runnable instructions.
//!
//! Emission happens in two stages. Each node first compiles to a block of
//! relative opcodes whose branch targets are offsets from the opcode's own
//! position, which lets blocks concatenate without target fixups. Once the
//! full program is assembled the relative offsets resolve to absolute
//! instruction indices in a single pass.

use relin_runtime::{
    CharacterAlphabet, CharacterSet, EpsilonCond, FastForward, InstConsume, InstConsumeSet,
    InstEndSave, InstEpsilon, InstIndex, InstJmp, InstSplit, InstStartSave, Instructions, Mode,
    Opcode,
};

use crate::ast::{AssertionKind, Ast, ClassItem, ClassSet, GroupKind, RepetitionKind};
use crate::error::{CompileError, Error};
use crate::parser;
use crate::simplify;

const DEFAULT_INSTRUCTION_LIMIT: usize = 10_000;

/// Compilation settings, mirroring the caller-visible pattern options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Options {
    multiline: bool,
    case_insensitive: bool,
    dot_matches_newline: bool,
    mode: Mode,
    instruction_limit: usize,
}

impl Options {
    /// Makes `^` and `$` anchor to line boundaries rather than input
    /// boundaries.
    pub fn with_multiline(self) -> Self {
        Self {
            multiline: true,
            ..self
        }
    }

    /// Folds letter case: one-to-one mappings for literal characters and
    /// the ASCII range for class items.
    pub fn with_case_insensitive(self) -> Self {
        Self {
            case_insensitive: true,
            ..self
        }
    }

    /// Lets `.` match a line feed as well.
    pub fn with_dot_matches_newline(self) -> Self {
        Self {
            dot_matches_newline: true,
            ..self
        }
    }

    /// Selects how the compiled program will decode its input.
    pub fn with_mode(self, mode: Mode) -> Self {
        Self { mode, ..self }
    }

    /// Overrides the ceiling on compiled program size.
    pub fn with_instruction_limit(self, instruction_limit: usize) -> Self {
        Self {
            instruction_limit,
            ..self
        }
    }

    pub fn multiline(&self) -> bool {
        self.multiline
    }

    pub fn case_insensitive(&self) -> bool {
        self.case_insensitive
    }

    pub fn dot_matches_newline(&self) -> bool {
        self.dot_matches_newline
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn instruction_limit(&self) -> usize {
        self.instruction_limit
    }
}

impl Default for Options {
    fn default() -> Self {
        Self {
            multiline: false,
            case_insensitive: false,
            dot_matches_newline: false,
            mode: Mode::Char,
            instruction_limit: DEFAULT_INSTRUCTION_LIMIT,
        }
    }
}

/// Compiles a pattern into a runnable program: parse, normalize, emit.
pub fn compile(pattern: &str, options: Options) -> Result<Instructions, Error> {
    let ast = parser::parse(pattern)?;
    let ast = simplify::simplify(ast, options.instruction_limit)?;

    emit(&ast, options).map_err(Error::from)
}

/// Emits instructions for a normalized tree, bracketing the whole pattern
/// in save slot 0 and terminating with `Match`.
pub fn emit(ast: &Ast, options: Options) -> Result<Instructions, CompileError> {
    let mut sets = vec![];

    let mut relative = vec![RelativeOpcode::StartSave(0)];
    relative.extend(compile_node(ast, &options, &mut sets));
    relative.push(RelativeOpcode::EndSave(0));
    relative.push(RelativeOpcode::Match);

    if relative.len() > options.instruction_limit {
        return Err(CompileError::PatternTooLarge);
    }

    let program: Vec<Opcode> = relative
        .iter()
        .enumerate()
        .map(|(idx, opcode)| opcode.to_opcode_at_index(idx as u32))
        .collect();
    let fast_forward = detect_fast_forward(&program);

    Ok(Instructions::default()
        .with_mode(options.mode)
        .with_sets(sets)
        .with_opcodes(program)
        .with_fast_forward(fast_forward))
}

/// An opcode whose branch targets are signed offsets from its own index.
#[derive(Debug, Clone, PartialEq)]
enum RelativeOpcode {
    Any,
    Consume(char),
    ConsumeSet(usize),
    Epsilon(EpsilonCond),
    Split(i32, i32),
    Jmp(i32),
    StartSave(usize),
    EndSave(usize),
    Match,
}

impl RelativeOpcode {
    fn to_opcode_at_index(&self, idx: u32) -> Opcode {
        let absolute = |offset: i32| InstIndex::from((i64::from(idx) + i64::from(offset)) as u32);

        match *self {
            RelativeOpcode::Any => Opcode::Any,
            RelativeOpcode::Consume(value) => Opcode::Consume(InstConsume::new(value)),
            RelativeOpcode::ConsumeSet(set_idx) => {
                Opcode::ConsumeSet(InstConsumeSet::member_of(set_idx))
            }
            RelativeOpcode::Epsilon(cond) => Opcode::Epsilon(InstEpsilon::new(cond)),
            RelativeOpcode::Split(x, y) => Opcode::Split(InstSplit::new(absolute(x), absolute(y))),
            RelativeOpcode::Jmp(next) => Opcode::Jmp(InstJmp::new(absolute(next))),
            RelativeOpcode::StartSave(slot) => Opcode::StartSave(InstStartSave::new(slot)),
            RelativeOpcode::EndSave(slot) => Opcode::EndSave(InstEndSave::new(slot)),
            RelativeOpcode::Match => Opcode::Match,
        }
    }
}

fn compile_node(
    ast: &Ast,
    options: &Options,
    sets: &mut Vec<CharacterSet>,
) -> Vec<RelativeOpcode> {
    match ast {
        Ast::Empty => vec![],
        Ast::Char(value) => compile_char(*value, options, sets),
        Ast::Literal(run) => run
            .chars()
            .flat_map(|value| compile_char(value, options, sets))
            .collect(),
        // `.` matches any symbol, optionally excluding a line feed.
        Ast::AnyChar if options.dot_matches_newline => vec![RelativeOpcode::Any],
        Ast::AnyChar => {
            let idx = add_set(
                sets,
                CharacterSet::exclusive(CharacterAlphabet::Explicit(vec!['\n'])),
            );
            vec![RelativeOpcode::ConsumeSet(idx)]
        }
        Ast::Class(class) => {
            let idx = add_set(sets, character_set_of(class, options));
            vec![RelativeOpcode::ConsumeSet(idx)]
        }
        Ast::Assertion(kind) => vec![RelativeOpcode::Epsilon(epsilon_cond_of(*kind, options))],
        Ast::Concat(items) => items
            .iter()
            .flat_map(|item| compile_node(item, options, sets))
            .collect(),
        Ast::Alternation(arms) => compile_alternation(arms, options, sets),
        Ast::Group { kind, inner } => {
            let block = compile_node(inner, options, sets);
            match kind {
                GroupKind::NonCapturing => block,
                GroupKind::Capturing { slot } => {
                    let mut out = vec![RelativeOpcode::StartSave(*slot)];
                    out.extend(block);
                    out.push(RelativeOpcode::EndSave(*slot));
                    out
                }
            }
        }
        Ast::Repetition { kind, lazy, inner } => match *kind {
            RepetitionKind::ZeroOrOne => {
                compile_zero_or_one(compile_node(inner, options, sets), *lazy)
            }
            RepetitionKind::ZeroOrMore => {
                compile_zero_or_more(compile_node(inner, options, sets), *lazy)
            }
            RepetitionKind::OneOrMore => {
                compile_one_or_more(compile_node(inner, options, sets), *lazy)
            }
            // normalized trees carry no counted ranges; expand on the fly
            // for callers emitting a raw parse.
            RepetitionKind::Range { lower, upper } => {
                let expanded =
                    simplify::expand_counted((**inner).clone(), lower, upper, *lazy);
                compile_node(&expanded, options, sets)
            }
        },
    }
}

fn compile_char(
    value: char,
    options: &Options,
    sets: &mut Vec<CharacterSet>,
) -> Vec<RelativeOpcode> {
    if !options.case_insensitive {
        return vec![RelativeOpcode::Consume(value)];
    }

    // one-to-one case mappings only; multi-char expansions like ß map to
    // themselves.
    let mut variants = vec![value];
    for mapped in [single_char(value.to_lowercase()), single_char(value.to_uppercase())]
        .into_iter()
        .flatten()
    {
        if !variants.contains(&mapped) {
            variants.push(mapped);
        }
    }

    if variants.len() == 1 {
        vec![RelativeOpcode::Consume(value)]
    } else {
        variants.sort_unstable();
        let idx = add_set(
            sets,
            CharacterSet::inclusive(CharacterAlphabet::Explicit(variants)),
        );
        vec![RelativeOpcode::ConsumeSet(idx)]
    }
}

fn single_char(mut mapping: impl Iterator<Item = char>) -> Option<char> {
    match (mapping.next(), mapping.next()) {
        (Some(c), None) => Some(c),
        _ => None,
    }
}

/// Lowers `x|y|z` right-associatively: each step guards its head with a
/// split whose low-priority branch jumps past the head into the remaining
/// arms.
fn compile_alternation(
    arms: &[Ast],
    options: &Options,
    sets: &mut Vec<CharacterSet>,
) -> Vec<RelativeOpcode> {
    match arms {
        [] => vec![],
        [arm] => compile_node(arm, options, sets),
        [head, rest @ ..] => {
            let head_block = compile_node(head, options, sets);
            let rest_block = compile_alternation(rest, options, sets);
            let head_len = head_block.len() as i32;
            let rest_len = rest_block.len() as i32;

            let mut out = vec![RelativeOpcode::Split(1, head_len + 2)];
            out.extend(head_block);
            out.push(RelativeOpcode::Jmp(rest_len + 1));
            out.extend(rest_block);
            out
        }
    }
}

fn compile_zero_or_one(block: Vec<RelativeOpcode>, lazy: bool) -> Vec<RelativeOpcode> {
    let len = block.len() as i32;
    let (x, y) = if lazy { (len + 1, 1) } else { (1, len + 1) };

    let mut out = vec![RelativeOpcode::Split(x, y)];
    out.extend(block);
    out
}

fn compile_zero_or_more(block: Vec<RelativeOpcode>, lazy: bool) -> Vec<RelativeOpcode> {
    let len = block.len() as i32;
    let (x, y) = if lazy { (len + 2, 1) } else { (1, len + 2) };

    let mut out = vec![RelativeOpcode::Split(x, y)];
    out.extend(block);
    out.push(RelativeOpcode::Jmp(-(len + 1)));
    out
}

fn compile_one_or_more(block: Vec<RelativeOpcode>, lazy: bool) -> Vec<RelativeOpcode> {
    let len = block.len() as i32;
    let (x, y) = if lazy { (1, -len) } else { (-len, 1) };

    let mut out = block;
    out.push(RelativeOpcode::Split(x, y));
    out
}

fn epsilon_cond_of(kind: AssertionKind, options: &Options) -> EpsilonCond {
    match kind {
        AssertionKind::StartOfLine if options.multiline => EpsilonCond::StartOfLine,
        AssertionKind::StartOfLine => EpsilonCond::StartOfInput,
        AssertionKind::EndOfLine if options.multiline => EpsilonCond::EndOfLine,
        AssertionKind::EndOfLine => EpsilonCond::EndOfInput,
        AssertionKind::StartOfInput => EpsilonCond::StartOfInput,
        AssertionKind::EndOfInput => EpsilonCond::EndOfInput,
        AssertionKind::WordBoundary => EpsilonCond::WordBoundary,
        AssertionKind::NonWordBoundary => EpsilonCond::NonWordBoundary,
    }
}

/// Converts a bracket expression into a runtime set, folding ASCII letter
/// case into the items when requested.
fn character_set_of(class: &ClassSet, options: &Options) -> CharacterSet {
    let mut items = class.items.clone();
    if options.case_insensitive {
        items = fold_ascii_case(items);
    }

    let all_chars = items
        .iter()
        .all(|item| matches!(item, ClassItem::Char(_)));
    let alphabet = match (&items[..], all_chars) {
        ([ClassItem::Range(lo, hi)], _) => CharacterAlphabet::Range(*lo..=*hi),
        (_, true) => CharacterAlphabet::Explicit(
            items
                .iter()
                .filter_map(|item| match item {
                    ClassItem::Char(c) => Some(*c),
                    ClassItem::Range(..) => None,
                })
                .collect(),
        ),
        (_, false) => CharacterAlphabet::Ranges(
            items
                .iter()
                .map(|item| match *item {
                    ClassItem::Char(c) => c..=c,
                    ClassItem::Range(lo, hi) => lo..=hi,
                })
                .collect(),
        ),
    };

    if class.negated {
        CharacterSet::exclusive(alphabet)
    } else {
        CharacterSet::inclusive(alphabet)
    }
}

/// Extends items with the opposite-case image of their intersection with
/// the ASCII letter ranges.
fn fold_ascii_case(items: Vec<ClassItem>) -> Vec<ClassItem> {
    let mut folded = items.clone();

    for item in items {
        match item {
            ClassItem::Char(c) if c.is_ascii_alphabetic() => {
                folded.push(ClassItem::Char(flip_ascii_case(c)));
            }
            ClassItem::Char(_) => {}
            ClassItem::Range(lo, hi) => {
                for (case_lo, case_hi) in [('a', 'z'), ('A', 'Z')] {
                    let lo = lo.max(case_lo);
                    let hi = hi.min(case_hi);
                    if lo <= hi {
                        folded.push(ClassItem::Range(
                            flip_ascii_case(lo),
                            flip_ascii_case(hi),
                        ));
                    }
                }
            }
        }
    }

    folded
}

fn flip_ascii_case(c: char) -> char {
    if c.is_ascii_lowercase() {
        c.to_ascii_uppercase()
    } else {
        c.to_ascii_lowercase()
    }
}

fn add_set(sets: &mut Vec<CharacterSet>, set: CharacterSet) -> usize {
    if let Some(idx) = sets.iter().position(|existing| *existing == set) {
        idx
    } else {
        sets.push(set);
        sets.len() - 1
    }
}

/// Derives the prefix-skip hint from the compiled program's mandatory
/// leading instructions: a run of ASCII consumes becomes a literal or
/// single-character scan, a leading set consume becomes a set scan, and
/// anything else leaves scanning byte-by-byte.
fn detect_fast_forward(program: &[Opcode]) -> FastForward {
    let mut literal = String::new();
    let mut pc = 0;

    while let Some(opcode) = program.get(pc) {
        match opcode {
            Opcode::StartSave(_) | Opcode::EndSave(_) => pc += 1,
            Opcode::Consume(InstConsume { value }) if value.is_ascii() => {
                literal.push(*value);
                pc += 1;
            }
            Opcode::ConsumeSet(inst) if literal.is_empty() => {
                return FastForward::Set(inst.idx);
            }
            _ => break,
        }
    }

    let mut chars = literal.chars();
    match (chars.next(), chars.next()) {
        (None, _) => FastForward::None,
        (Some(first), None) => FastForward::Char(first),
        (Some(_), Some(_)) => FastForward::Literal(literal),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_compile_literal_sequence_with_literal_prefix_hint() {
        assert_eq!(
            Ok(Instructions::default()
                .with_opcodes(vec![
                    Opcode::StartSave(InstStartSave::new(0)),
                    Opcode::Consume(InstConsume::new('a')),
                    Opcode::Consume(InstConsume::new('b')),
                    Opcode::EndSave(InstEndSave::new(0)),
                    Opcode::Match,
                ])
                .with_fast_forward(FastForward::Literal("ab".to_string()))),
            compile("ab", Options::default())
        );
    }

    #[test]
    fn should_compile_alternation_with_branch_priority() {
        assert_eq!(
            Ok(Instructions::default().with_opcodes(vec![
                Opcode::StartSave(InstStartSave::new(0)),
                Opcode::Split(InstSplit::new(InstIndex::from(2), InstIndex::from(4))),
                Opcode::Consume(InstConsume::new('a')),
                Opcode::Jmp(InstJmp::new(InstIndex::from(5))),
                Opcode::Consume(InstConsume::new('b')),
                Opcode::EndSave(InstEndSave::new(0)),
                Opcode::Match,
            ])),
            compile("a|b", Options::default())
        );
    }

    #[test]
    fn should_compile_greedy_and_lazy_quantifiers_with_swapped_branches() {
        assert_eq!(
            Ok(Instructions::default()
                .with_opcodes(vec![
                    Opcode::StartSave(InstStartSave::new(0)),
                    Opcode::Consume(InstConsume::new('a')),
                    Opcode::Split(InstSplit::new(InstIndex::from(1), InstIndex::from(3))),
                    Opcode::EndSave(InstEndSave::new(0)),
                    Opcode::Match,
                ])
                .with_fast_forward(FastForward::Char('a'))),
            compile("a+", Options::default())
        );
        assert_eq!(
            Ok(Instructions::default()
                .with_opcodes(vec![
                    Opcode::StartSave(InstStartSave::new(0)),
                    Opcode::Consume(InstConsume::new('a')),
                    Opcode::Split(InstSplit::new(InstIndex::from(3), InstIndex::from(1))),
                    Opcode::EndSave(InstEndSave::new(0)),
                    Opcode::Match,
                ])
                .with_fast_forward(FastForward::Char('a'))),
            compile("a+?", Options::default())
        );
    }

    #[test]
    fn should_compile_zero_or_more_as_split_loop() {
        assert_eq!(
            Ok(Instructions::default().with_opcodes(vec![
                Opcode::StartSave(InstStartSave::new(0)),
                Opcode::Split(InstSplit::new(InstIndex::from(2), InstIndex::from(4))),
                Opcode::Consume(InstConsume::new('a')),
                Opcode::Jmp(InstJmp::new(InstIndex::from(1))),
                Opcode::EndSave(InstEndSave::new(0)),
                Opcode::Match,
            ])),
            compile("a*", Options::default())
        );
    }

    #[test]
    fn should_wrap_capture_groups_in_save_instructions() {
        assert_eq!(
            Ok(Instructions::default()
                .with_opcodes(vec![
                    Opcode::StartSave(InstStartSave::new(0)),
                    Opcode::StartSave(InstStartSave::new(1)),
                    Opcode::Consume(InstConsume::new('a')),
                    Opcode::EndSave(InstEndSave::new(1)),
                    Opcode::EndSave(InstEndSave::new(0)),
                    Opcode::Match,
                ])
                .with_fast_forward(FastForward::Char('a'))),
            compile("(a)", Options::default())
        );
    }

    #[test]
    fn should_deduplicate_identical_character_sets() {
        let program = compile("[0-9][0-9]", Options::default()).expect("should compile");

        let expected = Instructions::default()
            .with_sets(vec![CharacterSet::inclusive(CharacterAlphabet::Range(
                '0'..='9',
            ))])
            .with_opcodes(vec![
                Opcode::StartSave(InstStartSave::new(0)),
                Opcode::ConsumeSet(InstConsumeSet::member_of(0)),
                Opcode::ConsumeSet(InstConsumeSet::member_of(0)),
                Opcode::EndSave(InstEndSave::new(0)),
                Opcode::Match,
            ])
            .with_fast_forward(FastForward::Set(0));

        assert_eq!(expected, program);
    }

    #[test]
    fn should_compile_dot_as_line_feed_exclusion() {
        assert_eq!(
            Ok(Instructions::default()
                .with_sets(vec![CharacterSet::exclusive(CharacterAlphabet::Explicit(
                    vec!['\n']
                ))])
                .with_opcodes(vec![
                    Opcode::StartSave(InstStartSave::new(0)),
                    Opcode::ConsumeSet(InstConsumeSet::member_of(0)),
                    Opcode::EndSave(InstEndSave::new(0)),
                    Opcode::Match,
                ])
                .with_fast_forward(FastForward::Set(0))),
            compile(".", Options::default())
        );
    }

    #[test]
    fn should_map_line_anchors_by_multiline_option() {
        let single = compile("^a", Options::default()).expect("should compile");
        let multi =
            compile("^a", Options::default().with_multiline()).expect("should compile");

        assert_eq!(
            Opcode::Epsilon(InstEpsilon::new(EpsilonCond::StartOfInput)),
            single[InstIndex::from(1)]
        );
        assert_eq!(
            Opcode::Epsilon(InstEpsilon::new(EpsilonCond::StartOfLine)),
            multi[InstIndex::from(1)]
        );
    }

    #[test]
    fn should_fold_ascii_case_when_insensitive() {
        let options = Options::default().with_case_insensitive();
        let program = compile("a", options).expect("should compile");

        assert!(program.search(b"A", 0).is_some());
        assert!(program.search(b"a", 0).is_some());

        let class = compile("[a-d]", options).expect("should compile");
        assert!(class.search(b"C", 0).is_some());
        assert!(class.search(b"x", 0).is_none());
    }

    #[test]
    fn should_let_dot_cross_line_feeds_when_requested() {
        let default = compile("a.b", Options::default()).expect("should compile");
        let dotall = compile("a.b", Options::default().with_dot_matches_newline())
            .expect("should compile");

        assert!(default.search(b"a\nb", 0).is_none());
        assert!(dotall.search(b"a\nb", 0).is_some());
        assert!(default.search(b"axb", 0).is_some());
    }

    #[test]
    fn should_fold_one_to_one_unicode_case_mappings() {
        let program =
            compile("é", Options::default().with_case_insensitive()).expect("should compile");

        assert!(program.search("Été".as_bytes(), 0).is_some());
    }

    #[test]
    fn should_extract_captures_end_to_end() {
        let program = compile(r"(\w+)@(\w+)", Options::default()).expect("should compile");
        let m = program.search(b"mail: user@host", 0).expect("should match");

        assert_eq!(6..15, m.full_range());
        assert_eq!(Some(6..10), m.group(1));
        assert_eq!(Some(11..15), m.group(2));
    }

    #[test]
    fn should_honor_instruction_limit() {
        assert_eq!(
            Err(Error::Compile(CompileError::PatternTooLarge)),
            compile("abcdefghij", Options::default().with_instruction_limit(8))
        );
    }

    #[test]
    fn should_stamp_programs_with_the_requested_mode() {
        let program = compile("a", Options::default().with_mode(Mode::Byte))
            .expect("should compile");
        assert_eq!(Mode::Byte, program.mode());
    }
}
