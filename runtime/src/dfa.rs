//! A lazily-built DFA cache over a compiled program, for match/no-match
//! queries only.
//!
//! A DFA state is the set of program counters live at one input position,
//! so subset construction here is just the evaluator's thread list with the
//! save groups stripped. States and their byte transitions are built on
//! first use and memoized; repeated scans over similar input then run one
//! table lookup per byte instead of a thread-list step.
//!
//! The cache only accepts byte-mode programs with no zero-width assertions,
//! since those keep every state's transition a pure function of one input
//! byte. Capture extraction always belongs to the thread evaluator. When
//! the state budget fills, the cache is flushed once and rebuilt; a second
//! fill permanently disables the cache and routes every later query to the
//! thread evaluator.

use std::collections::BTreeSet;
use std::collections::HashMap;

use crate::{InstIndex, Instruction, Instructions, Mode, Opcode};

const UNKNOWN: u32 = u32::MAX;
const DEFAULT_STATE_BUDGET: usize = 4096;

#[derive(Debug)]
struct State {
    /// The sorted set of live program counters this state stands for. Each
    /// is a consuming instruction or `Match`.
    key: Box<[u32]>,
    next: Box<[u32; 256]>,
    is_match: bool,
}

/// A lazily-populated DFA over a borrowed program.
///
/// The cache is owned by the caller and carries interior scan state, so a
/// `&mut` borrow is needed per query; the underlying program stays shared.
#[derive(Debug)]
pub struct LazyDfa<'p> {
    program: &'p Instructions,
    states: Vec<State>,
    cache: HashMap<Box<[u32]>, u32>,
    start: u32,
    state_budget: usize,
    flushed: bool,
    disabled: bool,
}

impl<'p> LazyDfa<'p> {
    /// Wraps a program in a DFA cache, or returns `None` when the program
    /// is outside what the cache can faithfully represent: anything
    /// char-mode, empty, or carrying zero-width assertions.
    pub fn new(program: &'p Instructions) -> Option<Self> {
        let supported = program.mode() == Mode::Byte
            && !program.is_empty()
            && !AsRef::<[Instruction]>::as_ref(program)
                .iter()
                .any(|inst| matches!(inst.opcode, Opcode::Epsilon(_)));

        if !supported {
            return None;
        }

        let mut dfa = Self {
            program,
            states: vec![],
            cache: HashMap::new(),
            start: 0,
            state_budget: DEFAULT_STATE_BUDGET,
            flushed: false,
            disabled: false,
        };
        dfa.start = dfa.intern(start_key(program));

        Some(dfa)
    }

    /// Overrides the number of cached states tolerated before a flush.
    pub fn with_state_budget(mut self, state_budget: usize) -> Self {
        self.state_budget = state_budget.max(1);
        self
    }

    /// The number of states currently materialized.
    pub fn state_len(&self) -> usize {
        self.states.len()
    }

    /// Returns whether the cache has given up and is delegating to the
    /// thread evaluator.
    pub fn is_disabled(&self) -> bool {
        self.disabled
    }

    /// Returns whether the program matches anywhere in `haystack`,
    /// equivalent to [`Instructions::is_match`] on the wrapped program.
    pub fn is_match(&mut self, haystack: &[u8]) -> bool {
        if self.disabled {
            return self.program.is_match(haystack);
        }

        let mut state = self.start;
        if self.states[state as usize].is_match {
            return true;
        }

        for &byte in haystack.iter() {
            let cached = self.states[state as usize].next[byte as usize];
            let next = if cached != UNKNOWN {
                cached
            } else {
                match self.compute_transition(&mut state, byte) {
                    Some(next) => next,
                    // second cache fill; fall back for the rest of this
                    // query and every query after it.
                    None => {
                        self.disabled = true;
                        return self.program.is_match(haystack);
                    }
                }
            };

            if self.states[next as usize].is_match {
                return true;
            }
            state = next;
        }

        false
    }

    /// Materializes the transition out of `state` on `byte`, flushing the
    /// cache first if the budget is spent. `state` is re-interned across a
    /// flush so the caller's scan can continue uninterrupted. Returns
    /// `None` when a flush has already been spent.
    fn compute_transition(&mut self, state: &mut u32, byte: u8) -> Option<u32> {
        if self.states.len() >= self.state_budget {
            if self.flushed {
                return None;
            }
            self.flushed = true;

            let current = self.states[*state as usize].key.clone();
            self.states.clear();
            self.cache.clear();
            self.start = self.intern(start_key(self.program));
            *state = self.intern(current);
        }

        let mut seeds: Vec<u32> = vec![];
        let symbol = char::from(byte);
        for &pc in self.states[*state as usize].key.iter() {
            let advance = match self.program[InstIndex::from(pc)] {
                Opcode::Any => true,
                Opcode::Consume(inst) => inst.value == symbol,
                Opcode::ConsumeSet(inst) => self
                    .program
                    .sets()
                    .get(inst.idx)
                    .is_some_and(|set| set.matches(symbol)),
                _ => false,
            };
            if advance {
                seeds.push(pc + 1);
            }
        }
        // the scan is unanchored: a new start is live at every position.
        seeds.push(0);

        let next = self.intern(closure(self.program, seeds));
        self.states[*state as usize].next[byte as usize] = next;

        Some(next)
    }

    /// Returns the id of the state standing for `key`, materializing it on
    /// first sight.
    fn intern(&mut self, key: Box<[u32]>) -> u32 {
        if let Some(&id) = self.cache.get(&key) {
            return id;
        }

        let id = self.states.len() as u32;
        let is_match = key
            .iter()
            .any(|&pc| self.program[InstIndex::from(pc)] == Opcode::Match);
        self.states.push(State {
            key: key.clone(),
            next: Box::new([UNKNOWN; 256]),
            is_match,
        });
        self.cache.insert(key, id);

        id
    }
}

fn start_key(program: &Instructions) -> Box<[u32]> {
    closure(program, vec![0])
}

/// Follows every non-consuming instruction reachable from the seed program
/// counters, returning the sorted set of consuming and `Match` counters.
/// Save instructions are crossed and discarded.
fn closure(program: &Instructions, seeds: Vec<u32>) -> Box<[u32]> {
    let mut stack = seeds;
    let mut seen = BTreeSet::new();
    let mut out = BTreeSet::new();

    while let Some(pc) = stack.pop() {
        if !seen.insert(pc) {
            continue;
        }

        match program[InstIndex::from(pc)] {
            Opcode::Jmp(inst) => stack.push(inst.next.as_u32()),
            Opcode::Split(inst) => {
                stack.push(inst.x_branch.as_u32());
                stack.push(inst.y_branch.as_u32());
            }
            Opcode::StartSave(_) | Opcode::EndSave(_) => stack.push(pc + 1),
            Opcode::Any | Opcode::Consume(_) | Opcode::ConsumeSet(_) | Opcode::Match => {
                out.insert(pc);
            }
            // new() rejects programs carrying assertions.
            Opcode::Epsilon(_) => {}
        }
    }

    out.into_iter().collect()
}
