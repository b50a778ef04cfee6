//! The breadth-first NFA evaluator.
//!
//! Evaluation keeps two thread lists, one for the current input position and
//! one for the next, and advances both in lockstep over the haystack. A
//! sparse set keyed on instruction pointers guarantees at most one live
//! thread per instruction per position, which bounds a full search at
//! `O(instructions * input)` regardless of the pattern.
//!
//! Thread order encodes priority: a thread added earlier outranks every
//! thread added after it, which yields leftmost-first semantics once new
//! start-of-match threads are only appended while no match is pending.

use crate::input;
use crate::sparse_set::SparseSet;
use crate::{
    EpsilonCond, FastForward, InstConsume, InstConsumeSet, InstEndSave, InstEpsilon, InstIndex,
    InstJmp, InstSplit, InstStartSave, Instructions, Mode, Opcode, PatternMatch, SaveGroup,
    SaveGroupSlot,
};

#[derive(Debug)]
struct Thread {
    inst: InstIndex,
    saves: Box<[SaveGroup]>,
}

/// A priority-ordered list of live threads for one input position, deduped
/// by instruction pointer.
#[derive(Debug)]
struct ThreadList {
    gen: SparseSet,
    threads: Vec<Thread>,
}

impl ThreadList {
    fn new(max_insts: usize) -> Self {
        Self {
            gen: SparseSet::new(max_insts),
            threads: Vec::with_capacity(max_insts),
        }
    }

    fn is_empty(&self) -> bool {
        self.threads.is_empty()
    }

    fn clear(&mut self) {
        self.gen.clear();
        self.threads.clear();
    }
}

/// Adds a thread to a list, eagerly following every non-consuming
/// instruction reachable from it so that only consuming instructions and
/// `Match` ever sit in a list.
///
/// The traversal is an explicit-stack depth-first walk. For a `Split` the
/// x branch is pushed last so it and its whole closure are appended ahead
/// of the y branch, preserving branch priority.
fn add_thread(
    program: &Instructions,
    list: &mut ThreadList,
    thread: Thread,
    haystack: &[u8],
    at: usize,
) {
    let mut stack = vec![thread];

    while let Some(Thread { inst, mut saves }) = stack.pop() {
        if !list.gen.insert(inst.as_usize()) {
            continue;
        }

        match program[inst] {
            Opcode::Jmp(InstJmp { next }) => stack.push(Thread { inst: next, saves }),
            Opcode::Split(InstSplit { x_branch, y_branch }) => {
                stack.push(Thread {
                    inst: y_branch,
                    saves: saves.clone(),
                });
                stack.push(Thread {
                    inst: x_branch,
                    saves,
                });
            }
            Opcode::StartSave(InstStartSave { slot_id }) => {
                if let Some(slot) = saves.get_mut(slot_id) {
                    *slot = SaveGroup::Open { start: at };
                }
                stack.push(Thread {
                    inst: inst + 1,
                    saves,
                });
            }
            Opcode::EndSave(InstEndSave { slot_id }) => {
                if let Some(slot) = saves.get_mut(slot_id) {
                    if let SaveGroup::Open { start } = *slot {
                        *slot = SaveGroup::Complete { start, end: at };
                    }
                }
                stack.push(Thread {
                    inst: inst + 1,
                    saves,
                });
            }
            Opcode::Epsilon(InstEpsilon { cond }) => {
                if epsilon_cond_holds(cond, program.mode(), haystack, at) {
                    stack.push(Thread {
                        inst: inst + 1,
                        saves,
                    });
                }
            }
            Opcode::Any | Opcode::Consume(_) | Opcode::ConsumeSet(_) | Opcode::Match => {
                list.threads.push(Thread { inst, saves });
            }
        }
    }
}

fn epsilon_cond_holds(cond: EpsilonCond, mode: Mode, haystack: &[u8], at: usize) -> bool {
    match cond {
        EpsilonCond::StartOfInput => at == 0,
        EpsilonCond::EndOfInput => at == haystack.len(),
        EpsilonCond::StartOfLine => {
            at == 0 || input::decode_last(mode, haystack, at) == Some('\n')
        }
        EpsilonCond::EndOfLine => {
            at == haystack.len() || matches!(input::decode(mode, haystack, at), Some(('\n', _)))
        }
        EpsilonCond::WordBoundary | EpsilonCond::NonWordBoundary => {
            let before = input::decode_last(mode, haystack, at)
                .is_some_and(input::is_word_char);
            let after = input::decode(mode, haystack, at)
                .is_some_and(|(ch, _)| input::is_word_char(ch));

            if cond == EpsilonCond::WordBoundary {
                before != after
            } else {
                before == after
            }
        }
    }
}

/// Skips ahead to the next offset at which a match could possibly begin,
/// per the program's fast-forward hint. `None` means no candidate start
/// remains in the haystack.
fn fast_forward(program: &Instructions, haystack: &[u8], at: usize) -> Option<usize> {
    match program.fast_forward() {
        FastForward::None => Some(at),
        FastForward::Char(c) => {
            memchr::memchr(*c as u8, haystack.get(at..)?).map(|offset| at + offset)
        }
        FastForward::Literal(lit) => {
            memchr::memmem::find(haystack.get(at..)?, lit.as_bytes()).map(|offset| at + offset)
        }
        FastForward::Set(idx) => {
            let set = program.sets().get(*idx)?;
            let mut pos = at;
            while let Some((ch, width)) = input::decode(program.mode(), haystack, pos) {
                if set.matches(ch) {
                    return Some(pos);
                }
                pos += width;
            }
            None
        }
    }
}

/// Runs `program` over `haystack` beginning the scan at byte offset
/// `start`, returning the leftmost-first match if one exists.
///
/// With `earliest` set, returns as soon as any match is seen rather than
/// running pending higher-priority threads to completion; the reported
/// ranges are then valid but not necessarily the leftmost-first ones.
pub(crate) fn search(
    program: &Instructions,
    haystack: &[u8],
    start: usize,
    earliest: bool,
) -> Option<PatternMatch> {
    if program.is_empty() || start > haystack.len() {
        return None;
    }

    let slots = program.save_groups().max(1);
    let mut clist = ThreadList::new(program.len());
    let mut nlist = ThreadList::new(program.len());
    let mut matched: Option<Box<[SaveGroupSlot]>> = None;
    let mut at = start;

    loop {
        // While no thread is live and no match is pending, the scan
        // position is free to jump to the next plausible start.
        if matched.is_none() && clist.is_empty() {
            match fast_forward(program, haystack, at) {
                Some(pos) => at = pos,
                None => break,
            }
        }

        // A fresh start-of-match thread joins at the lowest priority, and
        // only while no match is pending; both are required for
        // leftmost-first selection.
        if matched.is_none() {
            let saves = vec![SaveGroup::None; slots].into_boxed_slice();
            add_thread(
                program,
                &mut clist,
                Thread {
                    inst: InstIndex::from(0),
                    saves,
                },
                haystack,
                at,
            );
        }

        let symbol = input::decode(program.mode(), haystack, at);

        'step: for i in 0..clist.threads.len() {
            let inst = clist.threads[i].inst;

            match program[inst] {
                Opcode::Match => {
                    let saves = std::mem::take(&mut clist.threads[i].saves);
                    let groups: Box<[SaveGroupSlot]> =
                        saves.iter().copied().map(SaveGroupSlot::from).collect();

                    if earliest {
                        return Some(PatternMatch::new(groups));
                    }

                    // Threads after this one carry strictly lower priority
                    // and can no longer influence the result.
                    matched = Some(groups);
                    break 'step;
                }
                Opcode::Any => {
                    if let Some((_, width)) = symbol {
                        let saves = std::mem::take(&mut clist.threads[i].saves);
                        add_thread(
                            program,
                            &mut nlist,
                            Thread {
                                inst: inst + 1,
                                saves,
                            },
                            haystack,
                            at + width,
                        );
                    }
                }
                Opcode::Consume(InstConsume { value }) => {
                    if let Some((ch, width)) = symbol {
                        if ch == value {
                            let saves = std::mem::take(&mut clist.threads[i].saves);
                            add_thread(
                                program,
                                &mut nlist,
                                Thread {
                                    inst: inst + 1,
                                    saves,
                                },
                                haystack,
                                at + width,
                            );
                        }
                    }
                }
                Opcode::ConsumeSet(InstConsumeSet { idx }) => {
                    if let Some((ch, width)) = symbol {
                        let in_set = program.sets().get(idx).is_some_and(|set| set.matches(ch));
                        if in_set {
                            let saves = std::mem::take(&mut clist.threads[i].saves);
                            add_thread(
                                program,
                                &mut nlist,
                                Thread {
                                    inst: inst + 1,
                                    saves,
                                },
                                haystack,
                                at + width,
                            );
                        }
                    }
                }
                // The closure in add_thread never parks a thread on a
                // non-consuming instruction.
                _ => {}
            }
        }

        std::mem::swap(&mut clist, &mut nlist);
        nlist.clear();

        let Some((_, width)) = symbol else { break };
        at += width;

        if matched.is_some() && clist.is_empty() {
            break;
        }
    }

    matched.map(PatternMatch::new)
}

/// A lazy iterator over successive non-overlapping matches, resuming each
/// search at the end of the previous match and stepping over one symbol
/// after an empty match to guarantee progress.
#[derive(Debug)]
pub struct Matches<'r, 'h> {
    program: &'r Instructions,
    haystack: &'h [u8],
    at: usize,
    done: bool,
}

impl<'r, 'h> Matches<'r, 'h> {
    pub(crate) fn new(program: &'r Instructions, haystack: &'h [u8]) -> Self {
        Self {
            program,
            haystack,
            at: 0,
            done: false,
        }
    }
}

impl Iterator for Matches<'_, '_> {
    type Item = PatternMatch;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let Some(m) = search(self.program, self.haystack, self.at, false) else {
            self.done = true;
            return None;
        };

        let range = m.full_range();
        self.at = if range.is_empty() {
            range.end
                + input::decode(self.program.mode(), self.haystack, range.end)
                    .map_or(1, |(_, width)| width)
        } else {
            range.end
        };

        if self.at > self.haystack.len() {
            self.done = true;
        }

        Some(m)
    }
}
