//! The behavioral contracts of the engine, exercised through compiled
//! patterns rather than hand-assembled programs.

use relin_compiler::{compile, CompileError, Error, Options};
use relin_runtime::dfa::LazyDfa;
use relin_runtime::Mode;

fn ranges(pattern: &str, options: Options, haystack: &[u8]) -> Vec<std::ops::Range<usize>> {
    compile(pattern, options)
        .expect("should compile")
        .search_all(haystack)
        .map(|m| m.full_range())
        .collect()
}

#[test]
fn should_select_the_leftmost_first_match() {
    let program = compile("a|ab", Options::default()).expect("should compile");

    // the first alternate wins even though a longer match exists.
    assert_eq!(
        Some(0..1),
        program.search(b"ab", 0).map(|m| m.full_range())
    );

    // an earlier start always beats a longer later match.
    let program = compile("a+|b+", Options::default()).expect("should compile");
    assert_eq!(
        Some(0..1),
        program.search(b"abbbb", 0).map(|m| m.full_range())
    );
}

#[test]
fn should_distinguish_greedy_from_lazy_quantifiers() {
    let greedy = compile("a+", Options::default()).expect("should compile");
    let lazy = compile("a+?", Options::default()).expect("should compile");

    assert_eq!(Some(0..3), greedy.search(b"aaa", 0).map(|m| m.full_range()));
    assert_eq!(Some(0..1), lazy.search(b"aaa", 0).map(|m| m.full_range()));
}

#[test]
fn should_anchor_line_starts_only_under_multiline() {
    let haystack = b"Twain wrote.\nSo did Twain.\nTwain again.";

    assert_eq!(
        vec![0..5, 27..32],
        ranges("^Twain", Options::default().with_multiline(), haystack)
    );
    assert_eq!(vec![0..5], ranges("^Twain", Options::default(), haystack));
}

#[test]
fn should_anchor_line_ends_only_under_multiline() {
    let haystack = b"one\ntwo\nthree";

    assert_eq!(
        vec![0..3, 4..7, 8..13],
        ranges("\\w+$", Options::default().with_multiline(), haystack)
    );
    assert_eq!(vec![8..13], ranges("\\w+$", Options::default(), haystack));
}

#[test]
fn should_enumerate_non_overlapping_matches() {
    assert_eq!(
        vec![0..1, 1..2, 2..3],
        ranges("a", Options::default(), b"aaa")
    );
    assert_eq!(
        vec![0..2, 2..4],
        ranges("aa", Options::default(), b"aaaa")
    );
}

#[test]
fn should_make_progress_over_empty_matches() {
    assert_eq!(
        vec![0..0, 1..1, 2..2],
        ranges("a?", Options::default(), b"bb")
    );
}

#[test]
fn should_stay_linear_on_nested_quantifiers() {
    // a backtracking engine blows up exponentially on this pattern when
    // the trailing `b` is absent.
    let program = compile("(a+)+b", Options::default()).expect("should compile");
    let haystack = vec![b'a'; 5000];

    assert_eq!(None, program.search(&haystack, 0));

    let mut with_b = haystack.clone();
    with_b.push(b'b');
    assert_eq!(
        Some(0..5001),
        program.search(&with_b, 0).map(|m| m.full_range())
    );
}

#[test]
fn should_distinguish_unset_groups_from_empty_captures() {
    let program = compile("(a)(b)?", Options::default()).expect("should compile");

    let m = program.search(b"ac", 0).expect("should match");
    assert_eq!(Some(0..1), m.group(1));
    assert_eq!(None, m.group(2));

    // an empty capture participates and reports a zero-length range.
    let program = compile("(a)(b*)c", Options::default()).expect("should compile");
    let m = program.search(b"ac", 0).expect("should match");
    assert_eq!(Some(1..1), m.group(2));
}

#[test]
fn should_report_the_final_iteration_of_a_repeated_group() {
    let program = compile("(a|b)+", Options::default()).expect("should compile");
    let m = program.search(b"abab", 0).expect("should match");

    assert_eq!(0..4, m.full_range());
    assert_eq!(Some(3..4), m.group(1));
}

#[test]
fn should_reject_multiplied_counted_repetitions_before_expanding() {
    assert_eq!(
        Err(Error::Compile(CompileError::PatternTooLarge)),
        compile("a{100000}{100000}", Options::default())
    );
}

#[test]
fn should_produce_identical_results_across_runs() {
    let haystack = b"the quick brown fox jumps over the lazy dog";
    let program = compile("\\b\\w{5}\\b", Options::default()).expect("should compile");

    let first: Vec<_> = program.search_all(haystack).collect();
    let second: Vec<_> = program.search_all(haystack).collect();
    assert_eq!(first, second);

    let recompiled = compile("\\b\\w{5}\\b", Options::default()).expect("should compile");
    assert_eq!(program, recompiled);
}

#[test]
fn should_diverge_between_modes_on_non_ascii_input() {
    let haystack = "café".as_bytes();

    let char_program = compile("é", Options::default()).expect("should compile");
    assert_eq!(
        Some(3..5),
        char_program.search(haystack, 0).map(|m| m.full_range())
    );

    // in byte mode the pattern char is the Latin-1 byte 0xE9, which never
    // appears in the utf8 encoding.
    let byte_program = compile(
        "\\x{e9}",
        Options::default().with_mode(Mode::Byte),
    )
    .expect("should compile");
    assert_eq!(None, byte_program.search(haystack, 0));
    assert_eq!(
        Some(3..4),
        byte_program
            .search(b"caf\xe9", 0)
            .map(|m| m.full_range())
    );
}

#[test]
fn should_count_dot_symbols_per_mode() {
    // é spans two bytes in utf8, so byte mode sees two symbols where char
    // mode sees one.
    let haystack = "é".as_bytes();

    let char_dot = compile(".", Options::default()).expect("should compile");
    assert_eq!(1, char_dot.search_all(haystack).count());

    let byte_dot =
        compile(".", Options::default().with_mode(Mode::Byte)).expect("should compile");
    assert_eq!(2, byte_dot.search_all(haystack).count());
}

#[test]
fn should_agree_between_dfa_and_thread_evaluator() {
    let options = Options::default().with_mode(Mode::Byte);

    for pattern in ["ab*a", "[0-9]+", "Tom|Sawyer|Huckleberry|Finn", "a(?:bc)?d"] {
        let program = compile(pattern, options).expect("should compile");
        let mut dfa = LazyDfa::new(&program).expect("byte-mode program should be supported");

        for haystack in [
            &b""[..],
            b"aa",
            b"abbba",
            b"x123y",
            b"Huckleberry Finn",
            b"abcd ad abd",
            b"no digits here",
        ] {
            assert_eq!(
                program.is_match(haystack),
                dfa.is_match(haystack),
                "divergence for {:?} on {:?}",
                pattern,
                haystack
            );
        }
    }
}

#[test]
fn should_route_anchored_patterns_past_the_dfa() {
    let program = compile("^a", Options::default().with_mode(Mode::Byte))
        .expect("should compile");

    assert!(LazyDfa::new(&program).is_none());
    assert!(program.is_match(b"abc"));
}

#[test]
fn should_honor_word_boundaries_through_the_full_stack() {
    let haystack = b"cat catalog concat cat";

    assert_eq!(
        vec![0..3, 19..22],
        ranges("\\bcat\\b", Options::default(), haystack)
    );
}

#[test]
fn should_fold_case_across_literals_and_classes() {
    let options = Options::default().with_case_insensitive();

    assert_eq!(
        vec![0..5, 6..11],
        ranges("twain", options, b"Twain TWAIN")
    );
    assert_eq!(
        vec![0..1, 1..2, 2..3],
        ranges("[x-z]", options, b"XyZ")
    );
}

#[test]
fn should_anchor_input_boundaries_regardless_of_multiline() {
    let options = Options::default().with_multiline();
    let haystack = b"ab\nab";

    assert_eq!(vec![0..2], ranges("\\Aab", options, haystack));
    assert_eq!(vec![3..5], ranges("ab\\z", options, haystack));
}
