//! Match counts over a small prose corpus, the patterns drawn from the
//! usual Twain-flavored benchmark set.

use relin_compiler::{compile, Options};
use relin_runtime::Mode;

const TEXT: &str = "\
Tom appeared on the sidewalk with a bucket of whitewash.
Huckleberry Finn and Tom Sawyer went fishing by the river.
Twain wrote of the Mississippi.
twain, said the riverboat man.
";

fn count(pattern: &str, options: Options) -> usize {
    compile(pattern, options)
        .expect("should compile")
        .search_all(TEXT.as_bytes())
        .count()
}

#[test]
fn should_count_plain_literal_occurrences() {
    assert_eq!(1, count("Twain", Options::default()));
    assert_eq!(2, count("river", Options::default()));
}

#[test]
fn should_count_case_folded_occurrences() {
    assert_eq!(2, count("twain", Options::default().with_case_insensitive()));
}

#[test]
fn should_count_alternation_of_names() {
    // Tom x2, Huckleberry, Finn, Sawyer.
    assert_eq!(5, count("Tom|Sawyer|Huckleberry|Finn", Options::default()));
}

#[test]
fn should_count_line_anchored_matches() {
    assert_eq!(2, count("^T\\w+", Options::default().with_multiline()));
}

#[test]
fn should_count_class_prefixed_literals() {
    // "fishing" contains "ishing".
    assert_eq!(1, count("[a-z]shing", Options::default()));
}

#[test]
fn should_count_whole_words_only() {
    assert_eq!(1, count("\\briver\\b", Options::default()));
    assert_eq!(1, count("\\b\\w+ing\\b", Options::default()));
}

#[test]
fn should_count_bounded_context_around_names() {
    let with_context = count(".{0,2}(Tom|Sawyer|Huckleberry|Finn)", Options::default());
    let bare = count("Tom|Sawyer|Huckleberry|Finn", Options::default());

    assert_eq!(bare, with_context);
}

#[test]
fn should_agree_across_modes_on_ascii_text() {
    for pattern in ["Tom|Finn", "\\w+ing", "river.?"] {
        let char_count = count(pattern, Options::default());
        let byte_count = count(pattern, Options::default().with_mode(Mode::Byte));

        assert_eq!(char_count, byte_count, "divergence for {:?}", pattern);
    }
}

#[test]
fn should_capture_name_suffixes() {
    let program =
        compile("([A-Za-z]awyer|[A-Za-z]inn)\\s", Options::default()).expect("should compile");

    let captures: Vec<_> = program
        .search_all(TEXT.as_bytes())
        .map(|m| m.group(1).expect("group should participate"))
        .collect();

    // "Finn " and "Sawyer " both appear once followed by whitespace.
    assert_eq!(2, captures.len());
}
