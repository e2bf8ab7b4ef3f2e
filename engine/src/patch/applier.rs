//! Ordered application of old/new block pairs.
//!
//! Pairs apply strictly in sequence because a later `old` block may only
//! exist once an earlier replacement has happened. The first pair that
//! fails to localize aborts the whole call; the caller's content is never
//! mutated, so a failed `apply` is observationally a no-op.

use mend_types::BlockPair;

use super::resolver::{self, MatchError, ResolvedMatch};

/// Apply `pairs` to `content`, returning the patched text.
///
/// An empty pair list returns the content unchanged. On error the caller
/// keeps its original content; partial application is never observable.
pub fn apply(content: &str, pairs: &[BlockPair]) -> Result<String, MatchError> {
    let mut current = content.to_string();
    for pair in pairs {
        let found = resolver::resolve(&current, &pair.old)?;
        current = splice(&current, &found, &pair.new);
    }
    Ok(current)
}

/// Replace the matched line span with the replacement rebased to the
/// resolved indentation.
fn splice(content: &str, found: &ResolvedMatch, replacement: &str) -> String {
    let mut lines: Vec<String> = content.split('\n').map(str::to_string).collect();
    let rebased = resolver::rebase_lines(replacement, found.indent);
    lines.splice(found.line..found.line + found.line_count, rebased);
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use mend_types::BlockPair;

    use super::apply;
    use crate::patch::resolver::MatchError;

    #[test]
    fn empty_pair_list_is_a_no_op() {
        let content = "a\nb\nc";
        assert_eq!(apply(content, &[]).unwrap(), content);
    }

    #[test]
    fn replaces_a_flush_left_line() {
        let result = apply(
            "first\nsecond\nthird",
            &[BlockPair::new("second", "X")],
        )
        .unwrap();
        assert_eq!(result, "first\nX\nthird");
    }

    #[test]
    fn rebases_replacement_to_resolved_indent() {
        let result = apply(
            "first\n    second\nthird",
            &[BlockPair::new("second", "X")],
        )
        .unwrap();
        assert_eq!(result, "first\n    X\nthird");
    }

    #[test]
    fn multi_line_replacement_indents_every_line() {
        let content = "fn f() {\n    old();\n}";
        let result = apply(
            content,
            &[BlockPair::new("old();", "first();\nsecond();")],
        )
        .unwrap();
        assert_eq!(result, "fn f() {\n    first();\n    second();\n}");
    }

    #[test]
    fn blank_lines_in_replacement_stay_unindented() {
        let content = "fn f() {\n    old();\n}";
        let result = apply(content, &[BlockPair::new("old();", "a();\n\nb();")]).unwrap();
        assert_eq!(result, "fn f() {\n    a();\n\n    b();\n}");
    }

    #[test]
    fn not_found_pair_fails_whole_call() {
        let content = "alpha\nbeta";
        let err = apply(
            content,
            &[
                BlockPair::new("alpha", "ALPHA"),
                BlockPair::new("missing", "X"),
            ],
        )
        .unwrap_err();
        assert!(matches!(err, MatchError::NotFound { .. }));
        // The caller's content is untouched by construction; nothing to
        // roll back.
        assert_eq!(content, "alpha\nbeta");
    }

    #[test]
    fn ambiguous_pair_reports_count() {
        let err = apply("line\nline", &[BlockPair::new("line", "X")]).unwrap_err();
        assert_eq!(
            err,
            MatchError::Ambiguous {
                needle: "line".to_string(),
                count: 2
            }
        );
    }

    #[test]
    fn pairs_apply_sequentially() {
        // The second pair's old block only exists after the first applied.
        let result = apply(
            "start",
            &[
                BlockPair::new("start", "middle"),
                BlockPair::new("middle", "end"),
            ],
        )
        .unwrap();
        assert_eq!(result, "end");
    }

    #[test]
    fn round_trip_restores_original() {
        let content = "one\ntwo\nthree";
        let there = apply(content, &[BlockPair::new("two", "TWO")]).unwrap();
        let back = apply(&there, &[BlockPair::new("TWO", "two")]).unwrap();
        assert_eq!(back, content);
    }

    #[test]
    fn empty_replacement_leaves_an_empty_line() {
        let result = apply("a\nb\nc", &[BlockPair::new("b", "")]).unwrap();
        assert_eq!(result, "a\n\nc");
    }
}
