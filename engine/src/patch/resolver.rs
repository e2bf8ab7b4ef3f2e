//! Unique, indentation-correct needle localization.
//!
//! Models quote "old code" blocks with unreliable leading whitespace: a
//! nested block may arrive flush-left, or indented by some unrelated
//! amount. The resolver probes every indentation hypothesis and demands
//! exactly one line-boundary occurrence across all of them before it will
//! name a location.
//!
//! # Key invariant
//!
//! Matching compares whole lines only. `foo` can never match inside the
//! token `foobar`, and an unindented `foo` can never match a line reading
//! `    foo` - substring coincidences are exactly the corruption this
//! module exists to prevent.

use thiserror::Error;

/// Upper bound of the indentation probe walk.
pub const MAX_PROBE_INDENT: usize = 128;

/// The unique occurrence of a needle: the indentation it carries in the
/// haystack, its location, and the normalized lines that matched (so the
/// caller can splice precisely).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedMatch {
    pub indent: usize,
    /// Index of the first matched line in the haystack.
    pub line: usize,
    /// Number of matched lines.
    pub line_count: usize,
    /// The needle as it actually appears in the haystack.
    pub lines: Vec<String>,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MatchError {
    /// Worded so the message can be relayed verbatim to the model as a
    /// corrective instruction.
    #[error(
        "Old code block not found in the original file:\n```\n{needle}\n```\n\
         The old block must contain the exact same text as the original file \
         (including indentation and empty lines) in order to match."
    )]
    NotFound { needle: String },
    #[error(
        "Old code block found more than once ({count} matches) in the original file:\n```\n{needle}\n```\n\
         Provide a larger block (more surrounding context) to uniquely identify \
         the code that needs to be changed."
    )]
    Ambiguous { needle: String, count: usize },
}

impl MatchError {
    #[must_use]
    pub fn needle(&self) -> &str {
        match self {
            MatchError::NotFound { needle } | MatchError::Ambiguous { needle, .. } => needle,
        }
    }
}

/// Shift every line of `text` right by `indent` spaces, leaving blank lines
/// empty (source files do not indent empty lines, and neither do we when
/// rebasing replacement text).
pub(crate) fn rebase_lines(text: &str, indent: usize) -> Vec<String> {
    let pad = " ".repeat(indent);
    text.split('\n')
        .map(|line| {
            if line.trim().is_empty() {
                String::new()
            } else {
                format!("{pad}{line}")
            }
        })
        .collect()
}

/// Indent every line uniformly, blank lines included. This is the direct
/// probe candidate; the blank-lines-left-empty variant is tried only when
/// it finds nothing.
fn indent_all_lines(lines: &[&str], indent: usize) -> Vec<String> {
    let pad = " ".repeat(indent);
    lines.iter().map(|line| format!("{pad}{line}")).collect()
}

fn blank_lines_cleared(lines: &[String]) -> Vec<String> {
    lines
        .iter()
        .map(|line| {
            if line.trim().is_empty() {
                String::new()
            } else {
                line.clone()
            }
        })
        .collect()
}

/// Every start index at which `candidate` occurs in `haystack` as a run of
/// whole lines.
fn line_occurrences(haystack: &[&str], candidate: &[String]) -> Vec<usize> {
    if candidate.is_empty() || candidate.len() > haystack.len() {
        return Vec::new();
    }
    (0..=haystack.len() - candidate.len())
        .filter(|&start| {
            haystack[start..start + candidate.len()]
                .iter()
                .zip(candidate)
                .all(|(h, c)| *h == c)
        })
        .collect()
}

/// Find the unique, indentation-correct occurrence of `needle` in
/// `haystack`.
///
/// Probes indent levels from [`MAX_PROBE_INDENT`] down to 0, accumulating
/// every occurrence across every level rather than stopping at the first
/// hit: the walk order prefers the most-indented reading, and the full
/// accumulation is what lets us refuse ambiguous needles instead of
/// guessing.
pub fn resolve(haystack: &str, needle: &str) -> Result<ResolvedMatch, MatchError> {
    let haystack_lines: Vec<&str> = haystack.split('\n').collect();
    let needle_lines: Vec<&str> = needle.split('\n').collect();

    let mut found: Vec<ResolvedMatch> = Vec::new();

    for indent in (0..=MAX_PROBE_INDENT).rev() {
        let direct = indent_all_lines(&needle_lines, indent);
        let mut candidate = direct;
        let mut occurrences = line_occurrences(&haystack_lines, &candidate);
        if occurrences.is_empty() {
            candidate = blank_lines_cleared(&candidate);
            occurrences = line_occurrences(&haystack_lines, &candidate);
        }
        for start in occurrences {
            found.push(ResolvedMatch {
                indent,
                line: start,
                line_count: candidate.len(),
                lines: candidate.clone(),
            });
        }
    }

    match found.len() {
        0 => Err(MatchError::NotFound {
            needle: needle.to_string(),
        }),
        1 => Ok(found.remove(0)),
        count => Err(MatchError::Ambiguous {
            needle: needle.to_string(),
            count,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::{MatchError, rebase_lines, resolve};

    #[test]
    fn unindented_needle_matches_flush_left() {
        let found = resolve("first\nsecond\nthird", "second").expect("match");
        assert_eq!(found.indent, 0);
        assert_eq!(found.line, 1);
        assert_eq!(found.lines, vec!["second"]);
    }

    #[test]
    fn indentation_is_recovered() {
        let found = resolve("first\n    second\nthird", "second").expect("match");
        assert_eq!(found.indent, 4);
        assert_eq!(found.lines, vec!["    second"]);
    }

    #[test]
    fn repeated_line_is_ambiguous() {
        let err = resolve("line\nline", "line").unwrap_err();
        assert_eq!(
            err,
            MatchError::Ambiguous {
                needle: "line".to_string(),
                count: 2
            }
        );
    }

    #[test]
    fn two_indent_levels_are_ambiguous() {
        let haystack = "if a {\n    stop()\n}\nstop()";
        let err = resolve(haystack, "stop()").unwrap_err();
        match err {
            MatchError::Ambiguous { count, .. } => assert_eq!(count, 2),
            MatchError::NotFound { .. } => panic!("expected ambiguous"),
        }
    }

    #[test]
    fn substring_of_a_token_does_not_match() {
        let err = resolve("foobar", "foo").unwrap_err();
        assert!(matches!(err, MatchError::NotFound { .. }));
    }

    #[test]
    fn partial_line_indent_does_not_match() {
        // "foo" may not match the tail of "  foo" by substring coincidence.
        let found = resolve("  foo\nfoo", "foo");
        // Both lines match at their own indent levels: ambiguous, not a
        // silent pick.
        assert!(matches!(found, Err(MatchError::Ambiguous { count: 2, .. })));
    }

    #[test]
    fn multi_line_needle_matches_as_a_run() {
        let haystack = "fn f() {\n    let a = 1;\n    let b = 2;\n}";
        let found = resolve(haystack, "let a = 1;\nlet b = 2;").expect("match");
        assert_eq!(found.indent, 4);
        assert_eq!(found.line, 1);
        assert_eq!(found.line_count, 2);
    }

    #[test]
    fn blank_lines_in_needle_match_unindented_blanks() {
        let haystack = "fn f() {\n    let a = 1;\n\n    let b = 2;\n}";
        let found = resolve(haystack, "let a = 1;\n\nlet b = 2;").expect("match");
        assert_eq!(found.indent, 4);
        assert_eq!(found.lines[1], "");
    }

    #[test]
    fn needle_absent_is_not_found() {
        let err = resolve("alpha\nbeta", "gamma").unwrap_err();
        assert!(matches!(err, MatchError::NotFound { .. }));
        assert!(err.to_string().contains("gamma"));
    }

    #[test]
    fn matched_lines_reproduce_the_haystack_span() {
        let haystack = "a\n  b\n  c\nd";
        let found = resolve(haystack, "b\nc").expect("match");
        let span: Vec<&str> = haystack.split('\n').collect();
        assert_eq!(
            found.lines,
            span[found.line..found.line + found.line_count].to_vec()
        );
    }

    #[test]
    fn rebase_keeps_blank_lines_empty() {
        assert_eq!(rebase_lines("a\n\nb", 2), vec!["  a", "", "  b"]);
    }
}
