//! Fenced code-block extraction from model responses.
//!
//! A patch response alternates old/new fenced blocks; anything outside the
//! fences is commentary and is ignored. An odd number of fenced segments is
//! a malformed response and is reported, never silently dropped.

use std::sync::LazyLock;

use mend_types::BlockPair;
use regex::Regex;
use thiserror::Error;

static FENCED_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```[a-z0-9]*\n(.*?)\n```").expect("fenced block pattern compiles")
});

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error(
    "response contained {count} fenced code blocks; each change must contain \
     an old code block followed by a new code block"
)]
pub struct UnpairedBlocks {
    pub count: usize,
}

/// Every fenced code block in `response`, in order, fences stripped.
#[must_use]
pub fn code_blocks(response: &str) -> Vec<String> {
    FENCED_BLOCK
        .captures_iter(response)
        .map(|cap| cap[1].to_string())
        .collect()
}

/// Pair fenced segments into old/new block pairs.
pub fn block_pairs(blocks: Vec<String>) -> Result<Vec<BlockPair>, UnpairedBlocks> {
    if blocks.len() % 2 != 0 {
        return Err(UnpairedBlocks {
            count: blocks.len(),
        });
    }
    let mut pairs = Vec::with_capacity(blocks.len() / 2);
    let mut iter = blocks.into_iter();
    while let (Some(old), Some(new)) = (iter.next(), iter.next()) {
        pairs.push(BlockPair { old, new });
    }
    Ok(pairs)
}

#[cfg(test)]
mod tests {
    use super::{block_pairs, code_blocks};

    #[test]
    fn extracts_blocks_and_ignores_prose() {
        let response = "Here is the change:\n```\nold code\n```\nbecomes\n```\nnew code\n```\nDone.";
        assert_eq!(code_blocks(response), vec!["old code", "new code"]);
    }

    #[test]
    fn language_tags_are_stripped() {
        let response = "```rust\nfn a() {}\n```\n```rust\nfn b() {}\n```";
        assert_eq!(code_blocks(response), vec!["fn a() {}", "fn b() {}"]);
    }

    #[test]
    fn multi_line_blocks_keep_interior_newlines() {
        let response = "```\nline one\nline two\n```";
        assert_eq!(code_blocks(response), vec!["line one\nline two"]);
    }

    #[test]
    fn no_blocks_means_no_pairs() {
        assert_eq!(code_blocks("no fences here"), Vec::<String>::new());
        assert!(block_pairs(Vec::new()).unwrap().is_empty());
    }

    #[test]
    fn pairs_in_order() {
        let pairs = block_pairs(vec![
            "a".to_string(),
            "b".to_string(),
            "c".to_string(),
            "d".to_string(),
        ])
        .unwrap();
        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[0].old, "a");
        assert_eq!(pairs[0].new, "b");
        assert_eq!(pairs[1].old, "c");
        assert_eq!(pairs[1].new, "d");
    }

    #[test]
    fn odd_count_is_malformed() {
        let err = block_pairs(vec!["a".to_string()]).unwrap_err();
        assert_eq!(err.count, 1);
    }
}
