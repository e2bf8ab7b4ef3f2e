//! Block pair edits.

/// One proposed localized edit: the old code to find and the new code to
/// put in its place.
///
/// Pairs are produced by pairing a response's fenced segments in order; the
/// pairing itself (and its odd-count failure mode) lives in the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockPair {
    pub old: String,
    pub new: String,
}

impl BlockPair {
    #[must_use]
    pub fn new(old: impl Into<String>, new: impl Into<String>) -> Self {
        Self {
            old: old.into(),
            new: new.into(),
        }
    }
}
