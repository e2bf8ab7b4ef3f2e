//! Indentation-aware block patching.
//!
//! [`resolver`] localizes an "old code" block inside a file even when the
//! model quoted it at the wrong indentation; [`applier`] runs an ordered
//! list of old/new pairs through the resolver and splices the replacements
//! in. Both are pure text functions: all file IO stays in the caller.

pub mod applier;
pub mod resolver;

pub use applier::apply;
pub use resolver::{MAX_PROBE_INDENT, MatchError, ResolvedMatch, resolve};
