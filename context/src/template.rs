//! Fenced file-block substitution.
//!
//! User messages embed file contents as a `**path**:` header line followed
//! by a bare triple-backtick fenced block holding the file body.
//!
//! Before each send the block body is replaced with the file's current
//! content. The pass works on a line-structured segmentation of the
//! message, never on regex over raw text: the injected content is spliced
//! verbatim, so literal backslashes, quotes and tabs in either the message
//! or the file survive byte-for-byte, and nothing can collide with the
//! fence delimiters.

/// A recognized file block: header line index, closing fence line index,
/// and the path the header names.
struct FileBlock<'a> {
    header: usize,
    close: usize,
    path: &'a str,
}

/// Extract the path from a `**path**` or `**path**:` header line.
fn parse_header(line: &str) -> Option<&str> {
    let rest = line.strip_prefix("**")?;
    let path = rest
        .strip_suffix("**:")
        .or_else(|| rest.strip_suffix("**"))?;
    if path.is_empty() || path.contains("**") {
        return None;
    }
    Some(path)
}

fn find_block<'a>(lines: &[&'a str], start: usize) -> Option<FileBlock<'a>> {
    let path = parse_header(lines[start])?;
    if lines.get(start + 1).copied() != Some("```") {
        return None;
    }
    let close = (start + 2..lines.len()).find(|&j| lines[j] == "```")?;
    Some(FileBlock {
        header: start,
        close,
        path,
    })
}

/// Rewrite every recognized file block whose path `lookup` knows, splicing
/// the new content in verbatim.
///
/// Returns `None` when nothing was rewritten (no marker present, or no
/// known path): substitution is best-effort, and untouched messages pass
/// through unmodified.
pub fn rewrite_file_blocks(
    message: &str,
    mut lookup: impl FnMut(&str) -> Option<String>,
) -> Option<String> {
    let lines: Vec<&str> = message.split('\n').collect();
    let mut out: Vec<String> = Vec::with_capacity(lines.len());
    let mut changed = false;
    let mut i = 0;

    while i < lines.len() {
        if let Some(block) = find_block(&lines, i)
            && let Some(content) = lookup(block.path)
        {
            // Header and fences are preserved as found; only the body is
            // replaced.
            out.push(lines[block.header].to_string());
            out.push("```".to_string());
            out.extend(content.split('\n').map(str::to_string));
            out.push("```".to_string());
            changed = true;
            i = block.close + 1;
            continue;
        }
        out.push(lines[i].to_string());
        i += 1;
    }

    changed.then(|| out.join("\n"))
}
