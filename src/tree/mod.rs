//! Positional tree over parsed workflow text.
//!
//! This module models a YAML document as a tree of [`Node`]s, each carrying
//! its byte range in the source, an optional mapping key and an optional raw
//! scalar. Navigation goes through [`NodeRef`]:
//!
//! - **Generic queries**: [`NodeRef::child`], [`NodeRef::find_child_nodes`],
//!   [`NodeRef::find_parent`], [`NodeRef::descendants`]
//! - **Field helpers**: [`NodeRef::id`], [`NodeRef::name`],
//!   [`NodeRef::description`], [`NodeRef::required`], [`NodeRef::key_or_id_or_name`]
//! - **Workflow filters**: [`NodeRef::find_parent_job`],
//!   [`NodeRef::find_parent_step`], [`NodeRef::dependency_ids`] and friends
//!
//! Trees are produced by [`yaml::parse_document`] or assembled by hand with
//! [`Document::push_child`].
//!
//! # Example
//!
//! ```rust
//! use wflens::tree::yaml;
//!
//! # fn main() -> anyhow::Result<()> {
//! let doc = yaml::parse_document("ci.yml", "jobs:\n  test:\n    needs: [build, lint]\n")?;
//! let needs = doc.root().find_child_nodes(|n| n.key() == Some("needs"))[0];
//! assert_eq!(needs.find_parent_job().and_then(|j| j.key()), Some("test"));
//! assert_eq!(needs.dependency_ids().len(), 2);
//! # Ok(())
//! # }
//! ```

mod filters;
mod node;
pub mod yaml;

pub use node::{Descendants, Document, Node, NodeId, NodeRef, TextRange};

/// Strip one pair of matching surrounding quotes (`"` or `'`) and whitespace.
#[must_use]
pub fn remove_quotes(text: &str) -> &str {
    let trimmed = text.trim();
    for quote in ['"', '\''] {
        if trimmed.len() >= 2 && trimmed.starts_with(quote) && trimmed.ends_with(quote) {
            return &trimmed[1..trimmed.len() - 1];
        }
    }
    trimmed
}

/// Value of a YAML block scalar (`|` literal or `>` folded) written as
/// `text`, header line included.
///
/// Lines are dedented by the indentation of the first non-blank line. Folded
/// scalars join adjacent lines with a space unless either is more indented;
/// blank lines stay as newlines. The trailing newline follows the chomping
/// indicator: kept once by default, dropped by `-`, all kept by `+`.
///
/// Returns `None` when `text` does not start with a block indicator.
///
/// ```rust
/// use wflens::tree::fold_block_scalar;
///
/// let text = ">\n  The branch,\n  tag or SHA.";
/// assert_eq!(fold_block_scalar(text).as_deref(), Some("The branch, tag or SHA.\n"));
/// assert_eq!(fold_block_scalar("plain"), None);
/// ```
#[must_use]
pub fn fold_block_scalar(text: &str) -> Option<String> {
    let folded = match text.chars().next()? {
        '>' => true,
        '|' => false,
        _ => return None,
    };
    let (header, body) = text.split_once('\n').unwrap_or((text, ""));
    let chomping = header[1..].chars().take_while(|c| !c.is_whitespace()).find(|c| matches!(c, '-' | '+'));

    let lines: Vec<&str> = body.lines().collect();
    let indent = lines
        .iter()
        .find(|line| !line.trim().is_empty())
        .map_or(0, |line| line.len() - line.trim_start_matches(' ').len());
    let dedented: Vec<&str> = lines
        .iter()
        .map(|line| {
            if line.trim().is_empty() {
                ""
            } else {
                let strip = (line.len() - line.trim_start_matches(' ').len()).min(indent);
                &line[strip..]
            }
        })
        .collect();
    let content_len = dedented.iter().rposition(|line| !line.is_empty()).map_or(0, |i| i + 1);
    let trailing_blank = dedented.len() - content_len;

    let more_indented = |line: &str| line.starts_with([' ', '\t']);
    let mut value = String::new();
    let mut previous: Option<&str> = None;
    let mut blank = 0;
    for &line in &dedented[..content_len] {
        if line.is_empty() {
            blank += 1;
            continue;
        }
        match previous {
            Some(prev) if folded && !more_indented(prev) && !more_indented(line) => {
                if blank == 0 {
                    value.push(' ');
                } else {
                    value.push_str(&"\n".repeat(blank));
                }
            }
            Some(_) => value.push_str(&"\n".repeat(blank + 1)),
            None => value.push_str(&"\n".repeat(blank)),
        }
        value.push_str(line);
        previous = Some(line);
        blank = 0;
    }

    match chomping {
        Some('-') => {}
        Some(_) => value.push_str(&"\n".repeat(trailing_blank + 1)),
        None if !value.is_empty() => value.push('\n'),
        None => {}
    }
    Some(value)
}
