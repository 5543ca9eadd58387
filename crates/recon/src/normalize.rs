//! Canonical stock identifiers and source column resolution.

use std::fmt;

use serde::Serialize;

/// Canonical vehicle identifier: trimmed, uppercased, never empty.
///
/// Ordering is plain lexicographic on the canonical string, which is the
/// order reconciled records are emitted in.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct StockId(String);

impl StockId {
    /// Normalize a raw key from any source. Blank keys yield `None`.
    pub fn parse(raw: &str) -> Option<Self> {
        let canonical = raw.trim().to_uppercase();
        if canonical.is_empty() {
            None
        } else {
            Some(Self(canonical))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Prefix test against an already-canonical prefix.
    pub fn has_prefix(&self, prefix: &str) -> bool {
        !prefix.is_empty() && self.0.starts_with(prefix)
    }
}

impl fmt::Display for StockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Find the first alias (in priority order) present among `headers`.
///
/// Returns the header index and the alias that matched. Header names are
/// compared after trimming; aliases are matched case-sensitively since
/// sources use `Price` and `price` as distinct historical spellings.
pub fn resolve_column<'a>(headers: &[String], aliases: &'a [String]) -> Option<(usize, &'a str)> {
    aliases.iter().find_map(|alias| {
        headers
            .iter()
            .position(|h| h.trim() == alias.as_str())
            .map(|idx| (idx, alias.as_str()))
    })
}
