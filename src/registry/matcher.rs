//! Glob compilation for watch interest patterns.
//!
//! Built on `glob::Pattern` with literal separators, so `*` and `?` stay within
//! one path segment and `**` spans segments. `glob` has no `{a,b}` alternation,
//! so braces are expanded up front into one pattern per alternative.

use glob::{MatchOptions, Pattern};

use crate::error::{Result, SyncError};

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// A compiled interest glob.
#[derive(Debug, Clone)]
pub struct CompiledGlob {
    source: String,
    alternatives: Vec<Alternative>,
}

#[derive(Debug, Clone)]
struct Alternative {
    pattern: Pattern,
    /// Pattern has no separator: also tried against the final path segment.
    basename: bool,
}

impl CompiledGlob {
    pub fn new(source: &str) -> Result<Self> {
        let alternatives = expand_braces(source)
            .into_iter()
            .map(|alt| {
                let pattern = Pattern::new(&alt).map_err(|e| SyncError::InvalidPattern {
                    pattern: source.to_string(),
                    message: e.to_string(),
                })?;
                Ok(Alternative {
                    basename: !alt.contains('/'),
                    pattern,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            source: source.to_string(),
            alternatives,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Test a `/`-separated path (relative to the pattern's base, or absolute
    /// for absolute patterns).
    pub fn matches(&self, path: &str) -> bool {
        let basename = path.rsplit('/').next().unwrap_or(path);
        self.alternatives.iter().any(|alt| {
            alt.pattern.matches_with(path, MATCH_OPTIONS)
                || (alt.basename && alt.pattern.matches_with(basename, MATCH_OPTIONS))
        })
    }
}

/// Expand `{a,b}` alternation into the full list of plain patterns.
///
/// Nested groups and several groups per pattern are supported. An unbalanced
/// `{` is left as a literal.
pub fn expand_braces(pattern: &str) -> Vec<String> {
    let Some(open) = pattern.find('{') else {
        return vec![pattern.to_string()];
    };

    let mut depth = 0usize;
    let mut close = None;
    let mut splits = Vec::new();
    for (i, c) in pattern[open..].char_indices() {
        let idx = open + i;
        match c {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    close = Some(idx);
                    break;
                }
            }
            ',' if depth == 1 => splits.push(idx),
            _ => {}
        }
    }

    let Some(close) = close else {
        return vec![pattern.to_string()];
    };

    let prefix = &pattern[..open];
    let suffix = &pattern[close + 1..];

    let mut bounds = Vec::with_capacity(splits.len() + 2);
    bounds.push(open);
    bounds.extend(splits);
    bounds.push(close);

    bounds
        .windows(2)
        .flat_map(|w| {
            let alt = &pattern[w[0] + 1..w[1]];
            expand_braces(&format!("{}{}{}", prefix, alt, suffix))
        })
        .collect()
}
