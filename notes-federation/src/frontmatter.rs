//! Line-oriented parser for the `---` delimited header of a raw note file.
//!
//! Grammar:
//!
//! ```text
//! document    = fence NEWLINE *( entry-line NEWLINE ) fence [ NEWLINE body ]
//! fence       = "---"
//! entry-line  = key ":" value | anything-else     ; other lines are ignored
//! key         = 1*( ALPHA / DIGIT / "_" )
//! value       = [ DQUOTE ] text [ DQUOTE ]         ; one surrounding pair stripped
//! ```
//!
//! The value is everything after the first colon, so `url: https://x.dev`
//! keeps its embedded colon.

const FENCE: &str = "---";

/// Key/value pairs of a front-matter block, in source order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrontMatter {
    entries: Vec<(String, String)>,
}

impl FrontMatter {
    /// Extract the front-matter block at the start of `content`.
    ///
    /// Returns `None` when the content does not open with a fence or the
    /// block is never closed.
    pub fn parse(content: &str) -> Option<Self> {
        let content = content.strip_prefix('\u{feff}').unwrap_or(content);
        let mut lines = content.lines();

        if lines.next()?.trim_end() != FENCE {
            return None;
        }

        let mut entries = Vec::new();
        for line in lines {
            if line.trim_end() == FENCE {
                return Some(Self { entries });
            }
            if let Some(entry) = parse_line(line) {
                entries.push(entry);
            }
        }

        None
    }

    /// Value of `key`; the last occurrence wins when a key repeats.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Like [`get`](Self::get) but treats an empty value as absent.
    pub fn get_non_empty(&self, key: &str) -> Option<&str> {
        self.get(key).filter(|v| !v.is_empty())
    }

    /// Comma separated list under `key`, trimmed, empty items dropped.
    /// A surrounding `[...]` is accepted.
    pub fn get_list(&self, key: &str) -> Vec<String> {
        self.get(key).map(split_list).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn parse_line(line: &str) -> Option<(String, String)> {
    let (key, value) = line.split_once(':')?;

    if key.is_empty() || !key.chars().all(|c| c.is_alphanumeric() || c == '_') {
        return None;
    }

    Some((key.to_string(), unquote(value.trim()).to_string()))
}

/// Strip one pair of surrounding double quotes.
pub fn unquote(value: &str) -> &str {
    value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value)
}

pub fn split_list(value: &str) -> Vec<String> {
    let value = value.trim();
    let value = value
        .strip_prefix('[')
        .and_then(|v| v.strip_suffix(']'))
        .unwrap_or(value);

    value
        .split(',')
        .map(|item| unquote(item.trim()).trim().to_string())
        .filter(|item| !item.is_empty())
        .collect()
}
