//! Front-matter parsing
//!
//! Headers use the `Key: Value` convention: one key per line, indented lines
//! continue the previous value, and a blank line ends the block. The block may
//! also be fenced with `---` ... `---` (or `...`).

use indexmap::IndexMap;
use lazy_static::lazy_static;
use regex::Regex;

use crate::error::ParseError;

lazy_static! {
    static ref KEY_LINE: Regex = Regex::new(r"^ {0,3}([A-Za-z0-9_-]+):\s*(.*)$").unwrap();
    static ref CONTINUATION_LINE: Regex = Regex::new(r"^(?: {4,}|\t)\s*(.*)$").unwrap();
}

/// Key/value pairs from a document header, case-preserved and in header order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrontMatter {
    fields: IndexMap<String, String>,
}

impl FrontMatter {
    /// Parse front-matter from content string
    /// Returns (front_matter, remaining_content)
    pub fn parse(content: &str) -> Result<(Self, &str), ParseError> {
        let content = content.strip_prefix('\u{feff}').unwrap_or(content);

        let mut lines = content.split_inclusive('\n');
        let mut offset = 0;
        let mut line_no = 0;

        let fenced = match content.lines().next() {
            Some(first) if first.trim_end() == "---" => {
                // Consume the opening fence
                if let Some(line) = lines.next() {
                    offset += line.len();
                    line_no += 1;
                }
                true
            }
            _ => false,
        };

        let mut fm = FrontMatter::default();
        let mut last_key: Option<String> = None;
        let mut closed = false;

        for raw_line in lines {
            offset += raw_line.len();
            line_no += 1;
            let line = raw_line.trim_end_matches(['\n', '\r']);

            if fenced && (line.trim_end() == "---" || line.trim_end() == "...") {
                closed = true;
                break;
            }
            if line.trim().is_empty() {
                if fenced {
                    continue;
                }
                closed = true;
                break;
            }

            if let Some(caps) = CONTINUATION_LINE.captures(line) {
                let key = last_key
                    .as_ref()
                    .ok_or(ParseError::OrphanContinuation { line: line_no })?;
                let more = caps[1].trim();
                if let Some(value) = fm.fields.get_mut(key) {
                    if value.is_empty() {
                        value.push_str(more);
                    } else {
                        value.push('\n');
                        value.push_str(more);
                    }
                }
                continue;
            }

            let caps = KEY_LINE
                .captures(line)
                .ok_or_else(|| ParseError::UnterminatedKey {
                    line: line_no,
                    text: line.to_string(),
                })?;
            let key = caps[1].to_string();
            if fm.get(&key).is_some() {
                return Err(ParseError::DuplicateKey { line: line_no, key });
            }
            fm.fields.insert(key.clone(), caps[2].trim().to_string());
            last_key = Some(key);
        }

        if fenced && !closed {
            return Err(ParseError::UnterminatedBlock);
        }

        let remaining = if closed { &content[offset..] } else { "" };
        Ok((fm, remaining.trim_start_matches(['\n', '\r'])))
    }

    /// Look up a value by key, ignoring case
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    /// Iterate over the pairs exactly as written
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn into_inner(self) -> IndexMap<String, String> {
        self.fields
    }
}
