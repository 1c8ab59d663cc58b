//! Best-effort line index for block-style documents.
//!
//! `serde_yaml::Value` drops positions, so the lines of top-level sequence
//! items are recovered with a light scan of the text. Flow-style sections
//! have no entries; callers treat a missing line as unknown.

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;

static TOP_LEVEL_KEY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"^["']?([A-Za-z_][\w-]*)["']?\s*:"#).unwrap());
static ITEM: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\s*)-(\s|$)").unwrap());

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceMap {
    /// Top-level key -> 1-based lines of its sequence items.
    items: IndexMap<String, Vec<usize>>,
    /// Top-level key -> 1-based line of the key itself.
    keys: IndexMap<String, usize>,
}

impl SourceMap {
    pub fn scan(text: &str) -> Self {
        let mut map = SourceMap::default();
        let mut current: Option<String> = None;
        let mut item_indent: Option<usize> = None;

        for (idx, line) in text.lines().enumerate() {
            let line_no = idx + 1;
            let trimmed = line.trim_start();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            if !line.starts_with(char::is_whitespace) && !line.starts_with('-') {
                current = TOP_LEVEL_KEY
                    .captures(line)
                    .map(|caps| caps[1].to_string());
                if let Some(key) = &current {
                    map.keys.entry(key.clone()).or_insert(line_no);
                }
                item_indent = None;
                continue;
            }
            let Some(key) = &current else { continue };
            if let Some(caps) = ITEM.captures(line) {
                let indent = caps[1].len();
                let expected = *item_indent.get_or_insert(indent);
                if indent == expected {
                    map.items.entry(key.clone()).or_default().push(line_no);
                }
            }
        }
        map
    }

    /// Line of item `index` of the top-level sequence under `key`.
    pub fn item_line(&self, key: &str, index: usize) -> Option<usize> {
        self.items.get(key).and_then(|lines| lines.get(index).copied())
    }

    /// Line of a top-level key.
    pub fn key_line(&self, key: &str) -> Option<usize> {
        self.keys.get(key).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = "\
test: Checkout
# comment
do:
  - c: .add
  - if:
      cond: .promo
      then:
        - c: .apply
  - ch: Total
teardown:
- note: done
";

    #[test]
    fn test_item_lines() {
        let map = SourceMap::scan(DOC);
        assert_eq!(map.item_line("do", 0), Some(4));
        assert_eq!(map.item_line("do", 1), Some(5));
        assert_eq!(map.item_line("do", 2), Some(9));
        assert_eq!(map.item_line("do", 3), None);
        assert_eq!(map.item_line("teardown", 0), Some(11));
        assert_eq!(map.key_line("test"), Some(1));
    }

    #[test]
    fn test_flow_style_has_no_items() {
        let map = SourceMap::scan("test: T\ndo: [{c: a}, {c: b}]\n");
        assert_eq!(map.item_line("do", 0), None);
        assert_eq!(map.key_line("do"), Some(2));
    }
}
