//! Flat `{identifier}` placeholder scanning.
//!
//! An identifier starts with an ASCII letter or `_` and continues with ASCII
//! alphanumerics or `_`. Anything else between braces is literal text. Both
//! rendering and validation walk the input once, left to right.

use super::Variables;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
struct Token<'a> {
    name: &'a str,
    start: usize,
    end: usize,
}

struct Tokens<'a> {
    content: &'a str,
    cursor: usize,
}

impl<'a> Tokens<'a> {
    const fn new(content: &'a str) -> Self { Self { content, cursor: 0 } }
}

impl<'a> Iterator for Tokens<'a> {
    type Item = Token<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let bytes = self.content.as_bytes();
        while let Some(offset) = self.content[self.cursor..].find('{') {
            let start = self.cursor + offset;
            let name_start = start + 1;
            let mut end = name_start;
            while end < bytes.len() && is_identifier_byte(bytes[end], end == name_start) {
                end += 1;
            }
            if end > name_start && bytes.get(end) == Some(&b'}') {
                self.cursor = end + 1;
                return Some(Token { name: &self.content[name_start..end], start, end: end + 1 });
            }
            self.cursor = name_start;
        }
        self.cursor = self.content.len();
        None
    }
}

const fn is_identifier_byte(byte: u8, first: bool) -> bool {
    byte == b'_' || byte.is_ascii_alphabetic() || (!first && byte.is_ascii_digit())
}

/// Placeholder names in order of appearance, repeats included.
#[must_use]
pub fn placeholders(content: &str) -> Vec<&str> { Tokens::new(content).map(|token| token.name).collect() }

/// Substitute every placeholder whose name is present in `variables`.
///
/// Unknown placeholders stay as written and substituted values are not scanned
/// again.
#[must_use]
pub fn render(content: &str, variables: &Variables) -> String {
    let mut rendered = String::with_capacity(content.len());
    let mut copied = 0;
    for token in Tokens::new(content) {
        if let Some(value) = variables.get(token.name) {
            rendered.push_str(&content[copied..token.start]);
            rendered.push_str(value);
            copied = token.end;
        }
    }
    rendered.push_str(&content[copied..]);
    rendered
}

/// Distinct placeholder names with no entry in `variables`, in order of first
/// appearance. An empty value counts as present.
#[must_use]
pub fn missing(content: &str, variables: &Variables) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for token in Tokens::new(content) {
        if !variables.contains_key(token.name) && !names.iter().any(|name| name == token.name) {
            names.push(token.name.to_string());
        }
    }
    names
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> Variables {
        pairs.iter().map(|(k, v)| ((*k).to_string(), (*v).to_string())).collect()
    }

    #[test]
    fn test_render_replaces_every_occurrence() {
        let content = "{name}, rezervasyonunuz {bookingId} onaylandı. Tekrar: {name}";
        let rendered = render(content, &vars(&[("name", "Ahmet"), ("bookingId", "RES-1")]));

        assert_eq!(rendered, "Ahmet, rezervasyonunuz RES-1 onaylandı. Tekrar: Ahmet");
    }

    #[test]
    fn test_render_leaves_unknown_and_malformed_tokens() {
        let content = "{known} {unknown} { spaced } {1digit} {} {open";
        let rendered = render(content, &vars(&[("known", "ok")]));

        assert_eq!(rendered, "ok {unknown} { spaced } {1digit} {} {open");
    }

    #[test]
    fn test_render_does_not_rescan_substituted_values() {
        let rendered = render("{a}{b}", &vars(&[("a", "{b}"), ("b", "x")]));

        assert_eq!(rendered, "{b}x");
    }

    #[test]
    fn test_render_is_deterministic() {
        let variables = vars(&[("x", "1"), ("y", "2")]);
        let content = "{y}-{x}-{z}";

        assert_eq!(render(content, &variables), render(content, &variables));
    }

    #[test]
    fn test_render_handles_multibyte_text() {
        let rendered = render("Sayın {ad}, şoförünüz {şoför} yolda", &vars(&[("ad", "Ayşe")]));

        assert_eq!(rendered, "Sayın Ayşe, şoförünüz {şoför} yolda");
    }

    #[test]
    fn test_missing_reports_distinct_names_in_order() {
        let content = "{b} {a} {b} {c}";

        assert_eq!(missing(content, &vars(&[("c", "")])), vec!["b".to_string(), "a".to_string()]);
    }

    #[test]
    fn test_empty_value_counts_as_present() {
        assert!(missing("{note}", &vars(&[("note", "")])).is_empty());
    }

    #[test]
    fn test_nested_brace_finds_inner_identifier() {
        assert_eq!(placeholders("{{name}}"), vec!["name"]);
        assert_eq!(render("{{name}}", &vars(&[("name", "x")])), "{x}");
    }
}
