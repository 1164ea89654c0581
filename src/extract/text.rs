// src/extract/text.rs
use once_cell::sync::OnceCell;
use regex::Regex;
use scraper::ElementRef;

/// Normalize title text: the parser has already decoded entities, so only
/// whitespace (incl. nbsp) is collapsed. Bracketed text is kept verbatim.
pub fn normalize_title(s: &str) -> String {
    collapse_ws(s)
}

fn collapse_ws(s: &str) -> String {
    static RE_WS: OnceCell<Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| Regex::new(r"[\s\u{00A0}]+").unwrap());
    re_ws.replace_all(s, " ").trim().to_string()
}

/// Text of an element with each text node trimmed and glued together,
/// used for id cells: `<td> 1<b>0</b> </td>` reads "10".
pub fn compact_text(el: ElementRef<'_>) -> String {
    el.text().map(str::trim).collect::<String>()
}

/// Text of an element with text nodes separated by one space.
pub fn spaced_text(el: ElementRef<'_>) -> String {
    el.text().collect::<Vec<_>>().join(" ")
}

/// Removes decorative tags like "[new]" from titles, case-insensitively.
#[derive(Debug, Clone, Default)]
pub struct TagStripper {
    re: Option<Regex>,
}

impl TagStripper {
    pub fn new(tags: &[String]) -> Self {
        let alts: Vec<String> = tags
            .iter()
            .map(|t| t.trim())
            .filter(|t| !t.is_empty())
            .map(regex::escape)
            .collect();
        if alts.is_empty() {
            return Self::default();
        }
        let re = Regex::new(&format!("(?i)(?:{})", alts.join("|"))).ok();
        Self { re }
    }

    /// Normalize then strip. An empty result means "no usable title".
    pub fn clean(&self, raw: &str) -> String {
        let t = normalize_title(raw);
        match &self.re {
            Some(re) => collapse_ws(&re.replace_all(&t, " ")),
            None => t,
        }
    }
}
