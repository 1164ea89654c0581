// src/extract/links.rs
use once_cell::sync::OnceCell;
use regex::Regex;
use scraper::ElementRef;
use url::Url;

use super::PageContext;

const PLACEHOLDER_HREFS: [&str; 3] = ["#", "javascript:void(0);", "javascript:void(0)"];

/// True for hrefs that do not point anywhere: empty, `#`, or any `javascript:` URL.
pub fn is_placeholder_href(href: &str) -> bool {
    let h = href.trim();
    h.is_empty()
        || PLACEHOLDER_HREFS.contains(&h)
        || h.get(..11)
            .is_some_and(|p| p.eq_ignore_ascii_case("javascript:"))
}

/// First quoted string literal of an onclick handler: `go('view.php?id=42')` -> `view.php?id=42`.
pub fn onclick_literal(onclick: &str) -> Option<&str> {
    static RE: OnceCell<Regex> = OnceCell::new();
    let re = RE.get_or_init(|| Regex::new(r#"['"]([^'"]+)['"]"#).unwrap());
    re.captures(onclick)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
}

/// Join `href` onto `base`; None when the result is not a valid URL.
pub fn resolve(base: &Url, href: &str) -> Option<String> {
    base.join(href.trim()).ok().map(String::from)
}

/// Item URL for an anchor, in order of preference:
/// real href, then onclick literal, then the list page itself.
pub fn item_url(anchor: ElementRef<'_>, page: &PageContext) -> String {
    let el = anchor.value();
    let href = el.attr("href").unwrap_or_default().trim();
    if !is_placeholder_href(href) {
        if let Some(u) = resolve(&page.final_url, href) {
            return u;
        }
    }
    if let Some(lit) = el.attr("onclick").and_then(onclick_literal) {
        if let Some(u) = resolve(&page.final_url, lit) {
            return u;
        }
    }
    page.target_url.clone()
}
