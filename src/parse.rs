use std::sync::LazyLock;

use regex::Regex;
use scraper::{Html, Selector};

pub const BASE_URL: &str = "https://zidian.txcx.com";

/// Label of the pagination link on every listing page.
const NEXT_PAGE_LABEL: &str = "下一页";

pub(crate) static ANCHOR_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a").unwrap());
pub(crate) static H2_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("h2").unwrap());

// Link text is either "rén 人" or "rén人". The concatenated form splits at the
// trailing CJK codepoint; extension-plane characters need their own pattern.
static CJK_TAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(.+?)\s*([\x{3400}-\x{4dbf}\x{4e00}-\x{9fff}])$").unwrap());
static ASTRAL_TAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(.+?)\s*([\x{10000}-\x{10ffff}])$").unwrap());

/// A character entry parsed from a link's display text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CharLink {
    pub pinyin: String,
    pub hanzi: String,
}

/// Parse "pinyin + character" out of anchor text. Returns `None` for anything
/// that is not a character link; callers ignore those anchors.
pub fn parse_char_link(text: &str) -> Option<CharLink> {
    let t = text.trim();
    if t.is_empty() {
        return None;
    }

    // Space-separated: split at the last space. The trailing token must be at
    // most two UTF-16 units (one BMP or one extension-plane character), which
    // guards against ordinary multi-word text.
    if let Some(idx) = t.rfind(' ') {
        let pinyin = t[..idx].trim();
        let hanzi = t[idx + 1..].trim();
        if !pinyin.is_empty() && !hanzi.is_empty() && hanzi.encode_utf16().count() <= 2 {
            return Some(CharLink {
                pinyin: pinyin.to_string(),
                hanzi: hanzi.to_string(),
            });
        }
    }

    // Concatenated: non-greedy prefix, exactly one trailing CJK codepoint.
    for re in [&*CJK_TAIL_RE, &*ASTRAL_TAIL_RE] {
        if let Some(caps) = re.captures(t) {
            return Some(CharLink {
                pinyin: caps[1].to_string(),
                hanzi: caps[2].to_string(),
            });
        }
    }

    None
}

/// Resolve an href against the site origin.
pub fn absolute_url(href: &str) -> String {
    if href.starts_with("http") {
        href.to_string()
    } else {
        format!("{}/{}", BASE_URL, href.trim_start_matches('/'))
    }
}

/// Find the "next page" link on a listing page. `None` means the pagination
/// chain ends here.
pub fn next_page_url(doc: &Html) -> Option<String> {
    doc.select(&ANCHOR_SEL)
        .find(|a| a.text().collect::<String>().trim() == NEXT_PAGE_LABEL)
        .and_then(|a| a.value().attr("href"))
        .map(absolute_url)
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn space_separated_link() {
        let parsed = parse_char_link("rén 人").unwrap();
        assert_eq!(parsed.pinyin, "rén");
        assert_eq!(parsed.hanzi, "人");
    }

    #[test]
    fn concatenated_link() {
        let parsed = parse_char_link("rén人").unwrap();
        assert_eq!(parsed.pinyin, "rén");
        assert_eq!(parsed.hanzi, "人");
    }

    #[test]
    fn extension_plane_character() {
        // U+20021 is outside the BMP: two UTF-16 units, one codepoint.
        let concat = parse_char_link("hé𠀡").unwrap();
        assert_eq!(concat.hanzi, "𠀡");

        let spaced = parse_char_link("hé 𠀡").unwrap();
        assert_eq!(spaced.pinyin, "hé");
        assert_eq!(spaced.hanzi, "𠀡");
    }

    #[test]
    fn rejects_ordinary_text() {
        assert_eq!(parse_char_link("hello world"), None);
        assert_eq!(parse_char_link(""), None);
        assert_eq!(parse_char_link("   "), None);
    }

    #[test]
    fn absolute_url_handles_relative_and_rooted() {
        assert_eq!(
            absolute_url("hanzi-wuxing-0004.html"),
            "https://zidian.txcx.com/hanzi-wuxing-0004.html"
        );
        assert_eq!(
            absolute_url("/hanzi-wuxing-0004.html"),
            "https://zidian.txcx.com/hanzi-wuxing-0004.html"
        );
        assert_eq!(absolute_url("https://example.com/x.html"), "https://example.com/x.html");
    }

    #[test]
    fn next_page_link_found_and_resolved() {
        let doc = Html::parse_document(
            r#"<html><body>
                <a href="hanzi-wuxing-bihua-0001.html">1</a>
                <a href="hanzi-wuxing-bihua-0001-2.html"> 下一页 </a>
            </body></html>"#,
        );
        assert_eq!(
            next_page_url(&doc),
            Some("https://zidian.txcx.com/hanzi-wuxing-bihua-0001-2.html".to_string())
        );
    }

    #[test]
    fn no_next_page_link() {
        let doc = Html::parse_document("<html><body><a href=\"x.html\">上一页</a></body></html>");
        assert_eq!(next_page_url(&doc), None);
    }
}
