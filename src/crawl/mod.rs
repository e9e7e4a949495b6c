pub mod bushou;
pub mod jiegou;
pub mod wuxing;

use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

use regex::Regex;
use scraper::Html;

use crate::fetch::PageSource;
use crate::parse::{self, parse_char_link, ANCHOR_SEL, H2_SEL};

/// Character detail pages share one filename shape across all taxonomies.
static DETAIL_LINK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"hanzi-xi[x0-9][a-z0-9]{2,}\.html").unwrap());

static STROKES_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(\d+)画").unwrap());

/// Walk a pagination chain from `start`, invoking `on_page` for every page
/// reached. A visited set guards against next-page links that loop back; a
/// failed fetch abandons the rest of this chain only.
pub async fn follow_pagination(
    src: &impl PageSource,
    start: String,
    mut on_page: impl FnMut(&Html),
) {
    let mut visited: HashSet<String> = HashSet::new();
    let mut current = Some(start);

    while let Some(url) = current {
        if !visited.insert(url.clone()) {
            break;
        }
        let Some(body) = src.get(&url).await else {
            break;
        };
        current = {
            let doc = Html::parse_document(&body);
            on_page(&doc);
            parse::next_page_url(&doc)
        };
    }
}

/// Collect sub-page links whose href satisfies `matches`, resolved to
/// absolute URLs, first-seen order, deduplicated.
pub(crate) fn sub_page_urls(doc: &Html, matches: impl Fn(&str) -> bool) -> Vec<String> {
    let mut urls: Vec<String> = Vec::new();
    for a in doc.select(&ANCHOR_SEL) {
        let Some(href) = a.value().attr("href") else {
            continue;
        };
        if !matches(href) {
            continue;
        }
        let full = parse::absolute_url(href);
        if !urls.contains(&full) {
            urls.push(full);
        }
    }
    urls
}

/// Record every character detail link on the page under `value`. Later pages
/// overwrite earlier ones for the same character.
pub(crate) fn collect_detail_links(doc: &Html, map: &mut HashMap<String, String>, value: &str) {
    for a in doc.select(&ANCHOR_SEL) {
        let Some(href) = a.value().attr("href") else {
            continue;
        };
        if !DETAIL_LINK_RE.is_match(href) {
            continue;
        }
        if let Some(link) = parse_char_link(&a.text().collect::<String>()) {
            map.insert(link.hanzi, value.to_string());
        }
    }
}

/// Stroke count declared by the first matching `<h2>` heading, if any.
pub(crate) fn stroke_count(doc: &Html) -> Option<u32> {
    doc.select(&H2_SEL)
        .find_map(|h2| heading_strokes(&h2.text().collect::<String>()))
}

pub(crate) fn heading_strokes(text: &str) -> Option<u32> {
    STROKES_RE
        .captures(text)
        .and_then(|caps| caps[1].parse().ok())
}

// ── Tests ──
