use std::collections::HashMap;

use scraper::{ElementRef, Html};
use tracing::info;

use super::{follow_pagination, heading_strokes, stroke_count, sub_page_urls};
use crate::fetch::Fetcher;
use crate::parse::{self, parse_char_link, ANCHOR_SEL, H2_SEL};

/// The five elemental categories with their fixed landing pages.
const CATEGORIES: [(&str, &str); 5] = [
    ("金", "hanzi-wuxing-0004.html"),
    ("木", "hanzi-wuxing-000e.html"),
    ("水", "hanzi-wuxing-000f.html"),
    ("火", "hanzi-wuxing-000g.html"),
    ("土", "hanzi-wuxing-0003.html"),
];

/// Element × stroke-count cross-index pages hang off each landing page.
const SUB_PAGE_MARKER: &str = "hanzi-wuxing-bihua-";
/// Character links inside the wuxing listings carry their own href shape.
const CHAR_LINK_MARKER: &str = "hanzi-wuxing-hanzi-";

/// Full record fragment contributed by the wuxing crawl. This is the
/// authoritative existence set: a character enters the dataset only through
/// one of these.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WuxingChar {
    pub hanzi: String,
    pub pinyin: String,
    pub wuxing: String,
    pub strokes: u32,
    pub url: String,
}

/// Phase 1: one listing walk per element, each sub-page declaring its stroke
/// count in a heading.
pub async fn crawl(fetcher: &Fetcher) -> HashMap<String, WuxingChar> {
    let mut chars: HashMap<String, WuxingChar> = HashMap::new();

    for (wuxing, page) in CATEGORIES {
        let Some(body) = fetcher.fetch(&parse::absolute_url(page)).await else {
            continue;
        };

        let subs = {
            let doc = Html::parse_document(&body);
            // Some small groups are listed in full on the landing page itself.
            extract_overview(&doc, wuxing, &mut chars);
            sub_page_urls(&doc, |href| href.contains(SUB_PAGE_MARKER))
        };
        info!("wuxing {}: {} stroke sub-pages", wuxing, subs.len());

        for sub in subs {
            follow_pagination(fetcher, sub, |doc| {
                // A cross-index page without a resolvable stroke count is not
                // usable data.
                let Some(strokes) = stroke_count(doc) else {
                    return;
                };
                extract_listed(doc, wuxing, strokes, &mut chars);
            })
            .await;
        }

        info!("wuxing {}: {} characters total", wuxing, chars.len());
    }

    chars
}

/// Characters listed on a cross-index page, all sharing the page's stroke
/// count.
fn extract_listed(doc: &Html, wuxing: &str, strokes: u32, out: &mut HashMap<String, WuxingChar>) {
    for a in doc.select(&ANCHOR_SEL) {
        let Some(href) = a.value().attr("href") else {
            continue;
        };
        if !href.contains(CHAR_LINK_MARKER) {
            continue;
        }
        let Some(link) = parse_char_link(&a.text().collect::<String>()) else {
            continue;
        };
        out.insert(
            link.hanzi.clone(),
            WuxingChar {
                hanzi: link.hanzi,
                pinyin: link.pinyin,
                wuxing: wuxing.to_string(),
                strokes,
                url: parse::absolute_url(href),
            },
        );
    }
}

/// Landing-page overview: stroke headings followed by a sibling element
/// holding that group's character links. Entries found here carry no detail
/// url; a later cross-index hit overwrites them with one.
fn extract_overview(doc: &Html, wuxing: &str, out: &mut HashMap<String, WuxingChar>) {
    for h2 in doc.select(&H2_SEL) {
        let Some(strokes) = heading_strokes(&h2.text().collect::<String>()) else {
            continue;
        };
        let Some(block) = h2.next_siblings().find_map(ElementRef::wrap) else {
            continue;
        };
        for a in block.select(&ANCHOR_SEL) {
            let Some(href) = a.value().attr("href") else {
                continue;
            };
            if !href.contains(CHAR_LINK_MARKER) {
                continue;
            }
            if let Some(link) = parse_char_link(&a.text().collect::<String>()) {
                out.insert(
                    link.hanzi.clone(),
                    WuxingChar {
                        hanzi: link.hanzi,
                        pinyin: link.pinyin,
                        wuxing: wuxing.to_string(),
                        strokes,
                        url: String::new(),
                    },
                );
            }
        }
    }
}

// ── Tests ──
