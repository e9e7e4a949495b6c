use std::collections::HashMap;

use regex::Regex;
use scraper::Html;
use tracing::info;

use super::{collect_detail_links, follow_pagination, sub_page_urls};
use crate::fetch::Fetcher;
use crate::parse;

/// The twelve structural categories with their fixed landing pages.
const CATEGORIES: [(&str, &str); 12] = [
    ("单一结构", "hanzi-jiegou-0004.html"),
    ("左右结构", "hanzi-jiegou-000e.html"),
    ("上下结构", "hanzi-jiegou-000f.html"),
    ("左中右结构", "hanzi-jiegou-000g.html"),
    ("上中下结构", "hanzi-jiegou-0003.html"),
    ("右上包围结构", "hanzi-jiegou-000c.html"),
    ("左上包围结构", "hanzi-jiegou-000a.html"),
    ("左下包围结构", "hanzi-jiegou-000h.html"),
    ("上三包围结构", "hanzi-jiegou-000q.html"),
    ("下三包围结构", "hanzi-jiegou-000d.html"),
    ("全包围结构", "hanzi-jiegou-0005.html"),
    ("品字形结构", "hanzi-jiegou-0001.html"),
];

/// Phase 2: map each character to its structural category.
pub async fn crawl(fetcher: &Fetcher) -> HashMap<String, String> {
    let mut structures: HashMap<String, String> = HashMap::new();

    for (name, page) in CATEGORIES {
        let Some(body) = fetcher.fetch(&parse::absolute_url(page)).await else {
            continue;
        };

        let sub_re = sub_page_pattern(page);
        let subs = {
            let doc = Html::parse_document(&body);
            collect_detail_links(&doc, &mut structures, name);
            sub_page_urls(&doc, |href| sub_re.is_match(href))
        };

        if !subs.is_empty() {
            info!("structure {}: {} sub-pages", name, subs.len());
        }
        for sub in subs {
            follow_pagination(fetcher, sub, |doc| {
                collect_detail_links(doc, &mut structures, name);
            })
            .await;
        }

        info!("structure {}: {} characters mapped", name, structures.len());
    }

    structures
}

/// Structure × stroke-count sub-pages share the landing page's category code:
/// `hanzi-jiegou-<code>-<index>.html`.
fn sub_page_pattern(page: &str) -> Regex {
    let code = page
        .strip_prefix("hanzi-jiegou-")
        .and_then(|rest| rest.strip_suffix(".html"))
        .unwrap_or(page);
    Regex::new(&format!(r"hanzi-jiegou-{}-[0-9a-z]{{4}}\.html", code)).unwrap()
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sub_page_pattern_scopes_to_category_code() {
        let re = sub_page_pattern("hanzi-jiegou-000e.html");
        assert!(re.is_match("hanzi-jiegou-000e-0007.html"));
        assert!(!re.is_match("hanzi-jiegou-000f-0007.html"));
        // The bare landing page is not a sub-page.
        assert!(!re.is_match("hanzi-jiegou-000e.html"));
        // Detail pages don't match either.
        assert!(!re.is_match("hanzi-xi4eba.html"));
    }

    #[test]
    fn landing_page_characters_mapped_to_category() {
        let doc = Html::parse_document(
            r#"<a href="hanzi-xi4eba.html">rén 人</a>
               <a href="hanzi-jiegou-0004-0001.html">2画</a>"#,
        );
        let mut structures = HashMap::new();
        collect_detail_links(&doc, &mut structures, "单一结构");
        assert_eq!(structures.get("人").map(String::as_str), Some("单一结构"));
        assert_eq!(structures.len(), 1);
    }
}
