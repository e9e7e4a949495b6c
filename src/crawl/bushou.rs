use std::collections::HashMap;
use std::sync::LazyLock;

use indicatif::{ProgressBar, ProgressStyle};
use regex::Regex;
use scraper::Html;
use tracing::{info, warn};

use super::{collect_detail_links, follow_pagination};
use crate::fetch::Fetcher;
use crate::parse::{self, ANCHOR_SEL, BASE_URL};

/// Radicals are not hardcoded; this index page enumerates them.
const INDEX_PAGE: &str = "hanzi-bushou.html";

static RADICAL_LINK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"hanzi-bushou-[0-9a-f]{4}\.html$").unwrap());

/// Radical links read "X部"; the suffix is dropped to get the label.
const RADICAL_SUFFIX: char = '部';

/// Phase 3: discover the radical list, then walk each radical's paginated
/// flat list of character detail links.
pub async fn crawl(fetcher: &Fetcher) -> HashMap<String, String> {
    let radicals = match fetcher.fetch(&parse::absolute_url(INDEX_PAGE)).await {
        Some(body) => radical_links(&Html::parse_document(&body)),
        None => {
            // The root page carries the same radical link list.
            warn!("radical index unreachable, scanning the root page instead");
            match fetcher.fetch(BASE_URL).await {
                Some(body) => radical_links(&Html::parse_document(&body)),
                None => Vec::new(),
            }
        }
    };
    info!("{} radicals discovered", radicals.len());

    let mut map: HashMap<String, String> = HashMap::new();
    let pb = ProgressBar::new(radicals.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40} {pos}/{len} {msg}")
            .unwrap()
            .progress_chars("=> "),
    );

    for (radical, url) in radicals {
        pb.set_message(format!("{}部", radical));
        follow_pagination(fetcher, url, |doc| {
            collect_detail_links(doc, &mut map, &radical);
        })
        .await;
        pb.inc(1);
    }

    pb.finish_and_clear();
    map
}

/// Extract (radical, landing url) pairs, first occurrence wins, order kept.
fn radical_links(doc: &Html) -> Vec<(String, String)> {
    let mut out: Vec<(String, String)> = Vec::new();
    for a in doc.select(&ANCHOR_SEL) {
        let Some(href) = a.value().attr("href") else {
            continue;
        };
        if !RADICAL_LINK_RE.is_match(href) {
            continue;
        }
        let text = a.text().collect::<String>();
        let Some(name) = text.trim().strip_suffix(RADICAL_SUFFIX) else {
            continue;
        };
        if name.is_empty() || out.iter().any(|(n, _)| n == name) {
            continue;
        }
        out.push((name.to_string(), parse::absolute_url(href)));
    }
    out
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn radical_index_links_extracted() {
        let doc = Html::parse_document(
            r#"<a href="hanzi-bushou-4eba.html">人部</a>
               <a href="hanzi-bushou-6c34.html">水部</a>
               <a href="hanzi-bushou-4eba.html">人部</a>
               <a href="hanzi-bushou-ffff.html">更多</a>
               <a href="hanzi-bushou.html">部首索引</a>"#,
        );
        let radicals = radical_links(&doc);
        assert_eq!(
            radicals,
            vec![
                (
                    "人".to_string(),
                    format!("{}/hanzi-bushou-4eba.html", BASE_URL)
                ),
                (
                    "水".to_string(),
                    format!("{}/hanzi-bushou-6c34.html", BASE_URL)
                ),
            ]
        );
    }

    #[test]
    fn radical_page_characters_mapped() {
        let doc = Html::parse_document(
            r#"<a href="hanzi-xi4ec1.html">rén 仁</a>
               <a href="hanzi-xi4ecb.html">jiè介</a>"#,
        );
        let mut map = HashMap::new();
        collect_detail_links(&doc, &mut map, "人");
        assert_eq!(map.get("仁").map(String::as_str), Some("人"));
        assert_eq!(map.get("介").map(String::as_str), Some("人"));
    }
}
