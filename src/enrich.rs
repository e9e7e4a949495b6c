use std::sync::{Arc, LazyLock};
use std::time::Duration;

use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use scraper::{Html, Selector};
use tracing::warn;

use crate::fetch::Fetcher;
use crate::store::{self, CharacterRecord, Flag};

const BATCH_SIZE: usize = 5;
const BATCH_PAUSE_MS: u64 = 200;
const SAVE_EVERY: usize = 100;

// Detail-page labels the heuristics key on.
const COMMON_LABEL: &str = "是否常用";
const COMMON_PROBE: &str = "是否常用：";
const COMMON_VALUE: &str = "常用字";
const COMMON_WINDOW: usize = 80;
const LUCKY_LABEL: &str = "字吉凶寓意";
const LUCKY_VALUE: &str = "吉利字";
const LUCKY_LABEL_MAX: usize = 30;
const META_LABEL: &str = "五行属性";
const META_LUCKY: &str = "吉凶寓意：吉";

static P_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("p").unwrap());

/// Which flags a pass fills in. The standalone single-field passes exist so
/// either attribute can be re-run independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnrichFields {
    Both,
    CommonOnly,
    LuckyOnly,
}

impl EnrichFields {
    fn pending(self, record: &CharacterRecord) -> bool {
        if record.url.is_empty() {
            return false;
        }
        match self {
            EnrichFields::Both => record.common.is_unknown() || record.lucky.is_unknown(),
            EnrichFields::CommonOnly => record.common.is_unknown(),
            EnrichFields::LuckyOnly => record.lucky.is_unknown(),
        }
    }
}

#[derive(Debug, Default)]
pub struct EnrichStats {
    pub processed: usize,
    pub common: usize,
    pub lucky: usize,
    pub failed: usize,
}

impl EnrichStats {
    pub fn print(&self) {
        println!(
            "Enriched {} records ({} common, {} lucky, {} fetch failures left pending).",
            self.processed, self.common, self.lucky, self.failed,
        );
    }
}

/// Records still owed a visit: relevant flag(s) unset and a detail url known.
/// Records carrying every requested flag are never touched again.
pub fn pending_indices(records: &[CharacterRecord], fields: EnrichFields) -> Vec<usize> {
    records
        .iter()
        .enumerate()
        .filter(|(_, r)| fields.pending(r))
        .map(|(i, _)| i)
        .collect()
}

/// Phase 4: visit each pending record's detail page in fixed-size concurrent
/// batches, write the flags back, and checkpoint the dataset periodically so
/// an interrupted run loses at most one checkpoint interval of work.
pub async fn enrich(records: &mut Vec<CharacterRecord>, fields: EnrichFields) -> Result<EnrichStats> {
    let todo = pending_indices(records, fields);
    println!(
        "{} records pending, {} already enriched",
        todo.len(),
        records.len() - todo.len()
    );

    let mut stats = EnrichStats::default();
    if todo.is_empty() {
        return Ok(stats);
    }

    let fetcher = Arc::new(Fetcher::new()?);
    let pb = ProgressBar::new(todo.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40} {pos}/{len} ({per_sec}, eta {eta})")?
            .progress_chars("=> "),
    );

    let mut since_save = 0usize;
    for batch in todo.chunks(BATCH_SIZE) {
        let mut handles = Vec::with_capacity(batch.len());
        for &idx in batch {
            let url = records[idx].url.clone();
            let fetcher = Arc::clone(&fetcher);
            handles.push((
                idx,
                tokio::spawn(async move {
                    let body = fetcher.fetch(&url).await?;
                    Some(extract_flags(&body, fields))
                }),
            ));
        }

        // The record set is only touched here, after the whole batch joined.
        for (idx, handle) in handles {
            match handle.await? {
                Some((common, lucky)) => {
                    let record = &mut records[idx];
                    if !common.is_unknown() {
                        record.common = common;
                        if common.is_yes() {
                            stats.common += 1;
                        }
                    }
                    if !lucky.is_unknown() {
                        record.lucky = lucky;
                        if lucky.is_yes() {
                            stats.lucky += 1;
                        }
                    }
                    stats.processed += 1;
                }
                None => {
                    // Left pending: the next run retries this record.
                    stats.failed += 1;
                    warn!(
                        "fetch failed for {} {}",
                        records[idx].hanzi, records[idx].url
                    );
                }
            }
            pb.inc(1);
            since_save += 1;
            if since_save % SAVE_EVERY == 0 {
                store::save(records)?;
            }
        }

        tokio::time::sleep(Duration::from_millis(BATCH_PAUSE_MS)).await;
    }

    store::save(records)?;
    pb.finish_and_clear();
    Ok(stats)
}

/// Derive the requested flags from a detail page. Flags outside the pass's
/// scope stay Unknown so the caller writes only its own fields.
fn extract_flags(html: &str, fields: EnrichFields) -> (Flag, Flag) {
    let doc = Html::parse_document(html);
    match fields {
        EnrichFields::Both => (
            Flag::from_bool(extract_common(&doc)),
            Flag::from_bool(extract_lucky(&doc)),
        ),
        EnrichFields::CommonOnly => (Flag::from_bool(extract_common(&doc)), Flag::Unknown),
        EnrichFields::LuckyOnly => (Flag::Unknown, Flag::from_bool(extract_lucky(&doc))),
    }
}

/// A character counts as common when its usage paragraph says so. A page
/// without the label anywhere records a negative observation, not a missing
/// one.
fn extract_common(doc: &Html) -> bool {
    if let Some(text) = paragraphs(doc).find(|t| t.contains(COMMON_LABEL)) {
        // "最常用字" and "次常用字" both contain the target substring.
        return text.contains(COMMON_VALUE);
    }

    // No dedicated paragraph; probe the whole document text and inspect a
    // bounded window after the label.
    let full: String = doc.root_element().text().collect();
    if let Some(idx) = full.find(COMMON_PROBE) {
        let window: String = full[idx..].chars().take(COMMON_WINDOW).collect();
        return window.contains(COMMON_VALUE);
    }
    false
}

/// Two independent patterns mark a lucky character: a short paragraph
/// dedicated to the connotation, or the metadata line pairing the elemental
/// attribute with an auspicious verdict.
fn extract_lucky(doc: &Html) -> bool {
    if let Some(text) = paragraphs(doc)
        .find(|t| t.contains(LUCKY_LABEL) && t.chars().count() < LUCKY_LABEL_MAX)
    {
        if text.contains(LUCKY_VALUE) {
            return true;
        }
    }

    paragraphs(doc).any(|t| t.contains(META_LABEL) && t.contains(META_LUCKY))
}

fn paragraphs(doc: &Html) -> impl Iterator<Item = String> + '_ {
    doc.select(&P_SEL).map(|p| p.text().collect())
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    fn record(url: &str, common: Flag, lucky: Flag) -> CharacterRecord {
        CharacterRecord {
            hanzi: "人".to_string(),
            pinyin: "rén".to_string(),
            wuxing: "火".to_string(),
            strokes: 2,
            radical: String::new(),
            structure: String::new(),
            url: url.to_string(),
            common,
            lucky,
        }
    }

    #[test]
    fn fully_enriched_dataset_has_nothing_pending() {
        let records = vec![
            record("https://example.com/a", Flag::Yes, Flag::No),
            record("https://example.com/b", Flag::No, Flag::No),
        ];
        assert!(pending_indices(&records, EnrichFields::Both).is_empty());
        assert!(pending_indices(&records, EnrichFields::CommonOnly).is_empty());
        assert!(pending_indices(&records, EnrichFields::LuckyOnly).is_empty());
    }

    #[test]
    fn records_without_url_are_never_pending() {
        let records = vec![record("", Flag::Unknown, Flag::Unknown)];
        assert!(pending_indices(&records, EnrichFields::Both).is_empty());
    }

    #[test]
    fn pending_respects_field_mode() {
        let records = vec![record("https://example.com/a", Flag::Yes, Flag::Unknown)];
        assert_eq!(pending_indices(&records, EnrichFields::Both), vec![0]);
        assert!(pending_indices(&records, EnrichFields::CommonOnly).is_empty());
        assert_eq!(pending_indices(&records, EnrichFields::LuckyOnly), vec![0]);
    }

    #[test]
    fn common_from_usage_paragraph() {
        let doc = Html::parse_document("<p>人字是否常用：常用字</p>");
        assert!(extract_common(&doc));

        let doc = Html::parse_document("<p>仂字是否常用： -</p>");
        assert!(!extract_common(&doc));
    }

    #[test]
    fn common_from_windowed_fallback() {
        // Label in a non-paragraph element; the window after it decides.
        let doc = Html::parse_document("<div>是否常用：次常用字</div>");
        assert!(extract_common(&doc));

        let doc = Html::parse_document("<div>是否常用： -</div>");
        assert!(!extract_common(&doc));
    }

    #[test]
    fn missing_label_is_a_negative_observation() {
        let doc = Html::parse_document("<p>没有相关信息</p>");
        assert!(!extract_common(&doc));
        assert!(!extract_lucky(&doc));
    }

    #[test]
    fn lucky_from_dedicated_paragraph() {
        let doc = Html::parse_document("<p>仁字吉凶寓意：吉利字</p>");
        assert!(extract_lucky(&doc));

        let doc = Html::parse_document("<p>仄字吉凶寓意：凶字</p>");
        assert!(!extract_lucky(&doc));
    }

    #[test]
    fn lucky_from_metadata_paragraph() {
        let doc = Html::parse_document("<p>五行属性：属火 吉凶寓意：吉</p>");
        assert!(extract_lucky(&doc));

        let doc = Html::parse_document("<p>五行属性：属火 吉凶寓意：凶</p>");
        assert!(!extract_lucky(&doc));
    }

    #[test]
    fn long_paragraph_does_not_match_dedicated_pattern() {
        // Over the length threshold: mentions of 吉利字 inside prose must not
        // count as the dedicated connotation line.
        let doc = Html::parse_document(
            "<p>关于仁字吉凶寓意的详细解释有很多种说法，有人认为它是吉利字，也有人不这么认为。</p>",
        );
        assert!(!extract_lucky(&doc));
    }

    #[test]
    fn single_field_pass_leaves_other_flag_unknown() {
        let html = "<p>人字是否常用：常用字</p><p>人字吉凶寓意：吉利字</p>";
        let (common, lucky) = extract_flags(html, EnrichFields::CommonOnly);
        assert_eq!(common, Flag::Yes);
        assert!(lucky.is_unknown());

        let (common, lucky) = extract_flags(html, EnrichFields::LuckyOnly);
        assert!(common.is_unknown());
        assert_eq!(lucky, Flag::Yes);

        let (common, lucky) = extract_flags(html, EnrichFields::Both);
        assert_eq!(common, Flag::Yes);
        assert_eq!(lucky, Flag::Yes);
    }
}
