use std::cmp::Ordering;
use std::collections::HashMap;

use crate::crawl::wuxing::WuxingChar;
use crate::store::{CharacterRecord, Flag};

/// Join the three taxonomy maps into the canonical sorted record set. The
/// wuxing map decides which characters exist; structure and radical only
/// fill in their columns.
pub fn merge(
    wuxing: &HashMap<String, WuxingChar>,
    structures: &HashMap<String, String>,
    radicals: &HashMap<String, String>,
) -> Vec<CharacterRecord> {
    let mut records: Vec<CharacterRecord> = wuxing
        .values()
        .map(|c| CharacterRecord {
            hanzi: c.hanzi.clone(),
            pinyin: c.pinyin.clone(),
            wuxing: c.wuxing.clone(),
            strokes: c.strokes,
            radical: radicals.get(&c.hanzi).cloned().unwrap_or_default(),
            structure: structures.get(&c.hanzi).cloned().unwrap_or_default(),
            url: c.url.clone(),
            common: Flag::Unknown,
            lucky: Flag::Unknown,
        })
        .collect();

    records.sort_by(compare_records);
    records
}

/// Dataset order: strokes ascending, then pinyin, then the character itself
/// so ties resolve the same way on every run.
pub fn compare_records(a: &CharacterRecord, b: &CharacterRecord) -> Ordering {
    a.strokes
        .cmp(&b.strokes)
        .then_with(|| compare_pinyin(&a.pinyin, &b.pinyin))
        .then_with(|| a.hanzi.cmp(&b.hanzi))
}

/// Tone-marked readings sort with their base letters (ǎo before ba), which a
/// plain byte comparison would not give. Raw comparison breaks ties so tone
/// variants keep a stable relative order.
pub fn compare_pinyin(a: &str, b: &str) -> Ordering {
    fold(a).cmp(&fold(b)).then_with(|| a.cmp(b))
}

fn fold(s: &str) -> String {
    s.chars().flat_map(char::to_lowercase).map(strip_tone).collect()
}

fn strip_tone(c: char) -> char {
    match c {
        'ā' | 'á' | 'ǎ' | 'à' => 'a',
        'ē' | 'é' | 'ě' | 'è' => 'e',
        'ī' | 'í' | 'ǐ' | 'ì' => 'i',
        'ō' | 'ó' | 'ǒ' | 'ò' => 'o',
        'ū' | 'ú' | 'ǔ' | 'ù' => 'u',
        'ǖ' | 'ǘ' | 'ǚ' | 'ǜ' | 'ü' => 'u',
        'ń' | 'ň' | 'ǹ' => 'n',
        _ => c,
    }
}

// ── Tests ──
