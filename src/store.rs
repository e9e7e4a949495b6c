use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

pub const DATA_PATH: &str = "data/characters.json";

/// Three-valued enrichment flag. `Unknown` means the detail page has not been
/// visited yet; it serializes as an absent key so consumers keep reading
/// "missing = not yet enriched".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Flag {
    #[default]
    Unknown,
    Yes,
    No,
}

impl Flag {
    pub fn is_unknown(&self) -> bool {
        matches!(self, Flag::Unknown)
    }

    pub fn is_yes(&self) -> bool {
        matches!(self, Flag::Yes)
    }

    pub fn from_bool(v: bool) -> Flag {
        if v {
            Flag::Yes
        } else {
            Flag::No
        }
    }
}

mod flag_repr {
    use serde::{Deserialize, Deserializer, Serializer};

    use super::Flag;

    pub fn serialize<S: Serializer>(flag: &Flag, s: S) -> Result<S::Ok, S::Error> {
        match flag {
            Flag::Yes => s.serialize_bool(true),
            Flag::No => s.serialize_bool(false),
            Flag::Unknown => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Flag, D::Error> {
        Ok(match Option::<bool>::deserialize(d)? {
            Some(true) => Flag::Yes,
            Some(false) => Flag::No,
            None => Flag::Unknown,
        })
    }
}

/// One canonical character entry in the dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CharacterRecord {
    #[serde(rename = "char")]
    pub hanzi: String,
    pub pinyin: String,
    pub wuxing: String,
    pub strokes: u32,
    pub radical: String,
    pub structure: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Flag::is_unknown", with = "flag_repr")]
    pub common: Flag,
    #[serde(default, skip_serializing_if = "Flag::is_unknown", with = "flag_repr")]
    pub lucky: Flag,
}

/// Load the whole dataset.
pub fn load() -> Result<Vec<CharacterRecord>> {
    load_from(DATA_PATH)
}

/// Rewrite the whole dataset. The write goes through a temp file + rename so
/// an interrupted checkpoint cannot truncate the previous dataset.
pub fn save(records: &[CharacterRecord]) -> Result<()> {
    save_to(DATA_PATH, records)
}

pub fn load_from(path: impl AsRef<Path>) -> Result<Vec<CharacterRecord>> {
    let path = path.as_ref();
    let raw = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parsing {}", path.display()))
}

pub fn save_to(path: impl AsRef<Path>, records: &[CharacterRecord]) -> Result<()> {
    let path = path.as_ref();
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    }
    let json = serde_json::to_vec(records).context("serializing dataset")?;
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, json).with_context(|| format!("writing {}", tmp.display()))?;
    fs::rename(&tmp, path).with_context(|| format!("replacing {}", path.display()))?;
    Ok(())
}

// ── Tests ──
