//! The `metadata.json` remote snapshot (`spec.md` §6): self-sufficient for
//! pull-side reconstruction of `index`/`log`/`refs/models`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexEntryJson {
    pub hash: String,
    pub path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectEntryJson {
    pub created: i64,
    pub hash: String,
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct MetadataSnapshot {
    pub index: Vec<IndexEntryJson>,
    pub objects: Vec<ObjectEntryJson>,
    pub refs: BTreeMap<String, String>,
}
