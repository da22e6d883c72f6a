//! The `<hash>.meta` sidecar: an ordered sequence of key/value pairs.
//!
//! Represented as `Vec<(String, String)>` rather than a linked list (see
//! `spec.md` §9 design notes) — parents/history are looked up by id on
//! demand elsewhere, so no intrusive pointer structure is needed here.

use std::path::Path;

use crate::error::EmbrError;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Sidecar {
    entries: Vec<(String, String)>,
}

impl Sidecar {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Set `key` to `value`, replacing any prior entry for the same key.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        if let Some(entry) = self.entries.iter_mut().find(|(k, _)| *k == key) {
            entry.1 = value;
        } else {
            self.entries.push((key, value));
        }
    }

    pub fn entries(&self) -> &[(String, String)] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn source_file(&self) -> Option<&str> {
        self.get("source_file")
    }

    pub fn timestamp(&self) -> Option<&str> {
        self.get("timestamp")
    }

    pub fn file_type(&self) -> Option<&str> {
        self.get("file_type")
    }

    pub fn provider(&self) -> Option<&str> {
        self.get("provider").or_else(|| self.get("model"))
    }

    pub fn dimensions(&self) -> Option<&str> {
        self.get("dimensions")
    }

    /// Serialize to `key=value\n` lines, in insertion order.
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        for (k, v) in &self.entries {
            out.push_str(k);
            out.push('=');
            out.push_str(v);
            out.push('\n');
        }
        out
    }

    pub fn parse(text: &str) -> Self {
        let mut sidecar = Self::new();
        for line in text.lines() {
            if let Some((k, v)) = line.split_once('=') {
                sidecar.set(k, v);
            }
        }
        sidecar
    }

    pub fn write(&self, path: &Path) -> Result<(), EmbrError> {
        std::fs::write(path, self.to_text()).map_err(|e| EmbrError::file_io(path, e))
    }

    pub fn read(path: &Path) -> Result<Self, EmbrError> {
        let text = std::fs::read_to_string(path).map_err(|e| EmbrError::file_io(path, e))?;
        Ok(Self::parse(&text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_replaces_existing_key() {
        let mut s = Sidecar::new();
        s.set("model", "v1");
        s.set("model", "v2");
        assert_eq!(s.get("model"), Some("v2"));
        assert_eq!(s.len(), 1);
    }

    #[test]
    fn roundtrips_through_text() {
        let mut s = Sidecar::new();
        s.set("source_file", "doc.txt");
        s.set("provider", "openai");
        let text = s.to_text();
        let parsed = Sidecar::parse(&text);
        assert_eq!(parsed.get("source_file"), Some("doc.txt"));
        assert_eq!(parsed.provider(), Some("openai"));
    }
}
