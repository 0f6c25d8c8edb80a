use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::models::ArchiveError;

/// Attribute holding the entry's path inside the archive
pub const PATH_KEY: &str = "Path";

/// One record of an archive listing
///
/// Maps attribute names (spaces removed, so `Packed Size` becomes
/// `PackedSize`) to the raw value text. Values are never coerced; the typed
/// views below parse on demand.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArchiveEntry {
    attributes: Vec<(String, String)>,
}

impl ArchiveEntry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an attribute, replacing any previous value for the same key
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.attributes.iter_mut().find(|(k, _)| *k == key) {
            Some((_, existing)) => *existing = value,
            None => self.attributes.push((key, value)),
        }
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Like [`get`](Self::get), but a missing key is an error
    pub fn require(&self, key: &str) -> Result<&str, ArchiveError> {
        self.get(key)
            .ok_or_else(|| ArchiveError::MissingAttribute(key.to_string()))
    }

    pub fn path(&self) -> Result<&str, ArchiveError> {
        self.require(PATH_KEY)
    }

    /// Uncompressed size, if reported and numeric
    pub fn size(&self) -> Option<u64> {
        self.get("Size").and_then(|s| s.trim().parse().ok())
    }

    /// `Folder = +` on most formats, a leading `D` in `Attributes` otherwise
    pub fn is_directory(&self) -> bool {
        match self.get("Folder") {
            Some(folder) => folder.trim() == "+",
            None => self
                .get("Attributes")
                .map(|attrs| attrs.starts_with('D'))
                .unwrap_or(false),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.attributes.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }
}

impl Serialize for ArchiveEntry {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.attributes.len()))?;
        for (key, value) in &self.attributes {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_last_write_wins() {
        let mut entry = ArchiveEntry::new();
        entry.insert("Path", "a.txt");
        entry.insert("Size", "10");
        entry.insert("Path", "b.txt");
        assert_eq!(entry.len(), 2);
        assert_eq!(entry.path().unwrap(), "b.txt");
        let keys: Vec<&str> = entry.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["Path", "Size"]);
    }

    #[test]
    fn test_missing_path() {
        let entry = ArchiveEntry::new().with("Size", "10");
        match entry.path() {
            Err(ArchiveError::MissingAttribute(key)) => assert_eq!(key, "Path"),
            other => panic!("Expected MissingAttribute, got {:?}", other),
        }
    }

    #[test]
    fn test_typed_views() {
        let file = ArchiveEntry::new()
            .with("Path", "docs/readme.txt")
            .with("Size", "1024")
            .with("Folder", "-");
        assert_eq!(file.size(), Some(1024));
        assert!(!file.is_directory());

        let dir = ArchiveEntry::new()
            .with("Path", "docs")
            .with("Attributes", "D_ drwxr-xr-x");
        assert!(dir.is_directory());
        assert_eq!(dir.size(), None);
    }

    #[test]
    fn test_serializes_as_ordered_object() {
        let entry = ArchiveEntry::new()
            .with("Path", "a.txt")
            .with("Size", "10")
            .with("CRC", "DEADBEEF");
        let json = serde_json::to_string(&entry).unwrap();
        assert_eq!(json, r#"{"Path":"a.txt","Size":"10","CRC":"DEADBEEF"}"#);
    }
}
