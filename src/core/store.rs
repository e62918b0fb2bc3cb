use std::collections::HashMap;

/// Last captured full text of each watched file.
///
/// Unbounded on purpose: the key space is the fixed list of watched files.
#[derive(Debug, Default, Clone)]
pub struct ContentStore {
    contents: HashMap<String, String>,
}

impl ContentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, file: &str) -> Option<&str> {
        self.contents.get(file).map(String::as_str)
    }

    /// Replace the snapshot for `file`
    pub fn set(&mut self, file: impl Into<String>, text: impl Into<String>) {
        self.contents.insert(file.into(), text.into());
    }

    pub fn contains(&self, file: &str) -> bool {
        self.contents.contains_key(file)
    }

    pub fn len(&self) -> usize {
        self.contents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contents.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_and_set() {
        let mut store = ContentStore::new();
        assert!(store.get("file1.txt").is_none());

        store.set("file1.txt", "a\nb");
        assert_eq!(store.get("file1.txt"), Some("a\nb"));

        store.set("file1.txt", "a\nb\nc");
        assert_eq!(store.get("file1.txt"), Some("a\nb\nc"));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_empty_text_is_still_an_entry() {
        let mut store = ContentStore::new();
        store.set("file2.txt", "");

        assert!(store.contains("file2.txt"));
        assert_eq!(store.get("file2.txt"), Some(""));
    }
}
