use std::collections::HashMap;
use parking_lot::RwLock;

// Converted images keyed by file name - stored in memory forever
pub struct ConversionCache {
    images: RwLock<HashMap<String, Vec<u8>>>,
}

impl ConversionCache {
    pub fn new() -> Self {
        Self {
            images: RwLock::new(HashMap::new()),
        }
    }

    /// Returns an owned copy of the stored bytes.
    pub fn get(&self, key: &str) -> Option<Vec<u8>> {
        let images = self.images.read();
        images.get(key).cloned()
    }

    /// Stores `data` under `key` unless the key is already populated.
    ///
    /// Returns `true` when this call stored the value. The first writer wins;
    /// later writes for the same key leave the entry untouched.
    pub fn put(&self, key: &str, data: Vec<u8>) -> bool {
        let mut images = self.images.write();
        if images.contains_key(key) {
            return false;
        }
        images.insert(key.to_string(), data);
        true
    }

    pub fn contains(&self, key: &str) -> bool {
        self.images.read().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.images.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.read().is_empty()
    }
}

impl Default for ConversionCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn missing_key_is_absent() {
        let cache = ConversionCache::new();
        assert_eq!(cache.get("nope.png"), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn first_write_wins() {
        let cache = ConversionCache::new();

        assert!(cache.put("a.png", vec![1, 2, 3]));
        assert!(!cache.put("a.png", vec![9, 9]));

        assert_eq!(cache.get("a.png"), Some(vec![1, 2, 3]));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn returned_bytes_do_not_alias_the_entry() {
        let cache = ConversionCache::new();
        cache.put("a.gif", vec![7, 7, 7]);

        let mut copy = cache.get("a.gif").unwrap();
        copy[0] = 0;

        assert_eq!(cache.get("a.gif"), Some(vec![7, 7, 7]));
    }

    #[test]
    fn concurrent_writers_on_one_key_keep_a_single_value() {
        let cache = Arc::new(ConversionCache::new());

        let handles: Vec<_> = (0..8u8)
            .map(|i| {
                let cache = Arc::clone(&cache);
                std::thread::spawn(move || cache.put("shared.bmp", vec![i; 16]))
            })
            .collect();

        let stored: usize = handles
            .into_iter()
            .map(|h| h.join().unwrap() as usize)
            .sum();

        assert_eq!(stored, 1);
        let value = cache.get("shared.bmp").unwrap();
        assert_eq!(value.len(), 16);
        assert!(value.iter().all(|b| *b == value[0]));
    }

    #[test]
    fn concurrent_writers_on_distinct_keys_all_land() {
        let cache = Arc::new(ConversionCache::new());

        let handles: Vec<_> = (0..16)
            .map(|i| {
                let cache = Arc::clone(&cache);
                std::thread::spawn(move || cache.put(&format!("{}.png", i), vec![i as u8]))
            })
            .collect();

        for handle in handles {
            assert!(handle.join().unwrap());
        }

        assert_eq!(cache.len(), 16);
        assert!(cache.contains("15.png"));
    }
}
