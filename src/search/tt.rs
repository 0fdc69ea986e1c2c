use std::collections::HashMap;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Bound {
    Exact,
    Lower,
    Upper,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Entry {
    pub score: i32,
    pub bound: Bound,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct Key {
    fingerprint: String,
    depth: u32,
    maximizing: bool,
}

const DEFAULT_CAPACITY: usize = 1 << 16;

/// Search-episode memo: (fingerprint, remaining depth, side maximizing) → score.
///
/// Scores depend on the depth searched, so the depth is part of the key and
/// an entry is only reused at exactly that depth. Once full, new entries are
/// dropped until the next `clear`.
#[derive(Debug)]
pub struct PositionCache {
    map: HashMap<Key, Entry>,
    capacity: usize,
}

impl Default for PositionCache {
    fn default() -> Self { Self::with_capacity(DEFAULT_CAPACITY) }
}

impl PositionCache {
    pub fn with_capacity(capacity: usize) -> Self {
        Self { map: HashMap::new(), capacity: capacity.max(1) }
    }

    pub fn clear(&mut self) { self.map.clear(); }

    pub fn len(&self) -> usize { self.map.len() }

    pub fn is_empty(&self) -> bool { self.map.is_empty() }

    pub fn capacity(&self) -> usize { self.capacity }

    pub fn set_capacity_entries(&mut self, cap: usize) {
        self.capacity = cap.max(1);
        if self.map.len() > self.capacity { self.map.clear(); }
    }

    pub fn get(&self, fingerprint: &str, depth: u32, maximizing: bool) -> Option<Entry> {
        let key = Key { fingerprint: fingerprint.to_string(), depth, maximizing };
        self.map.get(&key).copied()
    }

    pub fn put(&mut self, fingerprint: String, depth: u32, maximizing: bool, entry: Entry) {
        let key = Key { fingerprint, depth, maximizing };
        if self.map.len() >= self.capacity && !self.map.contains_key(&key) { return; }
        self.map.insert(key, entry);
    }

    /// Score usable inside the (alpha, beta) window, if any.
    pub fn probe(&self, fingerprint: &str, depth: u32, maximizing: bool, alpha: i32, beta: i32) -> Option<i32> {
        let e = self.get(fingerprint, depth, maximizing)?;
        match e.bound {
            Bound::Exact => Some(e.score),
            Bound::Lower if e.score >= beta => Some(e.score),
            Bound::Upper if e.score <= alpha => Some(e.score),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounds_respect_window() {
        let mut c = PositionCache::default();
        c.put("a".into(), 2, true, Entry { score: 50, bound: Bound::Lower });
        assert_eq!(c.probe("a", 2, true, -100, 40), Some(50));
        assert_eq!(c.probe("a", 2, true, -100, 60), None);
        assert_eq!(c.probe("a", 3, true, -100, 40), None, "depth must match exactly");
        assert_eq!(c.probe("a", 2, false, -100, 40), None);
    }

    #[test]
    fn full_cache_keeps_existing_entries() {
        let mut c = PositionCache::with_capacity(1);
        c.put("a".into(), 1, true, Entry { score: 1, bound: Bound::Exact });
        c.put("b".into(), 1, true, Entry { score: 2, bound: Bound::Exact });
        assert_eq!(c.len(), 1);
        c.put("a".into(), 1, true, Entry { score: 3, bound: Bound::Exact });
        assert_eq!(c.probe("a", 1, true, 0, 0), Some(3));
        c.clear();
        assert!(c.is_empty());
    }
}
