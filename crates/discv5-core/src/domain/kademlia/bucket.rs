//! K-Bucket implementation for Kademlia routing.

/// A stored value together with its cached distance key.
#[derive(Debug, Clone)]
pub(crate) struct Entry<V> {
    pub(crate) value: V,
    pub(crate) key: Vec<u8>,
    /// Table-wide counter value at the time the entry was last inserted or refreshed.
    pub(crate) seen: u64,
}

/// A k-bucket storing up to k values at one distance class.
///
/// Entries are ordered least-recently-seen first. A full bucket may remember
/// the newcomer of its last rejected `propose`; it is only a hint for the
/// caller and is forgotten as soon as the bucket takes a new entry.
#[derive(Debug, Clone)]
pub struct KBucket<V> {
    pub(crate) entries: Vec<Entry<V>>,
    pub(crate) pending: Option<Entry<V>>,
}

impl<V> KBucket<V> {
    /// Create a new empty k-bucket
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            pending: None,
        }
    }

    /// Get the number of entries in this bucket
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the bucket is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Check if the bucket is full
    pub fn is_full(&self, k: usize) -> bool {
        self.entries.len() >= k
    }

    /// Get the least recently seen value
    pub fn oldest(&self) -> Option<&V> {
        self.entries.first().map(|e| &e.value)
    }

    /// Values from least to most recently seen
    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.entries.iter().map(|e| &e.value)
    }

    /// Newcomer of the last rejected `propose`, if any
    pub fn pending(&self) -> Option<&V> {
        self.pending.as_ref().map(|e| &e.value)
    }

    pub(crate) fn position(&self, key: &[u8]) -> Option<usize> {
        self.entries.iter().position(|e| e.key == key)
    }

    /// Append as most recently seen (assumes not full)
    pub(crate) fn push(&mut self, entry: Entry<V>) {
        self.pending = None;
        self.entries.push(entry);
    }

    /// Replace the entry at `pos` and move it to the most recently seen position
    pub(crate) fn refresh(&mut self, pos: usize, entry: Entry<V>) {
        self.entries.remove(pos);
        self.entries.push(entry);
    }

    pub(crate) fn pop_oldest(&mut self) -> Option<Entry<V>> {
        (!self.entries.is_empty()).then(|| self.entries.remove(0))
    }

    /// Remove by key, leaving the slot free
    pub(crate) fn remove(&mut self, key: &[u8]) -> Option<Entry<V>> {
        let pos = self.position(key)?;
        Some(self.entries.remove(pos))
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
        self.pending = None;
    }
}

impl<V> Default for KBucket<V> {
    fn default() -> Self {
        Self::new()
    }
}
