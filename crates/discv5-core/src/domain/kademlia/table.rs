//! Distance-partitioned routing table.

use rand::Rng;

use super::bucket::{Entry, KBucket};
use super::distance::{xor_cmp_unchecked, xor_dist};
use crate::domain::KademliaError;

/// Kademlia routing table generic over the stored value type.
///
/// `F` projects a value to the identifier bytes used for distance
/// computation. Two values with the same projected key are the same entry.
///
/// # Example
///
/// ```rust
/// use discv5_core::KademliaRoutingTable;
///
/// let mut table = KademliaRoutingTable::new(b"1".to_vec(), 2, |s: &String| s.as_bytes().to_vec())
///     .unwrap();
/// table.add("2".to_string()).unwrap();
/// table.add("3".to_string()).unwrap();
///
/// let nearest = table.nearest(b"2", 1).unwrap();
/// assert_eq!(nearest, vec![&"2".to_string()]);
/// ```
pub struct KademliaRoutingTable<V, F> {
    /// Our own identifier (immutable after creation)
    self_id: Vec<u8>,
    /// Bucket capacity
    k: usize,
    /// One bucket per distance class `1..=8 * self_id.len()`
    buckets: Vec<KBucket<V>>,
    distance_key: F,
    recency: Option<fn(&V) -> u64>,
    /// Monotonic insertion counter, the default recency order
    clock: u64,
}

impl<V, F> KademliaRoutingTable<V, F>
where
    F: Fn(&V) -> Vec<u8>,
{
    /// Create a new routing table.
    ///
    /// # Arguments
    /// * `self_id` - Local identifier; values at distance 0 from it are never stored
    /// * `k` - Bucket capacity
    /// * `distance_key` - Extracts the identifier bytes of a value
    ///
    /// # Errors
    /// `EmptySelfId` for an empty identifier, `InvalidBucketSize` for `k == 0`.
    pub fn new(self_id: Vec<u8>, k: usize, distance_key: F) -> Result<Self, KademliaError> {
        if self_id.is_empty() {
            return Err(KademliaError::EmptySelfId);
        }
        if k == 0 {
            return Err(KademliaError::InvalidBucketSize);
        }

        let buckets = (0..self_id.len() * 8).map(|_| KBucket::new()).collect();
        Ok(Self {
            self_id,
            k,
            buckets,
            distance_key,
            recency: None,
            clock: 0,
        })
    }

    /// Order `nearest` ties by this timestamp (most recent first) instead of
    /// insertion order.
    pub fn with_recency(mut self, recency: fn(&V) -> u64) -> Self {
        self.recency = Some(recency);
        self
    }

    /// Local identifier.
    pub fn self_id(&self) -> &[u8] {
        &self.self_id
    }

    /// Bucket capacity.
    pub fn k(&self) -> usize {
        self.k
    }

    /// Number of distance classes (8 bits per identifier byte).
    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    /// Total number of stored values.
    pub fn len(&self) -> usize {
        self.buckets.iter().map(KBucket::len).sum()
    }

    /// True when no value is stored.
    pub fn is_empty(&self) -> bool {
        self.buckets.iter().all(KBucket::is_empty)
    }

    /// Remove every value and every replacement candidate.
    pub fn clear(&mut self) {
        self.buckets.iter_mut().for_each(KBucket::clear);
    }

    /// All stored values, closest bucket first.
    pub fn iter(&self) -> impl Iterator<Item = &V> {
        self.buckets.iter().flat_map(|b| b.values())
    }

    fn bucket_index(&self, key: &[u8]) -> Result<usize, KademliaError> {
        match xor_dist(&self.self_id, key)? {
            0 => Err(KademliaError::SelfEntry),
            d => Ok(d - 1),
        }
    }

    fn entry(&mut self, value: V) -> Result<(usize, Entry<V>), KademliaError> {
        let key = (self.distance_key)(&value);
        let idx = self.bucket_index(&key)?;
        self.clock += 1;
        Ok((
            idx,
            Entry {
                value,
                key,
                seen: self.clock,
            },
        ))
    }

    /// Insert unconditionally.
    ///
    /// An existing entry with the same key is replaced and becomes most
    /// recently seen. If the bucket is full, its least recently seen entry is
    /// evicted and returned.
    pub fn add(&mut self, value: V) -> Result<Option<V>, KademliaError> {
        let (idx, entry) = self.entry(value)?;
        let k = self.k;
        let bucket = &mut self.buckets[idx];

        if let Some(pos) = bucket.position(&entry.key) {
            bucket.refresh(pos, entry);
            return Ok(None);
        }

        let evicted = if bucket.is_full(k) {
            bucket.pop_oldest().map(|e| e.value)
        } else {
            None
        };
        bucket.push(entry);
        Ok(evicted)
    }

    /// Remove the entry sharing `value`'s key.
    ///
    /// Returns whether an entry was removed. The freed slot stays empty until
    /// the next `add` or `propose` for that bucket.
    pub fn evict(&mut self, value: &V) -> bool {
        let key = (self.distance_key)(value);
        let Ok(idx) = self.bucket_index(&key) else {
            return false;
        };
        self.buckets[idx].remove(&key).is_some()
    }

    /// True if an entry with `value`'s key is stored.
    pub fn has(&self, value: &V) -> bool {
        let key = (self.distance_key)(value);
        self.bucket_index(&key)
            .map(|idx| self.buckets[idx].position(&key).is_some())
            .unwrap_or(false)
    }

    /// Up to `n` values ordered by ascending XOR distance to `target`.
    ///
    /// # Errors
    /// `LengthMismatch` if `target` is not as long as the local identifier.
    pub fn nearest(&self, target: &[u8], n: usize) -> Result<Vec<&V>, KademliaError> {
        xor_dist(&self.self_id, target)?;

        let mut entries: Vec<&Entry<V>> = self.buckets.iter().flat_map(|b| &b.entries).collect();
        entries.sort_by(|a, b| {
            xor_cmp_unchecked(target, &a.key, &b.key).then_with(|| match self.recency {
                Some(recency) => recency(&b.value).cmp(&recency(&a.value)),
                None => a.seen.cmp(&b.seen),
            })
        });

        Ok(entries.into_iter().take(n).map(|e| &e.value).collect())
    }

    /// [`nearest`](Self::nearest) using `value`'s distance key as target.
    pub fn nearest_to(&self, value: &V, n: usize) -> Result<Vec<&V>, KademliaError> {
        self.nearest(&(self.distance_key)(value), n)
    }

    /// Values whose bucket index is `distance`; empty outside `1..=bucket_count`.
    pub fn peers_of_distance(&self, distance: usize) -> Vec<&V> {
        if distance == 0 || distance > self.buckets.len() {
            return Vec::new();
        }
        self.buckets[distance - 1].values().collect()
    }

    /// Newcomer of the last rejected `propose` for `distance`, until the
    /// bucket takes a new entry.
    pub fn pending_replacement(&self, distance: usize) -> Option<&V> {
        distance
            .checked_sub(1)
            .and_then(|idx| self.buckets.get(idx))
            .and_then(KBucket::pending)
    }

    /// One value chosen uniformly across all buckets.
    pub fn random<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<&V> {
        let total = self.len();
        if total == 0 {
            return None;
        }
        self.iter().nth(rng.gen_range(0..total))
    }
}

impl<V, F> KademliaRoutingTable<V, F>
where
    V: Clone,
    F: Fn(&V) -> Vec<u8>,
{
    /// Insert only if there is room.
    ///
    /// Returns `None` when the value was inserted (or refreshed). When the
    /// bucket is full nothing is inserted: the least recently seen occupant is
    /// returned as eviction candidate and `value` is remembered as
    /// [`pending_replacement`](Self::pending_replacement). The caller decides
    /// whether to [`evict`](Self::evict) the candidate, typically after it
    /// failed a liveness check, and then proposes again.
    pub fn propose(&mut self, value: V) -> Result<Option<V>, KademliaError> {
        let (idx, entry) = self.entry(value)?;
        let k = self.k;
        let bucket = &mut self.buckets[idx];

        if let Some(pos) = bucket.position(&entry.key) {
            bucket.refresh(pos, entry);
            return Ok(None);
        }

        if !bucket.is_full(k) {
            bucket.push(entry);
            return Ok(None);
        }

        let candidate = bucket.oldest().cloned();
        bucket.pending = Some(entry);
        Ok(candidate)
    }
}
