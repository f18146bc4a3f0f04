//! Kademlia Routing Table
//!
//! A distance-bucketed store of arbitrary values. Each value is placed by the
//! XOR distance between the local identifier and the value's distance key
//! (projected by a caller-supplied closure), so the table works equally for
//! node records, bare node ids or test strings.
//!
//! Insertion comes in two flavours:
//! - `add` always inserts, evicting the least-recently-seen entry of a full bucket;
//! - `propose` never overfills: it hands back the eviction candidate and
//!   parks the newcomer as the bucket's replacement until `evict` frees a slot.

// Semantic submodules
mod bucket;
mod distance;
mod table;

// Re-export public API
pub use bucket::KBucket;
pub use distance::{xor_dist, xor_dist_cmp};
pub use table::KademliaRoutingTable;
