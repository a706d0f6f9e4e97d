//! Map types keyed by integers and entity ids.
//!
//! Id-keyed maps use `nohash-hasher`: the ids are already well-distributed
//! (dense allocator output), so hashing them again buys nothing. General maps
//! use `hashbrown` with `ahash`'s fixed-seed state.

use core::hash::BuildHasherDefault;
use nohash_hasher::NoHashHasher;

/// A map whose keys hash to themselves. `K` must implement
/// [`nohash_hasher::IsEnabled`].
pub type IntMap<K, V> = hashbrown::HashMap<K, V, BuildHasherDefault<NoHashHasher<K>>>;

/// A set whose elements hash to themselves.
pub type IntSet<K> = hashbrown::HashSet<K, BuildHasherDefault<NoHashHasher<K>>>;

/// General-purpose map over `ahash`.
pub type HashMap<K, V> = hashbrown::HashMap<K, V, ahash::RandomState>;

/// General-purpose set over `ahash`.
pub type HashSet<K> = hashbrown::HashSet<K, ahash::RandomState>;

/// `hashbrown`'s entry API, re-exported so callers need not name the crate.
pub use hashbrown::hash_map::Entry;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn int_map_basic() {
        let mut m: IntMap<u64, &str> = IntMap::default();
        m.insert(7, "seven");
        assert_eq!(m.get(&7), Some(&"seven"));
        assert_eq!(m.get(&8), None);
    }

    #[test]
    fn hash_map_basic() {
        let mut m: HashMap<String, u32> = HashMap::default();
        m.insert("a".into(), 1);
        assert_eq!(m["a"], 1);
    }
}
