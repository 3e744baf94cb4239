//! Hash map/set aliases using the fx hasher (the same fast, non-DoS-resistant
//! hash rustc uses internally; the compiler core never hashes adversarial
//! input, so speed wins over resistance to hash-flooding).

pub type FxHashMap<K, V> = std::collections::HashMap<K, V, rustc_hash::FxBuildHasher>;
pub type FxHashSet<V> = std::collections::HashSet<V, rustc_hash::FxBuildHasher>;

pub fn new_fx_hash_map<K, V>() -> FxHashMap<K, V> {
    FxHashMap::default()
}

pub fn new_fx_hash_set<V>() -> FxHashSet<V> {
    FxHashSet::default()
}
