//! Content-addressed identity for a `FlowNode`: combines its own settings
//! with its parents' hashes so a change anywhere upstream propagates
//! forward without re-walking the whole graph.

use flowfile_settings::{NodeId, NodeSettings, Port};

/// One parent's contribution to a node's hash.
#[derive(Clone, Copy, Debug)]
pub struct ParentHash {
    pub node_id: NodeId,
    pub port: Port,
    pub hash: blake3::Hash,
}

/// `H(variant_tag || canonical_payload || hash(left) || hash(right) ||
/// sorted(hash(main...)))`.
///
/// `Left`/`Right` are hashed in that fixed order — join semantics are
/// asymmetric. `Main` parents (every parent of a multi-input kind, or the
/// single parent of a single-input kind) are sorted by ascending parent
/// `node_id` first, per spec.md §4.2, so declaration order of a union's
/// inputs never perturbs the result.
pub fn compute_hash(settings: &NodeSettings, parents: &[ParentHash]) -> blake3::Hash {
    let mut hasher = blake3::Hasher::new();
    hasher.update(settings.kind().as_str().as_bytes());

    let payload_bytes = serde_json::to_vec(&settings.canonical_payload()).unwrap_or_default();
    hasher.update(&payload_bytes);

    for port in [Port::Left, Port::Right] {
        if let Some(p) = parents.iter().find(|p| p.port == port) {
            hasher.update(p.hash.as_bytes());
        }
    }

    let mut main: Vec<&ParentHash> = parents.iter().filter(|p| p.port == Port::Main).collect();
    main.sort_by_key(|p| p.node_id);
    for p in &main {
        hasher.update(p.hash.as_bytes());
    }

    hasher.finalize()
}

#[cfg(test)]
mod tests {
    use super::*;
    use flowfile_settings::{CommonSettings, FilterSettings, NodeSettings};

    fn filter(node_id: i64, predicate: &str) -> NodeSettings {
        NodeSettings::Filter(FilterSettings {
            common: CommonSettings::new(1, node_id),
            depending_on_id: 0,
            predicate: predicate.to_string(),
        })
    }

    #[test]
    fn hash_changes_with_predicate() {
        let a = compute_hash(&filter(2, "x > 1"), &[]);
        let b = compute_hash(&filter(2, "x > 2"), &[]);
        assert_ne!(a, b);
    }

    #[test]
    fn hash_stable_across_ui_field_changes() {
        let mut s1 = filter(2, "x > 1");
        let mut s2 = s1.clone();
        s1.common_mut().pos_x = 5.0;
        s2.common_mut().pos_x = 500.0;
        assert_eq!(compute_hash(&s1, &[]), compute_hash(&s2, &[]));
    }

    #[test]
    fn main_parent_order_does_not_perturb_hash() {
        let h1 = blake3::hash(b"a");
        let h2 = blake3::hash(b"b");
        let settings = filter(3, "x > 1");
        let forward = [
            ParentHash { node_id: 10, port: Port::Main, hash: h1 },
            ParentHash { node_id: 20, port: Port::Main, hash: h2 },
        ];
        let backward = [
            ParentHash { node_id: 20, port: Port::Main, hash: h2 },
            ParentHash { node_id: 10, port: Port::Main, hash: h1 },
        ];
        assert_eq!(compute_hash(&settings, &forward), compute_hash(&settings, &backward));
    }
}
