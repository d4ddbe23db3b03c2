//! Cache entries and the passes that own them.

use std::fmt;

use prism_common::{ArtifactHash, ContentHash, Identity};

/// File-name prefix of scene-pass caches.
pub const SCENE_FILE_PREFIX: &str = "scene_object_hashes_";

/// File name of the template-pass cache.
pub const TEMPLATES_FILE: &str = "asset_prefab_hashes.txt";

/// Extension shared by every cache file.
pub const CACHE_FILE_EXT: &str = "txt";

/// One identity a root hash was exported under, with the artifact it produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Binding {
    /// The identity the artifact was emitted for.
    pub identity: Identity,
    /// Hash of the visual artifact as written.
    pub artifact: ArtifactHash,
}

/// A persisted record: one content hash and every identity bound to it.
///
/// A root can bind several identities when it contains several
/// identity-bearing nested roots; binding order is the order they were
/// exported in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    /// Content hash of the source subtree.
    pub hash: ContentHash,
    /// Identities exported for this hash, in export order.
    pub bindings: Vec<Binding>,
}

impl CacheEntry {
    /// Creates an entry with no bindings.
    pub fn new(hash: ContentHash) -> Self {
        Self {
            hash,
            bindings: Vec::new(),
        }
    }

    /// Appends a binding and returns the entry.
    pub fn with_binding(mut self, identity: Identity, artifact: ArtifactHash) -> Self {
        self.bindings.push(Binding { identity, artifact });
        self
    }

    /// Iterates the bound identities.
    pub fn identities(&self) -> impl Iterator<Item = Identity> + '_ {
        self.bindings.iter().map(|b| b.identity)
    }
}

/// Which pass a cache file belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PassKey {
    /// A scene pass; built with [`PassKey::scene`].
    Scene(SceneNamespace),
    /// The template-library pass.
    Templates,
}

/// File-name-safe namespace of a scene cache.
///
/// Only [`PassKey::scene`] can build one. Names that needed rewriting get a
/// short hash of the original appended, so two different namespaces never
/// share a file.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SceneNamespace(String);

impl SceneNamespace {
    /// The encoded namespace as it appears in the file name.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl PassKey {
    /// Builds a scene key from any namespace (e.g. a scene GUID or path).
    pub fn scene(namespace: &str) -> Self {
        let safe = |c: char| c.is_ascii_alphanumeric() || c == '_' || c == '.';
        let mut encoded: String = namespace
            .chars()
            .map(|c| if safe(c) { c } else { '_' })
            .collect();
        // '-' never survives encoding, so it only ever introduces the suffix.
        if encoded != namespace || encoded.is_empty() || encoded.chars().all(|c| c == '.') {
            let digest = ContentHash::from_bytes(namespace.as_bytes()).to_string();
            encoded.push('-');
            encoded.push_str(&digest[..8]);
        }
        PassKey::Scene(SceneNamespace(encoded))
    }

    /// The cache file name for this pass.
    pub fn file_name(&self) -> String {
        match self {
            PassKey::Scene(ns) => format!("{SCENE_FILE_PREFIX}{}.{CACHE_FILE_EXT}", ns.0),
            PassKey::Templates => TEMPLATES_FILE.to_string(),
        }
    }

    /// Returns `true` for the template pass.
    pub fn is_templates(&self) -> bool {
        matches!(self, PassKey::Templates)
    }
}

impl fmt::Display for PassKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PassKey::Scene(ns) => write!(f, "scene '{}'", ns.0),
            PassKey::Templates => write!(f, "templates"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_names() {
        assert_eq!(
            PassKey::scene("a1b2").file_name(),
            "scene_object_hashes_a1b2.txt"
        );
        assert_eq!(PassKey::Templates.file_name(), "asset_prefab_hashes.txt");
    }

    #[test]
    fn rewritten_namespaces_get_a_hash_suffix() {
        let PassKey::Scene(ns) = PassKey::scene("Levels/Main Hall") else {
            panic!("expected a scene key");
        };
        assert!(ns.as_str().starts_with("Levels_Main_Hall-"));
        assert_eq!(ns.as_str().len(), "Levels_Main_Hall-".len() + 8);
        assert_eq!(PassKey::scene("Levels/Main Hall"), PassKey::scene("Levels/Main Hall"));
    }

    #[test]
    fn similar_namespaces_do_not_share_a_file() {
        let names = ["a/b", "a_b", "a b", "a-b", "", ".", ".."];
        let files: std::collections::HashSet<String> =
            names.iter().map(|n| PassKey::scene(n).file_name()).collect();
        assert_eq!(files.len(), names.len());
        assert_eq!(PassKey::scene("a_b").file_name(), "scene_object_hashes_a_b.txt");
        assert!(files.iter().all(|f| !f.contains('/')));
    }

    #[test]
    fn entry_identities_in_order() {
        let art = ArtifactHash::from_bytes(b"a");
        let entry = CacheEntry::new(ContentHash::from_bytes(b"root"))
            .with_binding(Identity::new(9), art)
            .with_binding(Identity::new(5), art);
        let ids: Vec<u16> = entry.identities().map(Identity::get).collect();
        assert_eq!(ids, vec![9, 5]);
    }
}
