//! Identity-addressed storage of emitted visual artifacts.
//!
//! A visual artifact is the stripped duplicate of a subtree, stored as a
//! binary file at `<root>/visual/<identity>.visual`. Each file starts with a
//! header containing magic bytes, a format version, and a checksum of the
//! payload. The hash of the whole file is the artifact hash recorded in the
//! pass cache; re-hashing the file later tells whether it is still the one
//! the cache remembers.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use prism_common::{ArtifactHash, ContentHash, Identity};
use prism_graph::Scene;
use serde::{Deserialize, Serialize};

use crate::error::CacheError;

/// Magic bytes identifying a prism visual artifact.
const ARTIFACT_MAGIC: [u8; 4] = *b"PRSM";

/// Current artifact format version. Increment on breaking changes to
/// the header or payload format.
const ARTIFACT_FORMAT_VERSION: u32 = 1;

/// Subdirectory of visual artifacts.
const VISUAL_SUBDIR: &str = "visual";

/// Extension of visual artifacts.
const VISUAL_EXT: &str = "visual";

/// Subdirectory of geometry artifacts.
const GEOMETRY_SUBDIR: &str = "geometry";

/// Header prepended to every visual artifact for validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactHeader {
    /// Magic bytes: must be `b"PRSM"`.
    pub magic: [u8; 4],

    /// Artifact format version.
    pub format_version: u32,

    /// Version of the tool that produced this artifact.
    pub producer_version: String,

    /// Content hash of the payload data (for integrity checks).
    pub checksum: ContentHash,
}

/// Store for the visual and geometry artifacts of one namespace/version.
pub struct ArtifactStore {
    /// `<cache_dir>/<version>`.
    root: PathBuf,
}

impl ArtifactStore {
    /// Creates a new artifact store rooted at the given directory.
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
        }
    }

    /// Ensures that the given artifact subdirectory exists.
    fn ensure_dir(&self, subdir: &str) -> Result<PathBuf, CacheError> {
        let dir = self.root.join(subdir);
        std::fs::create_dir_all(&dir).map_err(|e| CacheError::Io {
            path: dir.clone(),
            source: e,
        })?;
        Ok(dir)
    }

    /// Path of the visual artifact for `identity`.
    pub fn visual_path(&self, identity: Identity) -> PathBuf {
        self.root
            .join(VISUAL_SUBDIR)
            .join(format!("{identity}.{VISUAL_EXT}"))
    }

    /// Path of the geometry artifact for `identity`.
    pub fn geometry_path(&self, identity: Identity, ext: &str) -> PathBuf {
        self.root
            .join(GEOMETRY_SUBDIR)
            .join(format!("{identity}.{ext}"))
    }

    /// Like [`geometry_path`](Self::geometry_path), but creates the geometry
    /// directory first so an exporter can write to the path immediately.
    pub fn geometry_destination(&self, identity: Identity, ext: &str) -> Result<PathBuf, CacheError> {
        self.ensure_dir(GEOMETRY_SUBDIR)?;
        Ok(self.geometry_path(identity, ext))
    }

    /// Writes the visual artifact for `identity` and returns its artifact hash.
    pub fn write_visual(
        &self,
        identity: Identity,
        visual: &Scene,
        producer_version: &str,
    ) -> Result<ArtifactHash, CacheError> {
        self.ensure_dir(VISUAL_SUBDIR)?;
        let path = self.visual_path(identity);

        let payload = bincode::serde::encode_to_vec(visual, bincode::config::standard())
            .map_err(|e| CacheError::Serialization {
                reason: e.to_string(),
            })?;
        let header = ArtifactHeader {
            magic: ARTIFACT_MAGIC,
            format_version: ARTIFACT_FORMAT_VERSION,
            producer_version: producer_version.to_string(),
            checksum: ContentHash::from_bytes(&payload),
        };
        let header_bytes = bincode::serde::encode_to_vec(&header, bincode::config::standard())
            .map_err(|e| CacheError::Serialization {
                reason: e.to_string(),
            })?;

        // 4-byte header length (little-endian) + header + payload
        let header_len = header_bytes.len() as u32;
        let mut output = Vec::with_capacity(4 + header_bytes.len() + payload.len());
        output.extend_from_slice(&header_len.to_le_bytes());
        output.extend_from_slice(&header_bytes);
        output.extend_from_slice(&payload);

        std::fs::write(&path, &output).map_err(|e| CacheError::Io { path, source: e })?;
        Ok(ArtifactHash::from_bytes(&output))
    }

    /// Returns the hash of the visual artifact currently on disk.
    ///
    /// Returns `None` if the file doesn't exist or fails header validation.
    /// This is fail-safe: a damaged artifact never matches a cached hash.
    pub fn artifact_hash(&self, identity: Identity) -> Option<ArtifactHash> {
        let raw = std::fs::read(self.visual_path(identity)).ok()?;
        validate(&raw)?;
        Some(ArtifactHash::from_bytes(&raw))
    }

    /// Reads back the stripped subtree stored for `identity`.
    pub fn read_visual(&self, identity: Identity) -> Option<Scene> {
        let raw = std::fs::read(self.visual_path(identity)).ok()?;
        let payload = validate(&raw)?;
        bincode::serde::decode_from_slice(payload, bincode::config::standard())
            .ok()
            .map(|(scene, _)| scene)
    }

    /// Removes artifacts whose identity is not in `live`.
    ///
    /// Files whose stem is not an identity are left alone. Returns the number
    /// of files removed.
    pub fn gc(&self, live: &HashSet<Identity>) -> Result<usize, CacheError> {
        let mut removed = 0;
        for subdir in [VISUAL_SUBDIR, GEOMETRY_SUBDIR] {
            let dir = self.root.join(subdir);
            if !dir.exists() {
                continue;
            }
            let entries = std::fs::read_dir(&dir).map_err(|e| CacheError::Io {
                path: dir.clone(),
                source: e,
            })?;
            for entry in entries {
                let entry = entry.map_err(|e| CacheError::Io {
                    path: dir.clone(),
                    source: e,
                })?;
                let path = entry.path();
                let stale = path
                    .file_stem()
                    .and_then(|s| s.to_str())
                    .and_then(|s| s.parse::<Identity>().ok())
                    .is_some_and(|id| !live.contains(&id));
                if stale {
                    std::fs::remove_file(&path).map_err(|e| CacheError::Io {
                        path: path.clone(),
                        source: e,
                    })?;
                    removed += 1;
                }
            }
        }
        Ok(removed)
    }
}

/// Validates the header of a raw artifact and returns its payload.
fn validate(raw: &[u8]) -> Option<&[u8]> {
    if raw.len() < 4 {
        return None;
    }
    let header_len = u32::from_le_bytes(raw[..4].try_into().ok()?) as usize;
    if raw.len() < 4 + header_len {
        return None;
    }
    let header: ArtifactHeader =
        bincode::serde::decode_from_slice(&raw[4..4 + header_len], bincode::config::standard())
            .ok()?
            .0;
    if header.magic != ARTIFACT_MAGIC || header.format_version != ARTIFACT_FORMAT_VERSION {
        return None;
    }
    let payload = &raw[4 + header_len..];
    if ContentHash::from_bytes(payload) != header.checksum {
        return None;
    }
    Some(payload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use prism_graph::{Component, Node, SceneGraph};

    fn make_store() -> (tempfile::TempDir, ArtifactStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());
        (dir, store)
    }

    fn visual() -> Scene {
        let mut scene = Scene::new("Crate");
        let root = scene.add_root(Node::new("Crate").with_component(Component::new("MeshFilter")));
        scene
            .add_child(root, Node::new("Lid").with_component(Component::new("MeshRenderer")))
            .unwrap();
        scene
    }

    fn write_raw(store: &ArtifactStore, identity: Identity, header: &ArtifactHeader, payload: &[u8]) {
        std::fs::create_dir_all(store.visual_path(identity).parent().unwrap()).unwrap();
        let header_bytes =
            bincode::serde::encode_to_vec(header, bincode::config::standard()).unwrap();
        let mut output = Vec::new();
        output.extend_from_slice(&(header_bytes.len() as u32).to_le_bytes());
        output.extend_from_slice(&header_bytes);
        output.extend_from_slice(payload);
        std::fs::write(store.visual_path(identity), output).unwrap();
    }

    #[test]
    fn write_and_read_roundtrip() {
        let (_dir, store) = make_store();
        let id = Identity::new(4);
        let hash = store.write_visual(id, &visual(), "0.1.0").unwrap();
        assert_eq!(store.artifact_hash(id), Some(hash));
        let back = store.read_visual(id).unwrap();
        assert_eq!(back, visual());
        assert_eq!(back.len(), 2);
    }

    #[test]
    fn rewrite_with_same_content_has_same_hash() {
        let (_dir, store) = make_store();
        let id = Identity::new(4);
        let first = store.write_visual(id, &visual(), "0.1.0").unwrap();
        let second = store.write_visual(id, &visual(), "0.1.0").unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn modified_file_changes_hash() {
        let (_dir, store) = make_store();
        let id = Identity::new(4);
        let written = store.write_visual(id, &visual(), "0.1.0").unwrap();
        let mut other = visual();
        other.node_mut(prism_graph::NodeId(0)).unwrap().name = "Barrel".to_string();
        store.write_visual(id, &other, "0.1.0").unwrap();
        assert_ne!(store.artifact_hash(id), Some(written));
    }

    #[test]
    fn missing_artifact_has_no_hash() {
        let (_dir, store) = make_store();
        assert!(store.artifact_hash(Identity::new(9)).is_none());
        assert!(store.read_visual(Identity::new(9)).is_none());
    }

    #[test]
    fn corrupt_data_has_no_hash() {
        let (_dir, store) = make_store();
        let id = Identity::new(5);
        std::fs::create_dir_all(store.visual_path(id).parent().unwrap()).unwrap();
        std::fs::write(store.visual_path(id), b"garbage data").unwrap();
        assert!(store.artifact_hash(id).is_none());
    }

    #[test]
    fn truncated_header_has_no_hash() {
        let (_dir, store) = make_store();
        let id = Identity::new(5);
        std::fs::create_dir_all(store.visual_path(id).parent().unwrap()).unwrap();
        std::fs::write(store.visual_path(id), b"AB").unwrap();
        assert!(store.artifact_hash(id).is_none());
    }

    #[test]
    fn wrong_magic_has_no_hash() {
        let (_dir, store) = make_store();
        let id = Identity::new(6);
        let header = ArtifactHeader {
            magic: *b"BAAD",
            format_version: ARTIFACT_FORMAT_VERSION,
            producer_version: "0.1.0".to_string(),
            checksum: ContentHash::from_bytes(b"data"),
        };
        write_raw(&store, id, &header, b"data");
        assert!(store.artifact_hash(id).is_none());
    }

    #[test]
    fn wrong_version_has_no_hash() {
        let (_dir, store) = make_store();
        let id = Identity::new(6);
        let header = ArtifactHeader {
            magic: ARTIFACT_MAGIC,
            format_version: 999,
            producer_version: "0.1.0".to_string(),
            checksum: ContentHash::from_bytes(b"data"),
        };
        write_raw(&store, id, &header, b"data");
        assert!(store.artifact_hash(id).is_none());
    }

    #[test]
    fn checksum_mismatch_has_no_hash() {
        let (_dir, store) = make_store();
        let id = Identity::new(6);
        let header = ArtifactHeader {
            magic: ARTIFACT_MAGIC,
            format_version: ARTIFACT_FORMAT_VERSION,
            producer_version: "0.1.0".to_string(),
            checksum: ContentHash::from_bytes(b"data"),
        };
        write_raw(&store, id, &header, b"tampered");
        assert!(store.artifact_hash(id).is_none());
    }

    #[test]
    fn paths_are_identity_addressed() {
        let (_dir, store) = make_store();
        assert!(store
            .visual_path(Identity::new(12))
            .ends_with("visual/12.visual"));
        let geometry = store.geometry_path(Identity::new(12), "fbx");
        assert!(geometry.ends_with("geometry/12.fbx"));
        assert!(!geometry.parent().unwrap().exists());
        let destination = store.geometry_destination(Identity::new(12), "fbx").unwrap();
        assert_eq!(destination, geometry);
        assert!(geometry.parent().unwrap().is_dir());
    }

    #[test]
    fn gc_removes_unbound_identities() {
        let (_dir, store) = make_store();
        store.write_visual(Identity::new(4), &visual(), "0.1.0").unwrap();
        store.write_visual(Identity::new(5), &visual(), "0.1.0").unwrap();
        let geometry = store.geometry_destination(Identity::new(5), "fbx").unwrap();
        std::fs::write(&geometry, b"mesh").unwrap();
        let notes = store.geometry_destination(Identity::new(4), "fbx").unwrap();
        std::fs::write(notes.with_file_name("README.md"), b"keep").unwrap();

        let live: HashSet<Identity> = [Identity::new(4)].into_iter().collect();
        assert_eq!(store.gc(&live).unwrap(), 2);
        assert!(store.artifact_hash(Identity::new(4)).is_some());
        assert!(store.artifact_hash(Identity::new(5)).is_none());
        assert!(!geometry.exists());
        assert!(notes.with_file_name("README.md").exists());
    }

    #[test]
    fn gc_without_directories_removes_nothing() {
        let (_dir, store) = make_store();
        assert_eq!(store.gc(&HashSet::new()).unwrap(), 0);
    }

    #[test]
    fn visual_scene_keeps_structure() {
        let (_dir, store) = make_store();
        let id = Identity::new(8);
        store.write_visual(id, &visual(), "0.1.0").unwrap();
        let back = store.read_visual(id).unwrap();
        let root = back.roots()[0];
        assert_eq!(back.children(root).len(), 1);
    }
}
