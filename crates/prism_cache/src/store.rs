//! Line-oriented persistence of cache entries.
//!
//! Each pass owns one text file under `<cache_dir>/<version>/`. Every line is
//! one entry: the content hash followed by zero or more `identity artifact`
//! token pairs, separated by single spaces:
//!
//! ```text
//! 5f0c…e1 4 9ab3…07 5 77d0…c2
//! ```

use std::path::{Path, PathBuf};

use prism_common::{ArtifactHash, ContentHash, Identity};
use prism_diagnostics::{Diagnostic, DiagnosticCode, DiagnosticSink};

use crate::entry::{Binding, CacheEntry, PassKey, CACHE_FILE_EXT, SCENE_FILE_PREFIX};
use crate::error::CacheError;

/// Reads and writes the per-pass cache files of one namespace/version.
pub struct CacheStore {
    /// `<cache_dir>/<version>`.
    root: PathBuf,
}

impl CacheStore {
    /// Creates a store for `version` under `cache_dir`.
    pub fn new(cache_dir: &Path, version: &str) -> Self {
        Self {
            root: cache_dir.join(version),
        }
    }

    /// The directory holding this version's cache files.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the cache file for `pass`.
    pub fn path_for(&self, pass: &PassKey) -> PathBuf {
        self.root.join(pass.file_name())
    }

    /// Loads every well-formed entry of `pass`, in file order.
    ///
    /// A missing file is an empty cache. Each malformed line (including one
    /// that is not UTF-8) is skipped with a
    /// [`DiagnosticCode::MALFORMED_CACHE_LINE`] warning and the remaining lines
    /// are still read; blank lines are ignored silently. Any other read
    /// failure is an error, never an empty cache.
    pub fn load(
        &self,
        pass: &PassKey,
        sink: &DiagnosticSink,
    ) -> Result<Vec<CacheEntry>, CacheError> {
        self.load_file(&self.path_for(pass), sink)
    }

    /// Loads the caches of every *other* pass of this version, used to
    /// resolve identity collisions.
    ///
    /// The template pass sees every scene cache (in file-name order); a scene
    /// pass sees the template cache followed by the caches of other scenes.
    pub fn load_sibling(
        &self,
        pass: &PassKey,
        sink: &DiagnosticSink,
    ) -> Result<Vec<CacheEntry>, CacheError> {
        let mut entries = match pass {
            PassKey::Scene(_) => self.load(&PassKey::Templates, sink)?,
            PassKey::Templates => Vec::new(),
        };
        let own = self.path_for(pass);
        for path in self.scene_files()? {
            if path != own {
                entries.extend(self.load_file(&path, sink)?);
            }
        }
        Ok(entries)
    }

    /// Overwrites the cache file of `pass` with `entries`.
    ///
    /// The content is written to a sibling temporary file first and renamed
    /// into place, so a crash never leaves a half-written cache behind.
    pub fn save(&self, entries: &[CacheEntry], pass: &PassKey) -> Result<(), CacheError> {
        std::fs::create_dir_all(&self.root).map_err(|e| CacheError::Io {
            path: self.root.clone(),
            source: e,
        })?;
        let path = self.path_for(pass);
        let tmp = path.with_extension("tmp");
        let mut text = String::new();
        for entry in entries {
            text.push_str(&format_line(entry));
            text.push('\n');
        }
        std::fs::write(&tmp, text).map_err(|e| CacheError::Io {
            path: tmp.clone(),
            source: e,
        })?;
        std::fs::rename(&tmp, &path).map_err(|e| CacheError::Io { path, source: e })
    }

    /// Lists scene cache files of this version, sorted by name.
    fn scene_files(&self) -> Result<Vec<PathBuf>, CacheError> {
        if !self.root.exists() {
            return Ok(Vec::new());
        }
        let dir = std::fs::read_dir(&self.root).map_err(|e| CacheError::Io {
            path: self.root.clone(),
            source: e,
        })?;
        let mut files = Vec::new();
        for entry in dir {
            let entry = entry.map_err(|e| CacheError::Io {
                path: self.root.clone(),
                source: e,
            })?;
            let path = entry.path();
            let is_scene_cache = path.extension().and_then(|e| e.to_str()) == Some(CACHE_FILE_EXT)
                && path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.starts_with(SCENE_FILE_PREFIX));
            if is_scene_cache {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }

    fn load_file(
        &self,
        path: &Path,
        sink: &DiagnosticSink,
    ) -> Result<Vec<CacheEntry>, CacheError> {
        let raw = match std::fs::read(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(CacheError::Io {
                    path: path.to_path_buf(),
                    source: e,
                })
            }
        };
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let mut entries = Vec::new();
        for (index, bytes) in raw.split(|&b| b == b'\n').enumerate() {
            let parsed = std::str::from_utf8(bytes)
                .map_err(|e| format!("line is not valid UTF-8 ({e})"))
                .and_then(|line| {
                    let line = line.strip_suffix('\r').unwrap_or(line);
                    if line.trim().is_empty() {
                        Ok(None)
                    } else {
                        parse_line(line).map(Some)
                    }
                });
            match parsed {
                Ok(Some(entry)) => entries.push(entry),
                Ok(None) => {}
                Err(reason) => sink.emit(
                    Diagnostic::warning(DiagnosticCode::MALFORMED_CACHE_LINE, reason)
                        .with_subject(format!("{file_name}:{}", index + 1))
                        .with_note("the record was skipped"),
                ),
            }
        }
        tracing::debug!(path = %path.display(), entries = entries.len(), "loaded cache file");
        Ok(entries)
    }
}

/// Parses one cache line.
pub fn parse_line(line: &str) -> Result<CacheEntry, String> {
    let mut tokens = line.split_whitespace();
    let hash_token = tokens.next().ok_or_else(|| "empty cache line".to_string())?;
    let hash: ContentHash = hash_token.parse().map_err(|e| format!("{e}"))?;
    let rest: Vec<&str> = tokens.collect();
    if rest.len() % 2 != 0 {
        return Err(format!(
            "dangling token '{}' without a paired artifact hash",
            rest[rest.len() - 1]
        ));
    }
    let mut bindings = Vec::with_capacity(rest.len() / 2);
    for pair in rest.chunks_exact(2) {
        let identity: Identity = pair[0].parse().map_err(|e| format!("{e}"))?;
        let artifact: ArtifactHash = pair[1].parse().map_err(|e| format!("{e}"))?;
        bindings.push(Binding { identity, artifact });
    }
    Ok(CacheEntry { hash, bindings })
}

/// Formats one entry as a cache line (without the newline).
pub fn format_line(entry: &CacheEntry) -> String {
    let mut line = entry.hash.to_string();
    for binding in &entry.bindings {
        line.push(' ');
        line.push_str(&binding.identity.to_string());
        line.push(' ');
        line.push_str(&binding.artifact.to_string());
    }
    line
}
