//! The geometry export capability.
//!
//! Producing geometry files is the host toolkit's job. The export core only
//! calls [`GeometryExporter::export_geometry`] with a stripped duplicate, the
//! fixed [`ExporterOptions`] and a destination path, and keeps the returned
//! [`ArtifactHandle`].

use std::path::{Path, PathBuf};

use prism_common::ArtifactHash;
use prism_config::ExporterOptions;
use prism_graph::Scene;

/// An emitted geometry artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactHandle {
    /// Where the artifact was written.
    pub path: PathBuf,
    /// Hash of the written bytes.
    pub hash: ArtifactHash,
}

/// Errors reported by a geometry exporter.
#[derive(Debug, thiserror::Error)]
pub enum GeometryError {
    /// Writing the output file failed.
    #[error("geometry I/O error at {path}: {source}")]
    Io {
        /// The output path.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The exporter rejected the input.
    #[error("geometry export failed: {0}")]
    Rejected(String),
}

/// Converts a stripped subtree into a geometry file.
pub trait GeometryExporter {
    /// Writes geometry for `visual` to `destination`.
    fn export_geometry(
        &mut self,
        visual: &Scene,
        options: &ExporterOptions,
        destination: &Path,
    ) -> Result<ArtifactHandle, GeometryError>;
}

/// Writes the stripped subtree as JSON.
///
/// Useful for hosts without a geometry toolkit and for inspecting what a
/// real exporter would receive. Textures and detail levels are not modeled,
/// so only `binary` changes the output (compact instead of pretty JSON).
#[derive(Debug, Default)]
pub struct JsonGeometryExporter;

impl GeometryExporter for JsonGeometryExporter {
    fn export_geometry(
        &mut self,
        visual: &Scene,
        options: &ExporterOptions,
        destination: &Path,
    ) -> Result<ArtifactHandle, GeometryError> {
        let bytes = if options.binary {
            serde_json::to_vec(visual)
        } else {
            serde_json::to_vec_pretty(visual)
        }
        .map_err(|e| GeometryError::Rejected(e.to_string()))?;
        std::fs::write(destination, &bytes).map_err(|e| GeometryError::Io {
            path: destination.to_path_buf(),
            source: e,
        })?;
        Ok(ArtifactHandle {
            path: destination.to_path_buf(),
            hash: ArtifactHash::from_bytes(&bytes),
        })
    }
}
