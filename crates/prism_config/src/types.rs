//! Configuration types deserialized from `prism.toml`.

use serde::Deserialize;
use std::path::PathBuf;

/// The top-level export configuration parsed from `prism.toml`.
#[derive(Debug, Clone, Deserialize)]
pub struct ExportConfig {
    /// Where caches and artifacts live.
    pub cache: CacheConfig,
    /// Component type tags with special meaning to the walker and allocator.
    #[serde(default)]
    pub markers: MarkerConfig,
    /// What the component stripper keeps.
    #[serde(default)]
    pub strip: StripConfig,
    /// Fixed options handed to the geometry exporter.
    #[serde(default)]
    pub exporter: ExporterOptions,
}

/// Cache location and persistence policy.
#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    /// Root cache directory, relative to the project.
    #[serde(default = "default_cache_dir")]
    pub dir: PathBuf,
    /// Namespace (usually the application version); one cache set per value.
    pub version: String,
    /// Rewrite the cache after every exported candidate instead of only at pass end.
    #[serde(default = "default_true")]
    pub checkpoint: bool,
}

/// Component type tags the export core treats as markers.
#[derive(Debug, Clone, Deserialize)]
pub struct MarkerConfig {
    /// The identity-marker component type. Required before any pass can run.
    #[serde(default)]
    pub identity: String,
    /// Component types that disqualify a node (and its descendants) from coverage.
    #[serde(default = "default_excluded")]
    pub excluded: Vec<String>,
    /// Component types that make a node renderable.
    #[serde(default = "default_renderable")]
    pub renderable: Vec<String>,
    /// Component types that select a reserved identity.
    #[serde(default)]
    pub reserved: ReservedMarkers,
}

/// Component type tags bound to the reserved identity categories.
#[derive(Debug, Clone, Deserialize)]
pub struct ReservedMarkers {
    /// Marks the primary viewpoint (identity 1).
    #[serde(default = "default_primary_viewpoint")]
    pub primary_viewpoint: String,
    /// Marks the left manipulator (identity 2).
    #[serde(default = "default_left_manipulator")]
    pub left_manipulator: String,
    /// Marks the right manipulator (identity 3).
    #[serde(default = "default_right_manipulator")]
    pub right_manipulator: String,
}

/// Component stripper settings.
#[derive(Debug, Clone, Deserialize)]
pub struct StripConfig {
    /// Component types considered visual; never removed.
    #[serde(default = "default_visual")]
    pub visual: Vec<String>,
    /// Type tags starting with any of these prefixes are left untouched.
    #[serde(default)]
    pub tolerated_prefixes: Vec<String>,
    /// Upper bound on fixed-point iterations before a cycle is reported.
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,
    /// Remove inactive descendants from the duplicate before stripping.
    #[serde(default = "default_true")]
    pub drop_inactive: bool,
}

/// Pivot placement for exported geometry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Pivot {
    /// Geometry is centered on the root's local origin.
    #[default]
    LocalCentered,
    /// Geometry keeps world-space placement.
    World,
}

/// Options passed unchanged to every geometry export.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ExporterOptions {
    /// Binary rather than text encoding.
    #[serde(default = "default_true")]
    pub binary: bool,
    /// Embed textures into the exported file.
    #[serde(default = "default_true")]
    pub embed_textures: bool,
    /// Include every level of detail, not just the first.
    #[serde(default = "default_true")]
    pub all_lods: bool,
    /// Pivot placement.
    #[serde(default)]
    pub pivot: Pivot,
    /// File extension of geometry artifacts.
    #[serde(default = "default_geometry_ext")]
    pub extension: String,
}

impl Default for MarkerConfig {
    fn default() -> Self {
        Self {
            identity: String::new(),
            excluded: default_excluded(),
            renderable: default_renderable(),
            reserved: ReservedMarkers::default(),
        }
    }
}

impl Default for ReservedMarkers {
    fn default() -> Self {
        Self {
            primary_viewpoint: default_primary_viewpoint(),
            left_manipulator: default_left_manipulator(),
            right_manipulator: default_right_manipulator(),
        }
    }
}

impl Default for StripConfig {
    fn default() -> Self {
        Self {
            visual: default_visual(),
            tolerated_prefixes: Vec::new(),
            max_iterations: default_max_iterations(),
            drop_inactive: true,
        }
    }
}

impl Default for ExporterOptions {
    fn default() -> Self {
        Self {
            binary: true,
            embed_textures: true,
            all_lods: true,
            pivot: Pivot::LocalCentered,
            extension: default_geometry_ext(),
        }
    }
}

fn default_cache_dir() -> PathBuf {
    PathBuf::from(".prism-cache")
}

fn default_true() -> bool {
    true
}

fn default_excluded() -> Vec<String> {
    vec!["TrackingManager".to_string()]
}

fn default_renderable() -> Vec<String> {
    vec!["MeshRenderer".to_string(), "SkinnedMeshRenderer".to_string()]
}

fn default_primary_viewpoint() -> String {
    "CenterEyeAnchor".to_string()
}

fn default_left_manipulator() -> String {
    "LeftHandAnchor".to_string()
}

fn default_right_manipulator() -> String {
    "RightHandAnchor".to_string()
}

fn default_max_iterations() -> u32 {
    1000
}

fn default_geometry_ext() -> String {
    "fbx".to_string()
}

fn default_visual() -> Vec<String> {
    [
        "Transform",
        "RectTransform",
        "Camera",
        "MeshRenderer",
        "SkinnedMeshRenderer",
        "MeshFilter",
        "TextMesh",
        "TextMeshPro",
        "TextMeshProUGUI",
        "ParticleSystem",
        "ParticleSystemRenderer",
        "Terrain",
        "Canvas",
        "CanvasRenderer",
        "CanvasGroup",
        "CanvasScaler",
        "AspectRatioFitter",
        "ContentSizeFitter",
        "GridLayoutGroup",
        "HorizontalLayoutGroup",
        "VerticalLayoutGroup",
        "LayoutElement",
        "Dropdown",
        "TMP_Dropdown",
        "Image",
        "RawImage",
        "InputField",
        "TMP_InputField",
        "Mask",
        "RectMask2D",
        "ScrollRect",
        "Scrollbar",
        "Slider",
        "Outline",
        "PositionAsUV1",
        "Shadow",
        "Text",
        "Toggle",
        "ToggleGroup",
        "Animator",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}
