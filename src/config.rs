use crate::assets::{AssetConfig, DEFAULT_SCALE};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config at {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid scale range {min}..{max}")]
    ScaleRange { min: f32, max: f32 },
    #[error("asset {id} default scale {scale} is outside the scale range {min}..{max}")]
    AssetScale {
        id: String,
        scale: f32,
        min: f32,
        max: f32,
    },
    #[error("fallback scale {scale} for unlisted assets is outside the scale range {min}..{max}")]
    FallbackScale { scale: f32, min: f32, max: f32 },
    #[error("gallery capacity must be at least 1")]
    GalleryCapacity,
    #[error("placement offset must be finite")]
    PlacementOffset,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    pub asset_root: PathBuf,
    pub catalog: CatalogConfig,
    pub scale: ScaleRange,
    pub preview: PreviewConfig,
    pub ar: ArConfig,
    pub gallery: GalleryConfig,
    pub capture: BadgeConfig,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            asset_root: PathBuf::from("assets"),
            catalog: CatalogConfig::default(),
            scale: ScaleRange::default(),
            preview: PreviewConfig::default(),
            ar: ArConfig::default(),
            gallery: GalleryConfig::default(),
            capture: BadgeConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    pub default_asset: Option<String>,
    pub assets: Vec<AssetConfig>,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        let authored = |id: &str, label: &str, scale: f32| AssetConfig {
            id: id.to_string(),
            label: Some(label.to_string()),
            scale: Some(scale),
            camera_orbit: None,
            product: None,
        };
        Self {
            default_asset: Some("office_chair.glb".to_string()),
            assets: vec![
                authored("office_chair.glb", "Premium Office Chair", 1.0),
                authored("3d_sofa_rendering.glb", "Modern Sofa", 0.9),
                authored("kitchen_table.glb", "Kitchen Table", 1.2),
                authored(
                    "gertie_2_seater_sofa_dufrene_moss_velvet.glb",
                    "Gertie 2-Seater Sofa",
                    0.85,
                ),
                authored("ergonomic_mesh_office_chair.glb", "Ergonomic Mesh Chair", 1.0),
                authored("dining_tablegame_ready.glb", "Dining Table", 1.1),
                AssetConfig::bare("couch.glb"),
                authored("bedside_table__wardrobe.glb", "Bedside / Wardrobe", 1.0),
            ],
        }
    }
}

/// Bounds of the scale slider.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScaleRange {
    pub min: f32,
    pub max: f32,
}

impl Default for ScaleRange {
    fn default() -> Self {
        Self { min: 0.1, max: 3.0 }
    }
}

impl ScaleRange {
    pub fn clamp(&self, value: f32) -> f32 {
        value.clamp(self.min, self.max)
    }

    pub fn contains(&self, value: f32) -> bool {
        (self.min..=self.max).contains(&value)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct PreviewConfig {
    pub lazy_load: bool,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self { lazy_load: true }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ArConfig {
    /// Local offset applied in the controller frame when placing a copy.
    pub placement_offset: [f32; 3],
    pub max_placed_instances: Option<usize>,
    pub required_features: Vec<String>,
}

impl Default for ArConfig {
    fn default() -> Self {
        Self {
            placement_offset: [0.0, 0.0, -1.0],
            max_placed_instances: None,
            required_features: vec!["hit-test".to_string()],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GalleryConfig {
    pub capacity: usize,
    pub storage_path: PathBuf,
    pub quota_bytes: Option<usize>,
}

impl Default for GalleryConfig {
    fn default() -> Self {
        Self {
            capacity: 20,
            storage_path: PathBuf::from("ar-screenshots.json"),
            quota_bytes: None,
        }
    }
}

/// Watermark badge drawn into the bottom-right corner of screenshots.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BadgeConfig {
    pub width: u32,
    pub height: u32,
    pub margin_right: u32,
    pub margin_bottom: u32,
    pub fill_rgba: [u8; 4],
    pub accent_rgba: [u8; 4],
}

impl Default for BadgeConfig {
    fn default() -> Self {
        Self {
            width: 230,
            height: 50,
            margin_right: 10,
            margin_bottom: 20,
            fill_rgba: [255, 255, 255, 242],
            accent_rgba: [0x02, 0x84, 0xc7, 255],
        }
    }
}

impl ViewerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let ScaleRange { min, max } = self.scale;
        if !(min.is_finite() && max.is_finite() && min > 0.0 && min <= max) {
            return Err(ConfigError::ScaleRange { min, max });
        }
        // authored scales are applied as-is on selection, never clamped
        for asset in &self.catalog.assets {
            let scale = asset.scale.unwrap_or(DEFAULT_SCALE);
            if !self.scale.contains(scale) {
                return Err(ConfigError::AssetScale {
                    id: asset.id.clone(),
                    scale,
                    min,
                    max,
                });
            }
        }
        if !self.scale.contains(DEFAULT_SCALE) {
            return Err(ConfigError::FallbackScale {
                scale: DEFAULT_SCALE,
                min,
                max,
            });
        }
        if self.gallery.capacity == 0 {
            return Err(ConfigError::GalleryCapacity);
        }
        if !self.ar.placement_offset.iter().all(|v| v.is_finite()) {
            return Err(ConfigError::PlacementOffset);
        }
        Ok(())
    }
}

pub fn load_config_from_file(path: &Path) -> Result<ViewerConfig, ConfigError> {
    let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.display().to_string(),
        source,
    })?;
    let config: ViewerConfig = serde_json::from_str(&json)?;
    config.validate()?;
    Ok(config)
}
