pub mod cache;
pub mod source;

pub use cache::MeshCache;
pub use source::{AssetSource, DirectoryAssetSource, LoadError, LoadEvent, LoadTicket};

use crate::config::CatalogConfig;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Scale used for assets without authored metadata.
pub const DEFAULT_SCALE: f32 = 1.0;

/// A placeable catalog entry. `id` is the stable filename/URL of the asset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Asset {
    pub id: String,
    pub label: String,
    pub default_scale: f32,
    pub camera_orbit: Option<String>,
}

/// Product card shown next to the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductInfo {
    pub name: String,
    pub description: String,
    pub price: String,
    pub size: String,
}

/// Authored catalog entry as written in the config file; everything but the
/// id is optional.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetConfig {
    pub id: String,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub scale: Option<f32>,
    #[serde(default)]
    pub camera_orbit: Option<String>,
    #[serde(default)]
    pub product: Option<ProductInfo>,
}

impl AssetConfig {
    pub fn bare(id: &str) -> Self {
        Self {
            id: id.to_string(),
            label: None,
            scale: None,
            camera_orbit: None,
            product: None,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("asset catalog is empty")]
    Empty,
    #[error("duplicate asset id in catalog: {id}")]
    DuplicateId { id: String },
    #[error("asset {id} has invalid default scale {scale}")]
    InvalidScale { id: String, scale: f32 },
}

/// Static registry of placeable assets, in authored order.
#[derive(Debug, Clone)]
pub struct AssetCatalog {
    order: Vec<String>,
    authored: HashMap<String, AssetConfig>,
    default_asset: Option<String>,
}

impl AssetCatalog {
    pub fn from_config(config: &CatalogConfig) -> Result<Self, CatalogError> {
        Self::new(config.assets.clone(), config.default_asset.clone())
    }

    pub fn new(
        assets: Vec<AssetConfig>,
        default_asset: Option<String>,
    ) -> Result<Self, CatalogError> {
        if assets.is_empty() {
            return Err(CatalogError::Empty);
        }
        let mut order = Vec::with_capacity(assets.len());
        let mut authored = HashMap::with_capacity(assets.len());
        for asset in assets {
            if let Some(scale) = asset.scale {
                if !(scale.is_finite() && scale > 0.0) {
                    return Err(CatalogError::InvalidScale { id: asset.id, scale });
                }
            }
            if authored.contains_key(&asset.id) {
                return Err(CatalogError::DuplicateId { id: asset.id });
            }
            order.push(asset.id.clone());
            authored.insert(asset.id.clone(), asset);
        }
        Ok(Self {
            order,
            authored,
            default_asset,
        })
    }

    /// Catalog entries in insertion order. Each call starts a fresh iteration.
    pub fn list(&self) -> impl Iterator<Item = Asset> + '_ {
        self.order.iter().map(|id| self.metadata(id))
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.authored.contains_key(id)
    }

    /// Authored metadata for `id`, or an entry synthesized from the id itself.
    /// Never fails.
    pub fn metadata(&self, id: &str) -> Asset {
        let Some(config) = self.authored.get(id) else {
            return synthesize(id);
        };
        Asset {
            id: config.id.clone(),
            label: config
                .label
                .clone()
                .unwrap_or_else(|| friendly_name(&config.id)),
            default_scale: config.scale.unwrap_or(DEFAULT_SCALE),
            camera_orbit: config.camera_orbit.clone(),
        }
    }

    pub fn product_info(&self, id: &str) -> ProductInfo {
        if let Some(product) = self.authored.get(id).and_then(|c| c.product.clone()) {
            return product;
        }
        ProductInfo {
            name: self.metadata(id).label,
            description: "High-quality 3D model.".to_string(),
            price: "Contact for price".to_string(),
            size: "N/A".to_string(),
        }
    }

    /// The configured default when it is listed, otherwise the first entry.
    pub fn default_asset_id(&self) -> &str {
        self.default_asset
            .as_deref()
            .filter(|id| self.contains(id))
            .unwrap_or(&self.order[0])
    }
}

fn synthesize(id: &str) -> Asset {
    Asset {
        id: id.to_string(),
        label: friendly_name(id),
        default_scale: DEFAULT_SCALE,
        camera_orbit: None,
    }
}

/// Human-readable label for an asset filename: extension stripped, runs of
/// `_`/`-` turned into a single space, each word capitalized.
pub fn friendly_name(id: &str) -> String {
    let stem = match id.rfind('.') {
        Some(dot) if dot > 0 => &id[..dot],
        _ => id,
    };
    let mut spaced = String::with_capacity(stem.len());
    let mut in_separator = false;
    for ch in stem.chars() {
        if ch == '_' || ch == '-' {
            if !in_separator {
                spaced.push(' ');
            }
            in_separator = true;
        } else {
            spaced.push(ch);
            in_separator = false;
        }
    }
    spaced
        .split(' ')
        .map(capitalize)
        .collect::<Vec<_>>()
        .join(" ")
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> AssetCatalog {
        AssetCatalog::from_config(&CatalogConfig::default()).unwrap()
    }

    #[test]
    fn friendly_name_strips_extension_and_title_cases() {
        assert_eq!(friendly_name("office_chair.glb"), "Office Chair");
        assert_eq!(
            friendly_name("gertie_2_seater_sofa_dufrene_moss_velvet.glb"),
            "Gertie 2 Seater Sofa Dufrene Moss Velvet"
        );
        assert_eq!(friendly_name("bedside_table__wardrobe.glb"), "Bedside Table Wardrobe");
        assert_eq!(friendly_name("mid-century-lamp.GLB"), "Mid Century Lamp");
        assert_eq!(friendly_name("couch (2).glb"), "Couch (2)");
        assert_eq!(friendly_name("noext"), "Noext");
    }

    #[test]
    fn list_preserves_insertion_order_and_is_restartable() {
        let catalog = catalog();
        let first: Vec<String> = catalog.list().map(|a| a.id).collect();
        let second: Vec<String> = catalog.list().map(|a| a.id).collect();
        assert_eq!(first, second);
        assert_eq!(first[0], "office_chair.glb");
        assert_eq!(first[7], "bedside_table__wardrobe.glb");
    }

    #[test]
    fn authored_metadata_wins() {
        let asset = catalog().metadata("3d_sofa_rendering.glb");
        assert_eq!(asset.label, "Modern Sofa");
        assert_eq!(asset.default_scale, 0.9);
    }

    #[test]
    fn listed_asset_without_metadata_is_synthesized() {
        let asset = catalog().metadata("couch.glb");
        assert_eq!(asset.label, "Couch");
        assert_eq!(asset.default_scale, DEFAULT_SCALE);
    }

    #[test]
    fn unknown_id_resolves_deterministically() {
        let catalog = catalog();
        let a = catalog.metadata("garden_bench.glb");
        let b = catalog.metadata("garden_bench.glb");
        assert_eq!(a, b);
        assert_eq!(a.label, "Garden Bench");
        assert!(!catalog.contains("garden_bench.glb"));
    }

    #[test]
    fn product_info_falls_back_to_defaults() {
        let mut assets = vec![AssetConfig::bare("stool.glb")];
        assets.push(AssetConfig {
            product: Some(ProductInfo {
                name: "Premium Office Chair".to_string(),
                description: "Ergonomic.".to_string(),
                price: "R20,000".to_string(),
                size: "40cm".to_string(),
            }),
            ..AssetConfig::bare("office_chair.glb")
        });
        let catalog = AssetCatalog::new(assets, None).unwrap();
        assert_eq!(catalog.product_info("office_chair.glb").price, "R20,000");
        let fallback = catalog.product_info("stool.glb");
        assert_eq!(fallback.name, "Stool");
        assert_eq!(fallback.price, "Contact for price");
        assert_eq!(fallback.size, "N/A");
    }

    #[test]
    fn construction_rejects_bad_entries() {
        assert!(matches!(AssetCatalog::new(Vec::new(), None), Err(CatalogError::Empty)));
        let dup = vec![AssetConfig::bare("a.glb"), AssetConfig::bare("a.glb")];
        assert!(matches!(
            AssetCatalog::new(dup, None),
            Err(CatalogError::DuplicateId { .. })
        ));
        let zero = vec![AssetConfig {
            scale: Some(0.0),
            ..AssetConfig::bare("a.glb")
        }];
        assert!(matches!(
            AssetCatalog::new(zero, None),
            Err(CatalogError::InvalidScale { .. })
        ));
    }

    #[test]
    fn default_asset_falls_back_to_first_entry() {
        let assets = vec![AssetConfig::bare("a.glb"), AssetConfig::bare("b.glb")];
        let catalog = AssetCatalog::new(assets.clone(), Some("b.glb".to_string())).unwrap();
        assert_eq!(catalog.default_asset_id(), "b.glb");
        let catalog = AssetCatalog::new(assets, Some("missing.glb".to_string())).unwrap();
        assert_eq!(catalog.default_asset_id(), "a.glb");
    }
}
