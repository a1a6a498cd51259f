use crate::assets::{Asset, AssetCatalog};
use crate::config::ScaleRange;

/// The one asset + scale both renderers must converge to.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelSelection {
    pub asset_id: String,
    pub scale: f32,
}

/// A committed selection and the version number it was committed under.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectionChange {
    pub selection: ModelSelection,
    pub version: u64,
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum SelectionError {
    #[error("scale {0} is not a positive finite number")]
    InvalidScale(f32),
}

/// Single source of truth for the selected asset and its scale.
pub struct ModelStateStore {
    catalog: AssetCatalog,
    range: ScaleRange,
    current: ModelSelection,
    version: u64,
}

impl ModelStateStore {
    /// Starts on the catalog's default asset at its authored scale.
    pub fn new(catalog: AssetCatalog, range: ScaleRange) -> Self {
        let initial = catalog.metadata(catalog.default_asset_id());
        let current = ModelSelection {
            scale: initial.default_scale,
            asset_id: initial.id,
        };
        Self {
            catalog,
            range,
            current,
            version: 0,
        }
    }

    pub fn catalog(&self) -> &AssetCatalog {
        &self.catalog
    }

    pub fn scale_range(&self) -> ScaleRange {
        self.range
    }

    pub fn current(&self) -> &ModelSelection {
        &self.current
    }

    pub fn current_asset(&self) -> Asset {
        self.catalog.metadata(&self.current.asset_id)
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn change(&self) -> SelectionChange {
        SelectionChange {
            selection: self.current.clone(),
            version: self.version,
        }
    }

    /// Selects `asset_id` at its authored scale. Always commits a new
    /// version, even when the asset is already selected, so an explicit
    /// re-selection re-issues both loads.
    pub fn select(&mut self, asset_id: &str) -> SelectionChange {
        if !self.catalog.contains(asset_id) {
            log::warn!("Selecting {} which is not in the catalog", asset_id);
        }
        let asset = self.catalog.metadata(asset_id);
        self.commit(ModelSelection {
            asset_id: asset.id,
            scale: asset.default_scale,
        })
    }

    /// Changes the scale of the current asset, clamped to the configured range.
    pub fn set_scale(&mut self, scale: f32) -> Result<Option<SelectionChange>, SelectionError> {
        if !scale.is_finite() || scale <= 0.0 {
            return Err(SelectionError::InvalidScale(scale));
        }
        let clamped = self.range.clamp(scale);
        if clamped != scale {
            log::debug!("Scale {} clamped to {}", scale, clamped);
        }
        if clamped == self.current.scale {
            return Ok(None);
        }
        Ok(Some(self.commit(ModelSelection {
            asset_id: self.current.asset_id.clone(),
            scale: clamped,
        })))
    }

    fn commit(&mut self, next: ModelSelection) -> SelectionChange {
        self.current = next;
        self.version += 1;
        log::info!(
            "Selection v{}: {} at {:.2}x",
            self.version,
            self.current.asset_id,
            self.current.scale
        );
        self.change()
    }
}
