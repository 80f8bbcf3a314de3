//! Catalog processing plan.
//!
//! A plan is supplied once per run and stays read-only while a catalog is
//! assembled. Plans can be written as TOML files and overridden from the
//! command line.

use crate::error::{CatalogError, CatalogResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// Settings for a single catalog run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogPlan {
    /// Amount added to every detected price (may be negative)
    pub price_markup: f64,
    /// Brand image stamped on product pictures and used on the cover
    pub logo_image: Option<PathBuf>,
    /// Zero-based source page indices left out of the output
    pub pages_to_exclude: BTreeSet<usize>,
    /// Prepend a cover page (only when a logo is configured)
    pub add_cover_page: bool,
    /// Prepend an intro page with title and generation date
    pub add_intro_page: bool,
    /// Title printed on the intro page
    pub catalog_title: String,
}

impl Default for CatalogPlan {
    fn default() -> Self {
        Self {
            price_markup: 0.0,
            logo_image: None,
            pages_to_exclude: BTreeSet::new(),
            add_cover_page: false,
            add_intro_page: false,
            catalog_title: "Catalog".to_string(),
        }
    }
}

impl CatalogPlan {
    /// Creates a plan that only applies a markup.
    pub fn with_markup(price_markup: f64) -> Self {
        Self {
            price_markup,
            ..Default::default()
        }
    }

    /// Loads a plan from a TOML file.
    pub fn load(path: &Path) -> CatalogResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| CatalogError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        let plan: CatalogPlan = toml::from_str(&content)?;
        Ok(plan)
    }

    /// Serializes the plan as pretty TOML.
    pub fn to_toml(&self) -> CatalogResult<String> {
        toml::to_string_pretty(self).map_err(|e| CatalogError::InvalidInput {
            parameter: "plan".to_string(),
            reason: e.to_string(),
        })
    }

    pub fn is_excluded(&self, page_index: usize) -> bool {
        self.pages_to_exclude.contains(&page_index)
    }

    /// True when a cover is requested and a logo is configured for it.
    pub fn wants_cover(&self) -> bool {
        self.add_cover_page && self.logo_image.is_some()
    }

    /// Rejects plans that cannot produce a meaningful catalog.
    pub fn validate(&self) -> CatalogResult<()> {
        if !self.price_markup.is_finite() {
            return Err(CatalogError::InvalidInput {
                parameter: "price_markup".to_string(),
                reason: "Markup must be a finite number".to_string(),
            });
        }

        if self.add_intro_page && self.catalog_title.trim().is_empty() {
            return Err(CatalogError::InvalidInput {
                parameter: "catalog_title".to_string(),
                reason: "Intro page requested without a catalog title".to_string(),
            });
        }

        Ok(())
    }
}
