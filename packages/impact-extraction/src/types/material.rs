//! Geological material catalog and description classifier.
//!
//! Survey descriptions are free text ("Coarse-grained biotite granite",
//! "Unconsolidated glacial till"). Classification walks the catalog in order
//! and the first keyword found in the description wins; broad category words
//! are only consulted when no specific rock type matched.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Standardized surface material.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaterialClass {
    // Igneous
    Granite,
    Basalt,
    Gabbro,
    Diorite,
    Rhyolite,
    Andesite,
    Obsidian,
    Pumice,
    // Sedimentary
    Sandstone,
    Limestone,
    Shale,
    Conglomerate,
    Breccia,
    Siltstone,
    Mudstone,
    Coal,
    // Metamorphic
    Gneiss,
    Schist,
    Slate,
    Marble,
    Quartzite,
    Phyllite,
    // Unconsolidated
    Sand,
    Clay,
    Silt,
    Gravel,
    Soil,
    Loam,
    // Other
    Water,
    Ice,
    Mixed,
    /// No catalog entry or category matched
    Unclassified,
}

/// Catalog in match order. Order matters: "sandstone" must be tested before
/// "sand", "siltstone" before "silt".
pub const MATERIAL_CATALOG: [MaterialClass; 31] = [
    MaterialClass::Granite,
    MaterialClass::Basalt,
    MaterialClass::Gabbro,
    MaterialClass::Diorite,
    MaterialClass::Rhyolite,
    MaterialClass::Andesite,
    MaterialClass::Obsidian,
    MaterialClass::Pumice,
    MaterialClass::Sandstone,
    MaterialClass::Limestone,
    MaterialClass::Shale,
    MaterialClass::Conglomerate,
    MaterialClass::Breccia,
    MaterialClass::Siltstone,
    MaterialClass::Mudstone,
    MaterialClass::Coal,
    MaterialClass::Gneiss,
    MaterialClass::Schist,
    MaterialClass::Slate,
    MaterialClass::Marble,
    MaterialClass::Quartzite,
    MaterialClass::Phyllite,
    MaterialClass::Sand,
    MaterialClass::Clay,
    MaterialClass::Silt,
    MaterialClass::Gravel,
    MaterialClass::Soil,
    MaterialClass::Loam,
    MaterialClass::Water,
    MaterialClass::Ice,
    MaterialClass::Mixed,
];

/// Category fallbacks, consulted in order after the catalog.
const CATEGORY_FALLBACKS: [(&[&str], MaterialClass); 4] = [
    (&["igneous", "volcanic", "plutonic"], MaterialClass::Granite),
    (&["sedimentary"], MaterialClass::Sandstone),
    (&["metamorphic"], MaterialClass::Gneiss),
    (&["unconsolidated"], MaterialClass::Sand),
];

impl MaterialClass {
    /// Keyword searched for in descriptions.
    pub fn keyword(&self) -> &'static str {
        match self {
            MaterialClass::Granite => "granite",
            MaterialClass::Basalt => "basalt",
            MaterialClass::Gabbro => "gabbro",
            MaterialClass::Diorite => "diorite",
            MaterialClass::Rhyolite => "rhyolite",
            MaterialClass::Andesite => "andesite",
            MaterialClass::Obsidian => "obsidian",
            MaterialClass::Pumice => "pumice",
            MaterialClass::Sandstone => "sandstone",
            MaterialClass::Limestone => "limestone",
            MaterialClass::Shale => "shale",
            MaterialClass::Conglomerate => "conglomerate",
            MaterialClass::Breccia => "breccia",
            MaterialClass::Siltstone => "siltstone",
            MaterialClass::Mudstone => "mudstone",
            MaterialClass::Coal => "coal",
            MaterialClass::Gneiss => "gneiss",
            MaterialClass::Schist => "schist",
            MaterialClass::Slate => "slate",
            MaterialClass::Marble => "marble",
            MaterialClass::Quartzite => "quartzite",
            MaterialClass::Phyllite => "phyllite",
            MaterialClass::Sand => "sand",
            MaterialClass::Clay => "clay",
            MaterialClass::Silt => "silt",
            MaterialClass::Gravel => "gravel",
            MaterialClass::Soil => "soil",
            MaterialClass::Loam => "loam",
            MaterialClass::Water => "water",
            MaterialClass::Ice => "ice",
            MaterialClass::Mixed => "mixed",
            MaterialClass::Unclassified => "unclassified",
        }
    }

    /// Bulk density in kg/m³.
    pub fn density_kg_m3(&self) -> f64 {
        match self {
            MaterialClass::Granite => 2750.0,
            MaterialClass::Basalt => 2850.0,
            MaterialClass::Gabbro => 2950.0,
            MaterialClass::Diorite => 2800.0,
            MaterialClass::Rhyolite => 2700.0,
            MaterialClass::Andesite => 2750.0,
            MaterialClass::Obsidian => 2600.0,
            MaterialClass::Pumice => 1000.0,
            MaterialClass::Sandstone => 2400.0,
            MaterialClass::Limestone => 2700.0,
            MaterialClass::Shale => 2600.0,
            MaterialClass::Conglomerate => 2500.0,
            MaterialClass::Breccia => 2500.0,
            MaterialClass::Siltstone => 2600.0,
            MaterialClass::Mudstone => 2600.0,
            MaterialClass::Coal => 1400.0,
            MaterialClass::Gneiss => 2750.0,
            MaterialClass::Schist => 2700.0,
            MaterialClass::Slate => 2750.0,
            MaterialClass::Marble => 2700.0,
            MaterialClass::Quartzite => 2650.0,
            MaterialClass::Phyllite => 2700.0,
            MaterialClass::Sand => 1600.0,
            MaterialClass::Clay => 1800.0,
            MaterialClass::Silt => 1700.0,
            MaterialClass::Gravel => 1900.0,
            MaterialClass::Soil => 1500.0,
            MaterialClass::Loam => 1400.0,
            MaterialClass::Water => 1000.0,
            MaterialClass::Ice => 920.0,
            MaterialClass::Mixed => 2400.0,
            MaterialClass::Unclassified => 2500.0,
        }
    }

    pub fn is_classified(&self) -> bool {
        !matches!(self, MaterialClass::Unclassified)
    }
}

impl fmt::Display for MaterialClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

/// Classify a free-text geological description.
///
/// First catalog match wins; then category fallbacks; otherwise
/// [`MaterialClass::Unclassified`].
pub fn classify_material(description: &str) -> MaterialClass {
    let description = description.to_lowercase();
    if description.trim().is_empty() {
        return MaterialClass::Unclassified;
    }

    if let Some(material) = MATERIAL_CATALOG
        .iter()
        .find(|m| description.contains(m.keyword()))
    {
        return *material;
    }

    CATEGORY_FALLBACKS
        .iter()
        .find(|(words, _)| words.iter().any(|w| description.contains(w)))
        .map(|(_, material)| *material)
        .unwrap_or(MaterialClass::Unclassified)
}
