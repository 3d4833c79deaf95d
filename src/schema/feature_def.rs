//! Feature definitions and schema types.
//!
//! - `WindowScale`: the three look-back windows
//! - `FeatureCategory`: which block of the vector a feature lives in
//! - `FeatureDef`: metadata for a single feature
//! - `FeatureSchema`: ordered collection of feature definitions

use super::{
    CROSS_RATIO_NAMES, CURRENT_FEATURE_NAMES, SCHEMA_VERSION, WINDOW_STAT_NAMES,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Look-back window scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowScale {
    /// Short window (default 30 minutes)
    Short,
    /// Medium window (default 60 minutes)
    Medium,
    /// Long window (default 240 minutes)
    Long,
}

impl WindowScale {
    /// All scales in vector order.
    pub const ALL: [WindowScale; 3] = [WindowScale::Short, WindowScale::Medium, WindowScale::Long];

    /// Position of the scale's block among the window blocks.
    pub const fn position(self) -> usize {
        match self {
            WindowScale::Short => 0,
            WindowScale::Medium => 1,
            WindowScale::Long => 2,
        }
    }

    /// Prefix used in feature names.
    pub fn name(self) -> &'static str {
        match self {
            WindowScale::Short => "short",
            WindowScale::Medium => "medium",
            WindowScale::Long => "long",
        }
    }
}

/// Block of the feature vector a feature belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FeatureCategory {
    /// Raw readings of the target sample
    Current,

    /// Statistics over one look-back window
    Window(WindowScale),

    /// Statistic at one scale relative to another
    CrossRatio,
}

impl FeatureCategory {
    /// Display name for this category.
    pub fn name(&self) -> &'static str {
        match self {
            FeatureCategory::Current => "Current sample",
            FeatureCategory::Window(WindowScale::Short) => "Short window",
            FeatureCategory::Window(WindowScale::Medium) => "Medium window",
            FeatureCategory::Window(WindowScale::Long) => "Long window",
            FeatureCategory::CrossRatio => "Cross-window ratio",
        }
    }
}

/// Definition of a single feature.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureDef {
    /// Unique feature name (e.g., "short_mean", "ratio_std_medium_long")
    pub name: String,

    /// Index in the feature vector
    pub index: usize,

    /// Feature category
    pub category: FeatureCategory,
}

impl FeatureDef {
    /// Create a new feature definition.
    pub fn new(name: impl Into<String>, index: usize, category: FeatureCategory) -> Self {
        Self {
            name: name.into(),
            index,
            category,
        }
    }
}

/// Ordered, versioned collection of feature definitions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureSchema {
    /// Schema version
    pub version: String,

    /// All feature definitions, in vector order
    features: Vec<FeatureDef>,

    /// Name-to-index lookup
    #[serde(skip)]
    name_index: HashMap<String, usize>,
}

impl FeatureSchema {
    /// The 41-feature window schema.
    pub fn window_features() -> Self {
        let mut schema = Self {
            version: SCHEMA_VERSION.to_string(),
            features: Vec::new(),
            name_index: HashMap::new(),
        };

        for name in CURRENT_FEATURE_NAMES {
            schema.push(name.to_string(), FeatureCategory::Current);
        }
        for scale in WindowScale::ALL {
            for stat in WINDOW_STAT_NAMES {
                schema.push(
                    format!("{}_{}", scale.name(), stat),
                    FeatureCategory::Window(scale),
                );
            }
        }
        for name in CROSS_RATIO_NAMES {
            schema.push(name.to_string(), FeatureCategory::CrossRatio);
        }

        schema
    }

    fn push(&mut self, name: String, category: FeatureCategory) {
        let index = self.features.len();
        self.name_index.insert(name.clone(), index);
        self.features.push(FeatureDef::new(name, index, category));
    }

    /// Total number of features.
    pub fn total_count(&self) -> usize {
        self.features.len()
    }

    /// Get a feature by name.
    pub fn get_feature(&self, name: &str) -> Option<&FeatureDef> {
        self.name_index.get(name).map(|&idx| &self.features[idx])
    }

    /// Get a feature by index.
    pub fn get_feature_by_index(&self, index: usize) -> Option<&FeatureDef> {
        self.features.get(index)
    }

    /// All features in a category.
    pub fn features_by_category(&self, category: FeatureCategory) -> Vec<&FeatureDef> {
        self.features
            .iter()
            .filter(|f| f.category == category)
            .collect()
    }

    /// All feature definitions.
    pub fn all_features(&self) -> &[FeatureDef] {
        &self.features
    }

    /// Rebuild the name lookup (call after deserialization).
    pub fn rebuild_indices(&mut self) {
        self.name_index = self
            .features
            .iter()
            .map(|f| (f.name.clone(), f.index))
            .collect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_sizes() {
        let schema = FeatureSchema::window_features();
        assert_eq!(schema.features_by_category(FeatureCategory::Current).len(), 5);
        for scale in WindowScale::ALL {
            assert_eq!(
                schema
                    .features_by_category(FeatureCategory::Window(scale))
                    .len(),
                10
            );
        }
        assert_eq!(schema.features_by_category(FeatureCategory::CrossRatio).len(), 6);
    }

    #[test]
    fn test_lookup_after_deserialization() {
        let schema = FeatureSchema::window_features();
        let json = serde_json::to_string(&schema).unwrap();
        let mut loaded: FeatureSchema = serde_json::from_str(&json).unwrap();
        assert!(loaded.get_feature("long_iqr").is_none());

        loaded.rebuild_indices();
        assert_eq!(loaded.get_feature("long_iqr").unwrap().index, 34);
    }
}
