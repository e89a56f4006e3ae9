//! Service configuration, persisted as yaml

use serde::{Serialize, Deserialize};
use std::fs::File;
use std::io::prelude::*;

use crate::error::Result;

/// Names of the input columns the loader looks for in the header row
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct ColumnConfig {
    pub entity_id: String,
    pub location: String,
    pub timestamp: String,
    pub amount_sold: String,
    pub quantity: String,
    pub volume: String,
}

impl Default for ColumnConfig {

    fn default() -> Self {

        return Self {
            entity_id: "store_number".to_string(),
            location: "store_location".to_string(),
            timestamp: "date".to_string(),
            amount_sold: "sale_dollars".to_string(),
            quantity: "bottles_sold".to_string(),
            volume: "volume_sold_liters".to_string(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct ServiceConfig {
    pub columns: ColumnConfig,
    /// Maximum number of stores held by one leaf of the kd tree
    pub leaf_size: usize,
    /// Neighbor count used when a caller does not ask for one
    pub default_neighbors: usize,
    pub max_neighbors: usize,
}

impl Default for ServiceConfig {

    fn default() -> Self {

        return Self {
            columns: ColumnConfig::default(),
            leaf_size: 40,
            default_neighbors: 1,
            max_neighbors: 6,
        }
    }
}

impl ServiceConfig {

    pub fn from_file(filename: &str) -> Result<Self> {

        let serialized = std::fs::read_to_string(filename)?;

        let deserialized: Self = serde_yaml::from_str(&serialized)?;

        return Ok(deserialized);
    }

    pub fn to_file(&self, filename: &str) -> Result<()> {

        let serialized = serde_yaml::to_string(&self)?;
        let mut file = File::create(filename)?;

        file.write_all(serialized.as_bytes())?;

        Ok(())
    }

    /// Leaf size actually used by the tree, never below one
    pub fn effective_leaf_size(&self) -> usize {
        self.leaf_size.max(1)
    }
}
