//! Catalog of stores and their coordinates, extracted from the raw sales rows.

use std::collections::{HashMap, HashSet};

use log::{info, warn};
use serde::Serialize;

use crate::data::{Coordinates, Entity, EntityId, RawRecord};
use crate::error::{Error, Result};

/// Map marker for one store
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Marker {
    pub id: String,
    pub lat: f64,
    pub lon: f64,
}

#[derive(Debug, Default)]
pub struct EntityCatalog {
    entities: Vec<Entity>,
    positions: HashMap<EntityId, usize>,
}

impl EntityCatalog {

    /// Builds the catalog from raw rows.
    ///
    /// Each store takes the coordinates of its first row with a non-null location. Rows without a
    /// location are ignored. A store whose location can't be parsed is left out and counted in the
    /// returned total; the build carries on.
    pub fn build(records: &[RawRecord]) -> (Self, usize) {

        let mut catalog = Self::default();
        let mut seen: HashSet<&EntityId> = HashSet::new();
        let mut excluded: usize = 0;

        for record in records {

            let location = match record.location() {
                None => continue,
                Some(x) => x,
            };

            if !seen.insert(&record.entity_id) {
                continue;
            }

            match Coordinates::parse_location(&record.entity_id, location) {
                Ok(coordinates) => {
                    catalog.push(Entity { id: record.entity_id.clone(), coordinates });
                },
                Err(e) => {
                    warn!("excluding store: {}", e);
                    excluded += 1;
                },
            }
        }

        info!("catalog built with {} stores, {} excluded", catalog.len(), excluded);

        return (catalog, excluded);
    }

    fn push(&mut self, entity: Entity) {

        self.positions.insert(entity.id.clone(), self.entities.len());
        self.entities.push(entity);
    }

    pub fn get(&self, id: &EntityId) -> Result<&Entity> {

        match self.positions.get(id) {
            Some(position) => Ok(&self.entities[*position]),
            None => Err(Error::NotFound(id.to_string())),
        }
    }

    /// Position of a store in first-seen order
    pub fn position(&self, id: &EntityId) -> Result<usize> {

        self.positions.get(id).copied().ok_or_else(|| Error::NotFound(id.to_string()))
    }

    pub fn contains(&self, id: &EntityId) -> bool {
        self.positions.contains_key(id)
    }

    /// All stores in first-seen order
    pub fn all(&self) -> &[Entity] {
        &self.entities
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Default map center, the first store seen
    pub fn center(&self) -> Option<Coordinates> {
        self.entities.first().map(|x| x.coordinates)
    }

    pub fn markers(&self) -> Vec<Marker> {

        self.entities
            .iter()
            .map(|e| Marker { id: e.id.to_string(), lat: e.coordinates.lat, lon: e.coordinates.lon })
            .collect()
    }

    /// Markers as a geojson FeatureCollection of points, each with `id` and `tooltip` properties
    pub fn to_geojson(&self) -> serde_json::Value {

        let features: Vec<serde_json::Value> = self.markers()
            .into_iter()
            .map(|m| serde_json::json!({
                "type": "Feature",
                "geometry": {
                    "type": "Point",
                    "coordinates": [m.lon, m.lat],
                },
                "properties": {
                    "id": m.id,
                    "tooltip": m.id,
                },
            }))
            .collect();

        serde_json::json!({
            "type": "FeatureCollection",
            "features": features,
        })
    }
}
