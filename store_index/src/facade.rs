//! Query entry point tying the catalog, the partitions and the kd tree together.
//!
//! Everything is built up front by [`QueryFacade::build`]; after that the facade is read-only and
//! can be shared behind an `Arc` by any number of threads.

use log::{debug, info};
use serde::Serialize;

use crate::aggregator::{Partition, RecordAggregator};
use crate::catalog::EntityCatalog;
use crate::config::ServiceConfig;
use crate::data::{Coordinates, EntityId, Period, RawRecord};
use crate::error::Result;
use crate::tree::KdTree;

/// Counts gathered while building, for reporting
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BuildReport {
    pub records: usize,
    pub stores: usize,
    pub excluded_stores: usize,
    pub dropped_records: usize,
    pub tree_depth: usize,
    pub tree_leaves: usize,
}

/// A neighboring store and its records for the requested period
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NeighborRecords {
    pub entity_id: EntityId,
    pub distance: f64,
    pub partition: Partition,
}

#[derive(Debug)]
pub struct QueryFacade {
    catalog: EntityCatalog,
    aggregator: RecordAggregator,
    tree: KdTree,
    config: ServiceConfig,
}

impl QueryFacade {

    pub fn build(records: &[RawRecord], config: ServiceConfig) -> (Self, BuildReport) {

        let (catalog, excluded_stores) = EntityCatalog::build(records);
        let aggregator = RecordAggregator::build(records, &catalog);

        let tree = KdTree::build(
            catalog.all().iter().map(|e| (e.id.clone(), e.coordinates)),
            config.effective_leaf_size(),
        );

        let report = BuildReport {
            records: records.len(),
            stores: catalog.len(),
            excluded_stores,
            dropped_records: aggregator.dropped(),
            tree_depth: tree.depth(),
            tree_leaves: tree.num_leaves(),
        };

        info!("query facade ready: {:?}", report);

        return (Self { catalog, aggregator, tree, config }, report);
    }

    /// All records of one store
    pub fn stats_for(&self, entity_id: &EntityId) -> Result<&Partition> {

        self.aggregator.get(entity_id)
    }

    ///Records for `period` of the `k` stores closest to `entity_id`, nearest first.
    ///
    ///`k` falls back to the configured default (one) when `None`. The store itself is part of the
    ///index and always comes back as its own first neighbor, also when other stores share its
    ///coordinates.
    pub fn neighbors_with_records(&self, entity_id: &EntityId, k: Option<i64>, period: &Period) -> Result<Vec<NeighborRecords>> {

        let entity = self.catalog.get(entity_id)?;

        //the tree was built in catalog order
        let position = self.catalog.position(entity_id)?;

        let k = k.unwrap_or(self.config.default_neighbors as i64);
        let neighbors = self.tree.query_with_preferred(&entity.coordinates, k, position)?;

        debug!("{} neighbors of store {} for {}", neighbors.len(), entity_id, period);

        let mut results: Vec<NeighborRecords> = Vec::with_capacity(neighbors.len());

        for neighbor in neighbors {

            let partition = self.aggregator.get_period(&neighbor.entity_id, period)?;

            results.push(NeighborRecords {
                entity_id: neighbor.entity_id,
                distance: neighbor.distance,
                partition,
            });
        }

        return Ok(results);
    }

    pub fn catalog(&self) -> &EntityCatalog {
        &self.catalog
    }

    pub fn tree(&self) -> &KdTree {
        &self.tree
    }

    pub fn map_center(&self) -> Option<Coordinates> {
        self.catalog.center()
    }
}
