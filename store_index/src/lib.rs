//! In-memory nearest neighbor search over liquor store locations, with per-store sales records.
//!
//! Raw sales rows go through three stages, each built once at startup and read-only afterwards:
//! the [`catalog::EntityCatalog`] pulls one coordinate pair per store out of the location column,
//! the [`aggregator::RecordAggregator`] groups the rows into per-store partitions, and the
//! [`tree::KdTree`] indexes the store coordinates for k nearest neighbor queries. The
//! [`facade::QueryFacade`] answers "records of store X" and "records of X's closest stores for a
//! quarter" on top of those.
//!
//! Distances are plain euclidean distances on (latitude, longitude), no projection.
//!
pub mod error;
pub mod config;
pub mod data;
pub mod io;
pub mod catalog;
pub mod aggregator;
pub mod node;
pub mod tree;
pub mod facade;

pub use error::{Error, Result};
pub use config::ServiceConfig;
pub use data::{Coordinates, Entity, EntityId, Measure, Period, RawRecord, Record};
pub use aggregator::Partition;
pub use facade::QueryFacade;

#[cfg(test)]
mod tests {

    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn sample_file_end_to_end() {

        let config = ServiceConfig::default();
        let report = io::read_records_from_file("test_data/sample_sales.csv", &config.columns).unwrap();
        let (facade, build) = QueryFacade::build(&report.records, config);

        assert_eq!(build.stores, 5);
        assert_eq!(build.excluded_stores, 1);
        assert_eq!(build.dropped_records, 2);

        let hy_vee = EntityId::new("2633");
        let stats = facade.stats_for(&hy_vee).unwrap();
        assert_eq!(stats.len(), 3);
        assert_approx_eq!(stats.total(Measure::SaleDollars), 252.48);

        //4988 shares the address, each store still comes first for itself
        let q3: Period = "2021Q3".parse().unwrap();
        let neighbors = facade.neighbors_with_records(&hy_vee, Some(2), &q3).unwrap();
        let ids: Vec<&str> = neighbors.iter().map(|n| n.entity_id.as_str()).collect();
        assert_eq!(ids, vec!["2633", "4988"]);
        assert_eq!(neighbors[0].partition.len(), 1);
        assert_eq!(neighbors[1].partition.len(), 1);

        let neighbor_store = EntityId::new("4988");
        let neighbors = facade.neighbors_with_records(&neighbor_store, None, &q3).unwrap();
        assert_eq!(neighbors.len(), 1);
        assert_eq!(neighbors[0].entity_id, neighbor_store);
        assert_approx_eq!(neighbors[0].partition.records[0].amount_sold, 88.5);

        let neighbors = facade.neighbors_with_records(&neighbor_store, Some(2), &q3).unwrap();
        let ids: Vec<&str> = neighbors.iter().map(|n| n.entity_id.as_str()).collect();
        assert_eq!(ids, vec!["4988", "2633"]);

        let center = facade.map_center().unwrap();
        assert_approx_eq!(center.lat, 41.554101);
        assert_approx_eq!(center.lon, -93.596754);
    }
}
