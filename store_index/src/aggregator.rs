//! Per-store partitions of sales records.
//!
//! Partitions are built once and never change afterwards. Filtering hands back a copy; summing and
//! grouping is left to whoever draws the chart.

use std::collections::HashMap;

use chrono::NaiveDateTime;
use log::{debug, info};
use serde::Serialize;

use crate::catalog::EntityCatalog;
use crate::data::{EntityId, Measure, Period, RawRecord, Record};
use crate::error::{Error, Result};

/// Records of a single store, in input order
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Partition {
    pub entity_id: EntityId,
    pub records: Vec<Record>,
}

impl Partition {

    pub fn new(entity_id: EntityId) -> Self {
        Self { entity_id, records: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn filtered<P>(&self, predicate: P) -> Self
    where P: Fn(&Record) -> bool {

        return Self {
            entity_id: self.entity_id.clone(),
            records: self.records.iter().filter(|r| predicate(r)).cloned().collect(),
        };
    }

    /// (timestamp, value) pairs for plotting one measure
    pub fn series(&self, measure: Measure) -> Vec<(NaiveDateTime, f64)> {

        self.records.iter().map(|r| (r.timestamp, r.value(measure))).collect()
    }

    pub fn total(&self, measure: Measure) -> f64 {

        self.records.iter().map(|r| r.value(measure)).sum()
    }

    /// Distinct periods in order of first appearance
    pub fn periods(&self) -> Vec<Period> {

        let mut periods: Vec<Period> = Vec::new();
        for record in self.records.iter() {
            if !periods.contains(&record.period) {
                periods.push(record.period);
            }
        }

        return periods;
    }
}

#[derive(Debug, Default)]
pub struct RecordAggregator {
    partitions: HashMap<EntityId, Partition>,
    dropped: usize,
}

impl RecordAggregator {

    /// Partitions `records` by store, dropping rows whose store isn't in `catalog`
    pub fn build(records: &[RawRecord], catalog: &EntityCatalog) -> Self {

        let mut partitions: HashMap<EntityId, Partition> = HashMap::with_capacity(catalog.len());
        let mut dropped: usize = 0;

        for raw in records {

            if !catalog.contains(&raw.entity_id) {
                dropped += 1;
                continue;
            }

            partitions
                .entry(raw.entity_id.clone())
                .or_insert_with(|| Partition::new(raw.entity_id.clone()))
                .records
                .push(Record::from_raw(raw));
        }

        if dropped > 0 {
            debug!("dropped {} records of stores without coordinates", dropped);
        }
        info!("partitioned {} records across {} stores", records.len() - dropped, partitions.len());

        return Self { partitions, dropped };
    }

    pub fn get(&self, entity_id: &EntityId) -> Result<&Partition> {

        self.partitions.get(entity_id).ok_or_else(|| Error::NotFound(entity_id.to_string()))
    }

    pub fn get_filtered<P>(&self, entity_id: &EntityId, predicate: P) -> Result<Partition>
    where P: Fn(&Record) -> bool {

        let partition = self.get(entity_id)?;

        return Ok(partition.filtered(predicate));
    }

    pub fn get_period(&self, entity_id: &EntityId, period: &Period) -> Result<Partition> {

        self.get_filtered(entity_id, |r| r.period == *period)
    }

    pub fn len(&self) -> usize {
        self.partitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.partitions.is_empty()
    }

    /// Number of input rows left out because their store had no usable location
    pub fn dropped(&self) -> usize {
        self.dropped
    }
}

#[cfg(test)]
mod tests {

    use super::*;
    use crate::data::tests::raw;
    use assert_approx_eq::assert_approx_eq;

    fn sample() -> Vec<RawRecord> {

        vec![
            raw("A", Some("POINT (0 0)"), (2021, 1, 5), 10.0),
            raw("A", Some("POINT (0 0)"), (2021, 4, 5), 20.0),
            raw("B", Some("POINT (0 1)"), (2021, 2, 1), 5.0),
            raw("X", None, (2021, 2, 1), 99.0),
        ]
    }

    #[test]
    fn partitions_by_store() {

        let records = sample();
        let (catalog, _) = EntityCatalog::build(&records);
        let aggregator = RecordAggregator::build(&records, &catalog);

        let a = aggregator.get(&EntityId::new("A")).unwrap();
        let periods: Vec<String> = a.records.iter().map(|r| r.period.to_string()).collect();
        assert_eq!(periods, vec!["2021Q1", "2021Q2"]);

        let b = aggregator.get(&EntityId::new("B")).unwrap();
        assert_eq!(b.len(), 1);

        assert_eq!(aggregator.dropped(), 1);
        assert!(matches!(aggregator.get(&EntityId::new("X")), Err(Error::NotFound(_))));
    }

    #[test]
    fn filtering_leaves_partition_untouched() {

        let records = sample();
        let (catalog, _) = EntityCatalog::build(&records);
        let aggregator = RecordAggregator::build(&records, &catalog);

        let id = EntityId::new("A");
        let q1 = aggregator.get_period(&id, &"2021Q1".parse().unwrap()).unwrap();
        assert_eq!(q1.len(), 1);
        assert_approx_eq!(q1.records[0].amount_sold, 10.0);

        let q3 = aggregator.get_period(&id, &"2021Q3".parse().unwrap()).unwrap();
        assert!(q3.is_empty());

        assert_eq!(aggregator.get(&id).unwrap().len(), 2);
    }

    #[test]
    fn input_order_is_kept() {

        let records = vec![
            raw("A", Some("POINT (0 0)"), (2021, 3, 1), 3.0),
            raw("A", Some("POINT (0 0)"), (2021, 1, 1), 1.0),
            raw("A", Some("POINT (0 0)"), (2021, 2, 1), 2.0),
        ];
        let (catalog, _) = EntityCatalog::build(&records);
        let aggregator = RecordAggregator::build(&records, &catalog);

        let series = aggregator.get(&EntityId::new("A")).unwrap().series(Measure::SaleDollars);
        let values: Vec<f64> = series.iter().map(|x| x.1).collect();
        assert_eq!(values, vec![3.0, 1.0, 2.0]);
    }

    #[test]
    fn totals_and_periods() {

        let records = sample();
        let (catalog, _) = EntityCatalog::build(&records);
        let aggregator = RecordAggregator::build(&records, &catalog);

        let a = aggregator.get(&EntityId::new("A")).unwrap();
        assert_approx_eq!(a.total(Measure::SaleDollars), 30.0);
        assert_approx_eq!(a.total(Measure::BottlesSold), 2.0);
        assert_approx_eq!(a.total(Measure::VolumeSoldLiters), 1.5);
        assert_eq!(a.periods().len(), 2);
    }
}
