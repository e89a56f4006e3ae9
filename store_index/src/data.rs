//! Plain data types: stores, their coordinates, raw input rows and derived sales records.

use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use chrono::{Datelike, NaiveDateTime};
use regex::Regex;
use serde::{Serialize, Deserialize};

use crate::error::{Error, Result};

/// Weekday labels indexed 0 = Monday .. 6 = Sunday
pub const WEEKDAY_LABELS: [&str; 7] = [
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
    "Sunday",
];

/// Store identifier, kept as the exact text found in the input
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(pub String);

impl EntityId {

    pub fn new(id: &str) -> Self {
        Self(id.trim().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityId {

    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for EntityId {

    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinates {

    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Flat euclidean distance on raw (lat, lon), no projection
    pub fn distance(&self, other: &Coordinates) -> f64 {

        let d_lat = self.lat - other.lat;
        let d_lon = self.lon - other.lon;

        return (d_lat * d_lat + d_lon * d_lon).sqrt();
    }

    pub fn axis(&self, axis: usize) -> f64 {

        match axis {
            0 => self.lat,
            _ => self.lon,
        }
    }

    pub fn is_finite(&self) -> bool {
        self.lat.is_finite() && self.lon.is_finite()
    }

    /// Parses a location field of the form `POINT (lon lat)`.
    ///
    /// Everything between the first `(` and the last `)` is split on whitespace; the first value is
    /// the longitude and the second the latitude.
    pub fn parse_location(entity_id: &EntityId, field: &str) -> Result<Self> {

        static INNER: OnceLock<Regex> = OnceLock::new();
        let re = INNER.get_or_init(|| Regex::new(r"\((.*)\)").expect("static regex"));

        let malformed = || Error::MalformedCoordinate {
            entity_id: entity_id.to_string(),
            value: field.to_string(),
        };

        let inner = re.captures(field).and_then(|c| c.get(1)).ok_or_else(malformed)?;

        let values: Vec<&str> = inner.as_str().split_whitespace().collect();
        if values.len() != 2 {
            return Err(malformed());
        }

        let lon = values[0].parse::<f64>().map_err(|_| malformed())?;
        let lat = values[1].parse::<f64>().map_err(|_| malformed())?;

        let coordinates = Self::new(lat, lon);
        match coordinates.is_finite() {
            true => Ok(coordinates),
            false => Err(malformed()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Entity {
    pub id: EntityId,
    pub coordinates: Coordinates,
}

/// Calendar quarter, displayed as `2021Q1`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Period {
    pub year: i32,
    pub quarter: u8,
}

impl Period {

    pub fn new(year: i32, quarter: u8) -> Result<Self> {

        match (1..=4).contains(&quarter) {
            true => Ok(Self { year, quarter }),
            false => Err(Error::InvalidPeriod(format!("{}Q{}", year, quarter))),
        }
    }

    pub fn from_timestamp(timestamp: &NaiveDateTime) -> Self {

        let quarter = (timestamp.month0() / 3 + 1) as u8;

        return Self { year: timestamp.year(), quarter };
    }
}

impl fmt::Display for Period {

    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}Q{}", self.year, self.quarter)
    }
}

impl FromStr for Period {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {

        let invalid = || Error::InvalidPeriod(s.to_string());

        let (year, quarter) = s.trim().split_once(['Q', 'q']).ok_or_else(invalid)?;
        let year = year.parse::<i32>().map_err(|_| invalid())?;
        let quarter = quarter.parse::<u8>().map_err(|_| invalid())?;

        Self::new(year, quarter).map_err(|_| invalid())
    }
}

impl Serialize for Period {

    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Numeric columns a chart can plot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Measure {
    BottlesSold,
    SaleDollars,
    VolumeSoldLiters,
}

impl Measure {

    pub const ALL: [Measure; 3] = [Measure::BottlesSold, Measure::SaleDollars, Measure::VolumeSoldLiters];

    pub fn name(&self) -> &'static str {

        match self {
            Measure::BottlesSold => "bottles_sold",
            Measure::SaleDollars => "sale_dollars",
            Measure::VolumeSoldLiters => "volume_sold_liters",
        }
    }
}

impl FromStr for Measure {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {

        Measure::ALL
            .into_iter()
            .find(|m| m.name() == s)
            .ok_or_else(|| Error::InvalidMeasure(s.to_string()))
    }
}

/// One input row before validation; the location is kept raw
#[derive(Debug, Clone, PartialEq)]
pub struct RawRecord {
    pub entity_id: EntityId,
    pub location: Option<String>,
    pub timestamp: NaiveDateTime,
    pub amount_sold: f64,
    pub quantity: i64,
    pub volume: f64,
}

impl RawRecord {

    /// Location with blank and `nan` values treated as missing
    pub fn location(&self) -> Option<&str> {

        let location = self.location.as_deref()?.trim();

        match location.is_empty() || location.eq_ignore_ascii_case("nan") {
            true => None,
            false => Some(location),
        }
    }
}

/// A sale attached to a catalogued store, with its derived period and weekday
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Record {
    pub entity_id: EntityId,
    pub timestamp: NaiveDateTime,
    pub period: Period,
    pub weekday: &'static str,
    pub amount_sold: f64,
    pub quantity: i64,
    pub volume: f64,
}

impl Record {

    pub fn from_raw(raw: &RawRecord) -> Self {

        let weekday = WEEKDAY_LABELS[raw.timestamp.weekday().num_days_from_monday() as usize];

        return Self {
            entity_id: raw.entity_id.clone(),
            timestamp: raw.timestamp,
            period: Period::from_timestamp(&raw.timestamp),
            weekday,
            amount_sold: raw.amount_sold,
            quantity: raw.quantity,
            volume: raw.volume,
        };
    }

    pub fn value(&self, measure: Measure) -> f64 {

        match measure {
            Measure::BottlesSold => self.quantity as f64,
            Measure::SaleDollars => self.amount_sold,
            Measure::VolumeSoldLiters => self.volume,
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {

    use super::*;
    use assert_approx_eq::assert_approx_eq;
    use chrono::NaiveDate;

    pub fn raw(id: &str, location: Option<&str>, date: (i32, u32, u32), amount: f64) -> RawRecord {

        let timestamp = NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap().and_hms_opt(0, 0, 0).unwrap();

        RawRecord {
            entity_id: EntityId::new(id),
            location: location.map(|x| x.to_string()),
            timestamp,
            amount_sold: amount,
            quantity: 1,
            volume: 0.75,
        }
    }

    #[test]
    fn parse_point_location() {

        let id = EntityId::new("2633");
        let c = Coordinates::parse_location(&id, "POINT (-93.613739 41.60572)").unwrap();

        assert_approx_eq!(c.lat, 41.60572);
        assert_approx_eq!(c.lon, -93.613739);
    }

    #[test]
    fn parse_bad_locations() {

        let id = EntityId::new("1");

        for field in ["POINT -93.6 41.6", "POINT (abc 41.6)", "POINT (-93.6)", "(1 2 3)", "(nan 1.0)"] {
            match Coordinates::parse_location(&id, field) {
                Err(Error::MalformedCoordinate { entity_id, .. }) => assert_eq!(entity_id, "1"),
                other => panic!("expected malformed coordinate for {:?}, got {:?}", field, other),
            }
        }
    }

    #[test]
    fn quarter_and_weekday_derivation() {

        let r = Record::from_raw(&raw("A", None, (2021, 1, 5), 10.0));
        assert_eq!(r.period.to_string(), "2021Q1");
        assert_eq!(r.weekday, "Tuesday");

        let r = Record::from_raw(&raw("A", None, (2021, 4, 5), 10.0));
        assert_eq!(r.period.to_string(), "2021Q2");
        assert_eq!(r.weekday, "Monday");

        let r = Record::from_raw(&raw("A", None, (2021, 12, 31), 10.0));
        assert_eq!(r.period, Period { year: 2021, quarter: 4 });
    }

    #[test]
    fn period_parsing() {

        assert_eq!("2021Q3".parse::<Period>().unwrap(), Period { year: 2021, quarter: 3 });
        assert!("2021Q5".parse::<Period>().is_err());
        assert!("2021".parse::<Period>().is_err());
        assert!("Q1".parse::<Period>().is_err());
    }

    #[test]
    fn measure_parsing() {

        for measure in Measure::ALL {
            assert_eq!(measure.name().parse::<Measure>().unwrap(), measure);
        }

        match "gallons".parse::<Measure>() {
            Err(Error::InvalidMeasure(x)) => assert_eq!(x, "gallons"),
            other => panic!("expected InvalidMeasure, got {:?}", other),
        }
    }

    #[test]
    fn blank_locations_are_missing() {

        assert_eq!(raw("A", Some("  "), (2021, 1, 1), 1.0).location(), None);
        assert_eq!(raw("A", Some("nan"), (2021, 1, 1), 1.0).location(), None);
        assert_eq!(raw("A", Some("POINT (1 2)"), (2021, 1, 1), 1.0).location(), Some("POINT (1 2)"));
    }

    #[test]
    fn entity_ids_keep_their_text() {

        assert_eq!(EntityId::new(" 0012 ").as_str(), "0012");
        assert_ne!(EntityId::new("12"), EntityId::new("12.0"));
    }
}
