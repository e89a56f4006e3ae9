//! Reading raw sales rows from csv files.
//!
//! Columns are looked up by name in the header row, so extra columns and any column order are
//! fine. Rows whose numbers or dates can't be read are skipped with a warning.

use std::fs::File;
use std::io::{self, BufRead};
use std::path::{Path, PathBuf};

use chrono::{NaiveDate, NaiveDateTime};
use glob::glob;
use log::{info, warn};

use crate::config::ColumnConfig;
use crate::data::{EntityId, RawRecord};
use crate::error::{Error, Result};

const DATE_FORMATS: [&str; 2] = ["%Y-%m-%d", "%m/%d/%Y"];
const DATETIME_FORMATS: [&str; 3] = ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S", "%m/%d/%Y %I:%M:%S %p"];

#[derive(Debug, Default)]
pub struct LoadReport {
    pub records: Vec<RawRecord>,
    pub skipped: usize,
}

/// Positions of the configured columns within a header row
#[derive(Debug, Clone, PartialEq)]
struct ColumnPositions {
    entity_id: usize,
    location: usize,
    timestamp: usize,
    amount_sold: usize,
    quantity: usize,
    volume: usize,
}

impl ColumnPositions {

    fn from_header(header: &[String], columns: &ColumnConfig) -> Result<Self> {

        let find = |name: &str| {
            header
                .iter()
                .position(|x| x.trim() == name)
                .ok_or_else(|| Error::MissingColumn(name.to_string()))
        };

        return Ok(Self {
            entity_id: find(&columns.entity_id)?,
            location: find(&columns.location)?,
            timestamp: find(&columns.timestamp)?,
            amount_sold: find(&columns.amount_sold)?,
            quantity: find(&columns.quantity)?,
            volume: find(&columns.volume)?,
        });
    }

    fn max(&self) -> usize {

        [self.entity_id, self.location, self.timestamp, self.amount_sold, self.quantity, self.volume]
            .into_iter()
            .max()
            .unwrap_or(0)
    }
}

/// Splits one csv line, honouring double quotes and `""` escapes inside them
pub fn split_fields(line: &str) -> Vec<String> {

    let mut fields: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match (c, in_quotes) {
            ('"', true) => {
                if chars.peek() == Some(&'"') {
                    current.push('"');
                    chars.next();
                } else {
                    in_quotes = false;
                }
            },
            ('"', false) => in_quotes = true,
            (',', false) => fields.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    fields.push(current);

    return fields;
}

pub fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {

    let value = value.trim();

    for format in DATETIME_FORMATS {
        if let Ok(x) = NaiveDateTime::parse_from_str(value, format) {
            return Some(x);
        }
    }

    for format in DATE_FORMATS {
        if let Ok(x) = NaiveDate::parse_from_str(value, format) {
            return x.and_hms_opt(0, 0, 0);
        }
    }

    None
}

/// Counts may be written as `12` or `12.0`
fn parse_count(value: &str) -> Option<i64> {

    let value = value.trim();

    match value.parse::<i64>() {
        Ok(x) => Some(x),
        Err(_) => {
            let x = value.parse::<f64>().ok()?;
            match x.is_finite() && x.fract() == 0.0 {
                true => Some(x as i64),
                false => None,
            }
        },
    }
}

fn parse_amount(value: &str) -> Option<f64> {

    let value = value.trim().trim_start_matches('$').replace(',', "");

    value.parse::<f64>().ok().filter(|x| x.is_finite())
}

fn parse_row(fields: &[String], positions: &ColumnPositions, line: usize) -> Result<RawRecord> {

    let malformed = |reason: String| Error::MalformedRecord { line, reason };

    if fields.len() <= positions.max() {
        return Err(malformed(format!("expected at least {} fields, found {}", positions.max() + 1, fields.len())));
    }

    let entity_id = fields[positions.entity_id].trim();
    if entity_id.is_empty() {
        return Err(malformed("empty store id".to_string()));
    }

    let field = |i: usize| fields[i].as_str();

    let timestamp = parse_timestamp(field(positions.timestamp))
        .ok_or_else(|| malformed(format!("bad date {:?}", field(positions.timestamp))))?;
    let amount_sold = parse_amount(field(positions.amount_sold))
        .ok_or_else(|| malformed(format!("bad amount {:?}", field(positions.amount_sold))))?;
    let quantity = parse_count(field(positions.quantity))
        .ok_or_else(|| malformed(format!("bad quantity {:?}", field(positions.quantity))))?;
    let volume = parse_amount(field(positions.volume))
        .ok_or_else(|| malformed(format!("bad volume {:?}", field(positions.volume))))?;

    let location = Some(field(positions.location).to_string()).filter(|x| !x.trim().is_empty());

    return Ok(RawRecord {
        entity_id: EntityId::new(entity_id),
        location,
        timestamp,
        amount_sold,
        quantity,
        volume,
    });
}

/// Whether a double-quoted field is still open after `line`, given the state before it.
/// A `""` escape flips twice, so it leaves the state as it was.
fn quote_open_after(line: &str, open: bool) -> bool {

    line.chars().filter(|c| *c == '"').fold(open, |open, _| !open)
}

/// Reads csv rows from any reader; the first line must be the header.
///
/// A quoted field may span several lines (store names and addresses sometimes do), the row then
/// ends on the line that closes the quote. Errors report the line the row starts on.
pub fn read_records<R: BufRead>(reader: R, columns: &ColumnConfig) -> Result<LoadReport> {

    let mut lines = reader.lines();

    let header = match lines.next() {
        None => return Ok(LoadReport::default()),
        Some(x) => split_fields(x?.trim_start_matches('\u{feff}')),
    };

    let positions = ColumnPositions::from_header(&header, columns)?;

    let mut report = LoadReport::default();

    let mut row = String::new();
    let mut row_start: usize = 0;
    let mut in_quotes = false;

    for (i, line) in lines.enumerate() {

        let line = line?;

        //header is line 1
        match row.is_empty() {
            true => {
                if line.trim().is_empty() {
                    continue;
                }
                row_start = i + 2;
            },
            false => row.push('\n'),
        }

        row.push_str(&line);
        in_quotes = quote_open_after(&line, in_quotes);

        if in_quotes {
            continue;
        }

        match parse_row(&split_fields(&row), &positions, row_start) {
            Ok(record) => report.records.push(record),
            Err(e) => {
                warn!("skipping row: {}", e);
                report.skipped += 1;
            },
        }

        row.clear();
    }

    if !row.is_empty() {
        warn!("skipping row: {}", Error::MalformedRecord { line: row_start, reason: "unterminated quote".to_string() });
        report.skipped += 1;
    }

    return Ok(report);
}

pub fn read_records_from_file<P: AsRef<Path>>(filename: P, columns: &ColumnConfig) -> Result<LoadReport> {

    let file = File::open(filename.as_ref())?;
    let report = read_records(io::BufReader::new(file), columns)?;

    info!("read {} records from {} ({} skipped)", report.records.len(), filename.as_ref().display(), report.skipped);

    return Ok(report);
}

/// Files matching a glob pattern, sorted; a plain path matches itself
pub fn expand_pattern(pattern: &str) -> Result<Vec<PathBuf>> {

    let mut filenames: Vec<PathBuf> = Vec::new();

    for entry in glob(pattern)? {
        match entry {
            Ok(path) => filenames.push(path),
            Err(e) => warn!("unreadable path while expanding {}: {}", pattern, e),
        }
    }

    filenames.sort();

    return Ok(filenames);
}

/// Reads every file matching `pattern` and concatenates the rows in file name order
pub fn read_records_from_pattern(pattern: &str, columns: &ColumnConfig) -> Result<LoadReport> {

    let filenames = expand_pattern(pattern)?;

    if filenames.is_empty() {
        return Err(Error::Io(io::Error::new(io::ErrorKind::NotFound, format!("no input files match {}", pattern))));
    }

    let mut report = LoadReport::default();

    for filename in filenames {
        let file_report = read_records_from_file(&filename, columns)?;
        report.records.extend(file_report.records);
        report.skipped += file_report.skipped;
    }

    return Ok(report);
}

#[cfg(test)]
mod tests {

    use super::*;
    use assert_approx_eq::assert_approx_eq;

    const SAMPLE: &str = "test_data/sample_sales.csv";

    #[test]
    fn split_quoted_fields() {

        let fields = split_fields(r#"2021-01-05,2633,"HY-VEE #3, BDI","POINT (-93.6 41.6)","say ""hi""",10"#);

        assert_eq!(fields, vec!["2021-01-05", "2633", "HY-VEE #3, BDI", "POINT (-93.6 41.6)", "say \"hi\"", "10"]);
        assert_eq!(split_fields("a,,b,"), vec!["a", "", "b", ""]);
    }

    #[test]
    fn timestamps() {

        let expected = NaiveDate::from_ymd_opt(2021, 3, 4).unwrap().and_hms_opt(0, 0, 0).unwrap();

        assert_eq!(parse_timestamp("2021-03-04"), Some(expected));
        assert_eq!(parse_timestamp("03/04/2021"), Some(expected));
        assert_eq!(parse_timestamp("2021-03-04T00:00:00"), Some(expected));
        assert_eq!(parse_timestamp("yesterday"), None);
    }

    #[test]
    fn numbers() {

        assert_eq!(parse_count("12"), Some(12));
        assert_eq!(parse_count("12.0"), Some(12));
        assert_eq!(parse_count("12.5"), None);
        assert_approx_eq!(parse_amount("$1,234.50").unwrap(), 1234.5);
        assert_eq!(parse_amount("NaN"), None);
    }

    #[test]
    fn read_from_reader() {

        let data = "\
store_number,date,store_location,sale_dollars,bottles_sold,volume_sold_liters,extra
2633,2021-01-05,POINT (-93.6 41.6),10.5,2,1.5,x
2633,2021-04-05,,20,3,2.25,y
3000,not a date,POINT (-91.0 40.0),5,1,0.75,z

4000,2021-02-01,\"POINT (-92.0 42.0)\",5,1,0.75,w
";

        let report = read_records(data.as_bytes(), &ColumnConfig::default()).unwrap();

        assert_eq!(report.records.len(), 3);
        assert_eq!(report.skipped, 1);

        let first = &report.records[0];
        assert_eq!(first.entity_id, EntityId::new("2633"));
        assert_eq!(first.location.as_deref(), Some("POINT (-93.6 41.6)"));
        assert_approx_eq!(first.amount_sold, 10.5);
        assert_eq!(first.quantity, 2);

        assert_eq!(report.records[1].location, None);
        assert_eq!(report.records[2].location.as_deref(), Some("POINT (-92.0 42.0)"));
    }

    #[test]
    fn quoted_field_across_lines() {

        let data = "\
store_number,store_name,date,store_location,sale_dollars,bottles_sold,volume_sold_liters
2633,\"HY-VEE #3
FOOD AND DRUGSTORE\",2021-01-05,POINT (-93.6 41.6),10.5,2,1.5
3000,\"SAY \"\"HI\"\"\",2021-01-06,POINT (-91.0 40.0),5,1,0.75
4000,\"SECOND

AVENUE\",oops,POINT (-92.0 42.0),5,1,0.75
5000,ONE LINE,2021-01-07,,1,1,0.75
";

        let report = read_records(data.as_bytes(), &ColumnConfig::default()).unwrap();

        let ids: Vec<&str> = report.records.iter().map(|r| r.entity_id.as_str()).collect();
        assert_eq!(ids, vec!["2633", "3000", "5000"]);
        assert_eq!(report.skipped, 1);
        assert_eq!(report.records[0].location.as_deref(), Some("POINT (-93.6 41.6)"));
        assert_approx_eq!(report.records[0].amount_sold, 10.5);
    }

    #[test]
    fn unterminated_quote_is_skipped() {

        let data = "\
store_number,store_name,date,store_location,sale_dollars,bottles_sold,volume_sold_liters
2633,NAME,2021-01-05,POINT (-93.6 41.6),10.5,2,1.5
3000,\"NEVER CLOSED,2021-01-06,POINT (-91.0 40.0),5,1,0.75
";

        let report = read_records(data.as_bytes(), &ColumnConfig::default()).unwrap();

        assert_eq!(report.records.len(), 1);
        assert_eq!(report.skipped, 1);
    }

    #[test]
    fn missing_column() {

        let data = "store_number,date\n1,2021-01-01\n";

        match read_records(data.as_bytes(), &ColumnConfig::default()) {
            Err(Error::MissingColumn(name)) => assert_eq!(name, "store_location"),
            other => panic!("expected missing column, got {:?}", other),
        }
    }

    #[test]
    fn empty_input() {

        let report = read_records("".as_bytes(), &ColumnConfig::default()).unwrap();
        assert!(report.records.is_empty());
    }

    #[test]
    fn read_sample_file() {

        let report = read_records_from_pattern(SAMPLE, &ColumnConfig::default()).unwrap();

        assert_eq!(report.records.len(), 12);
        assert_eq!(report.skipped, 1);
    }

    #[test]
    fn pattern_without_matches() {

        assert!(read_records_from_pattern("test_data/nothing_here_*.csv", &ColumnConfig::default()).is_err());
    }
}
