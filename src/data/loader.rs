use crate::data::bar::{Bar, BarError};
use crate::data::series::{PriceSeries, SeriesError};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use csv::{ReaderBuilder, StringRecord, Trim};
use indexmap::IndexMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use thiserror::Error;
use tracing::debug;

//accepted names for the time column, in priority order
const TIME_COLUMNS: [&str; 4] = ["datetime", "timestamp", "date", "time"];

const REQUIRED_COLUMNS: [&str; 5] = ["open", "high", "low", "close", "volume"];

const NAIVE_FORMATS: [&str; 5] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("failed to open {path}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("missing required column '{0}'")]
    MissingColumn(String),
    #[error("malformed timestamp '{value}' at line {line}")]
    MalformedTimestamp { line: usize, value: String },
    #[error("invalid {column} value '{value}' at line {line}")]
    InvalidNumber {
        line: usize,
        column: String,
        value: String,
    },
    #[error("invalid bar at line {line}")]
    InvalidBar {
        line: usize,
        #[source]
        source: BarError,
    },
    #[error("duplicate timestamp {0}")]
    DuplicateTimestamp(DateTime<Utc>),
    #[error("no rows in input")]
    Empty,
}

//resolved positions of the columns the loader needs
#[derive(Debug, Clone, Copy)]
struct ColumnMap {
    time: usize,
    open: usize,
    high: usize,
    low: usize,
    close: usize,
    volume: usize,
}

//loads a price series from a csv file
pub fn load_csv<P: AsRef<Path>>(path: P) -> Result<PriceSeries, LoadError> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|source| LoadError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let series = load_csv_from_reader(file)?;
    debug!(path = %path.display(), bars = series.len(), "loaded price series");
    Ok(series)
}

//loads a price series from any csv source
pub fn load_csv_from_reader<R: Read>(source: R) -> Result<PriceSeries, LoadError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .trim(Trim::All)
        .from_reader(source);

    let headers = reader.headers()?.clone();
    let columns = resolve_columns(&headers)?;

    let mut bars = Vec::new();
    for (index, result) in reader.records().enumerate() {
        let record = result?;
        //header is line 1
        let line = index + 2;
        bars.push(parse_record(&record, &columns, line)?);
    }

    if bars.is_empty() {
        return Err(LoadError::Empty);
    }

    //sort by timestamp to ensure chronological order
    bars.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));

    PriceSeries::new(bars).map_err(|err| match err {
        SeriesError::NotIncreasing { timestamp, .. } => LoadError::DuplicateTimestamp(timestamp),
    })
}

//trims and lower-cases a header name
pub fn normalize_column_name(name: &str) -> String {
    name.trim().to_lowercase()
}

//true for columns left behind by a dataframe index export
fn is_index_artifact(name: &str) -> bool {
    name.is_empty() || name.contains("unnamed")
}

fn resolve_columns(headers: &StringRecord) -> Result<ColumnMap, LoadError> {
    let mut by_name: IndexMap<String, usize> = IndexMap::new();
    for (position, raw) in headers.iter().enumerate() {
        let name = normalize_column_name(raw);
        if is_index_artifact(&name) {
            debug!(column = raw, "dropping index-like column");
            continue;
        }
        by_name.entry(name).or_insert(position);
    }

    let time = TIME_COLUMNS
        .iter()
        .find_map(|name| by_name.get(*name).copied())
        .ok_or_else(|| LoadError::MissingColumn(TIME_COLUMNS[0].to_string()))?;

    let mut required = [0usize; 5];
    for (slot, name) in required.iter_mut().zip(REQUIRED_COLUMNS) {
        *slot = *by_name
            .get(name)
            .ok_or_else(|| LoadError::MissingColumn(name.to_string()))?;
    }

    Ok(ColumnMap {
        time,
        open: required[0],
        high: required[1],
        low: required[2],
        close: required[3],
        volume: required[4],
    })
}

fn parse_record(record: &StringRecord, columns: &ColumnMap, line: usize) -> Result<Bar, LoadError> {
    let raw_time = record.get(columns.time).unwrap_or_default();
    let timestamp = parse_timestamp(raw_time).ok_or_else(|| LoadError::MalformedTimestamp {
        line,
        value: raw_time.to_string(),
    })?;

    let open = parse_number(record, columns.open, "open", line)?;
    let high = parse_number(record, columns.high, "high", line)?;
    let low = parse_number(record, columns.low, "low", line)?;
    let close = parse_number(record, columns.close, "close", line)?;
    let volume = parse_number(record, columns.volume, "volume", line)?;

    Bar::new(timestamp, open, high, low, close, volume)
        .map_err(|source| LoadError::InvalidBar { line, source })
}

fn parse_number(
    record: &StringRecord,
    position: usize,
    column: &str,
    line: usize,
) -> Result<f64, LoadError> {
    let raw = record.get(position).unwrap_or_default();
    raw.parse::<f64>().map_err(|_| LoadError::InvalidNumber {
        line,
        column: column.to_string(),
        value: raw.to_string(),
    })
}

//parses rfc3339 or common naive datetime layouts (naive values are utc)
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}
