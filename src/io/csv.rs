use crate::config::ColumnConfig;
use crate::error::{PipelineError, Result};
use crate::observation::{Observation, WatershedId};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use csv::{ReaderBuilder, StringRecord, Writer, WriterBuilder};
use log::{debug, info};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

// Header positions of the required observation columns
#[derive(Debug)]
struct ColumnIndex {
    watershed_id: usize,
    date: usize,
    topic: usize,
    precipitation: usize,
}

impl ColumnIndex {
    fn from_headers(headers: &StringRecord, config: &ColumnConfig, source: &str) -> Result<Self> {
        let find = |name: &str| {
            headers
                .iter()
                .position(|h| h == name)
                .ok_or_else(|| PipelineError::MissingColumn {
                    column: name.to_string(),
                    source_name: source.to_string(),
                })
        };

        Ok(ColumnIndex {
            watershed_id: find(&config.watershed_id)?,
            date: find(&config.date)?,
            topic: find(&config.topic)?,
            precipitation: find(&config.precipitation)?,
        })
    }
}

impl Observation {
    fn from_record(record: &StringRecord, index: &ColumnIndex) -> Result<Self> {
        let line = record.position().map(|p| p.line()).unwrap_or_default();
        let field = |i: usize| record.get(i).unwrap_or_default().trim();

        let raw_id = field(index.watershed_id);
        let watershed_id = parse_watershed_id(raw_id).ok_or_else(|| {
            PipelineError::InvalidWatershedId {
                value: raw_id.to_string(),
                line,
            }
        })?;

        let raw_date = field(index.date);
        let date = parse_date(raw_date).ok_or_else(|| PipelineError::DateParse {
            value: raw_date.to_string(),
            line,
        })?;

        let topic = match field(index.topic) {
            "" | "NA" | "null" => None,
            t => Some(t.to_string()),
        };

        Ok(Observation {
            watershed_id,
            date,
            topic,
            precipitation: field(index.precipitation).to_string(),
        })
    }
}

// Ids are sometimes exported as floats ("2050008490.0")
fn parse_watershed_id(value: &str) -> Option<WatershedId> {
    value
        .parse::<WatershedId>()
        .ok()
        .or_else(|| value.strip_suffix(".0")?.parse().ok())
}

/// Accepts `YYYY-MM-DD`, `YYYY-MM-DD HH:MM:SS` and RFC 3339 timestamps.
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S")
                .ok()
                .map(|dt| dt.date())
        })
        .or_else(|| {
            DateTime::parse_from_rfc3339(value)
                .ok()
                .map(|dt| dt.date_naive())
        })
}

pub fn read_observations<R: Read>(
    reader: R,
    config: &ColumnConfig,
    source: &str,
) -> Result<Vec<Observation>> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .delimiter(b',')
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let index = ColumnIndex::from_headers(rdr.headers()?, config, source)?;
    debug!("Column layout of {}: {:?}", source, index);

    let mut observations = Vec::new();
    for result in rdr.records() {
        let record = result?;
        observations.push(Observation::from_record(&record, &index)?);
    }
    Ok(observations)
}

// Load the observation table from disk
pub fn load_observations(path: &Path, config: &ColumnConfig) -> Result<Vec<Observation>> {
    let file = File::open(path)?;
    let observations = read_observations(
        BufReader::new(file),
        config,
        &path.display().to_string(),
    )?;

    info!(
        "Loaded {} observations from {}",
        observations.len(),
        path.display()
    );
    Ok(observations)
}

// Create CSV writer for summary tables
pub fn create_csv_writer(path: &Path) -> Result<Writer<File>> {
    Ok(WriterBuilder::new().has_headers(true).from_path(path)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TABLE: &str = "\
HYBAS_ID,date,topic,precip_category,text
2050008490,2021-07-14,Flood damage,2_High,foo
2050008490,2021-07-15 08:30:00,,2_High,bar
2050008500.0,2021-07-16T10:00:00+02:00,NA,1_Low,baz
";

    #[test]
    fn test_read_observations() {
        let rows = read_observations(TABLE.as_bytes(), &ColumnConfig::new(), "test").unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].watershed_id, 2050008490);
        assert_eq!(rows[0].topic.as_deref(), Some("Flood damage"));
        assert_eq!(rows[0].precipitation, "2_High");
        assert_eq!(rows[1].date, NaiveDate::from_ymd_opt(2021, 7, 15).unwrap());
        assert_eq!(rows[1].topic, None);
        assert_eq!(rows[2].watershed_id, 2050008500);
        assert_eq!(rows[2].topic, None);
        assert_eq!(rows[2].date, NaiveDate::from_ymd_opt(2021, 7, 16).unwrap());
    }

    #[test]
    fn test_missing_column_is_named() {
        let table = "HYBAS_ID,date,precip_category\n1,2021-07-14,2_High\n";
        let err = read_observations(table.as_bytes(), &ColumnConfig::new(), "tweets.csv")
            .unwrap_err();
        match err {
            PipelineError::MissingColumn {
                column,
                source_name,
            } => {
                assert_eq!(column, "topic");
                assert_eq!(source_name, "tweets.csv");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_bad_date_reports_line() {
        let table = "HYBAS_ID,date,topic,precip_category\n1,2021-07-14,A,2_High\n1,yesterday,A,2_High\n";
        let err = read_observations(table.as_bytes(), &ColumnConfig::new(), "t").unwrap_err();
        assert!(matches!(err, PipelineError::DateParse { line: 3, .. }));
    }

    #[test]
    fn test_bad_watershed_id() {
        let table = "HYBAS_ID,date,topic,precip_category\nabc,2021-07-14,A,2_High\n";
        let err = read_observations(table.as_bytes(), &ColumnConfig::new(), "t").unwrap_err();
        assert!(matches!(err, PipelineError::InvalidWatershedId { .. }));
    }
}
