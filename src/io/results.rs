use crate::aggregate::DominantTopic;
use crate::error::Result;
use crate::io::csv::create_csv_writer;
use crate::observation::WatershedId;
use chrono::NaiveDate;
use serde::Serialize;
use std::io::Write;
use std::path::Path;

// Row of the exported dominant-topic table
#[derive(Debug, Serialize)]
pub struct DominantTopicRow<'a> {
    pub watershed_id: WatershedId,
    pub period: &'a str,
    pub topic: &'a str,
    pub count: usize,
    pub representative_date: NaiveDate,
}

impl<'a> From<&'a DominantTopic> for DominantTopicRow<'a> {
    fn from(dominant: &'a DominantTopic) -> Self {
        DominantTopicRow {
            watershed_id: dominant.watershed_id,
            period: &dominant.period,
            topic: &dominant.topic,
            count: dominant.count,
            representative_date: dominant.representative_date,
        }
    }
}

pub fn write_dominant_topics<W: Write>(
    wtr: &mut csv::Writer<W>,
    dominant: &[DominantTopic],
) -> Result<()> {
    for row in dominant {
        wtr.serialize(DominantTopicRow::from(row))?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn save_dominant_topics(path: &Path, dominant: &[DominantTopic]) -> Result<()> {
    let mut wtr = create_csv_writer(path)?;
    write_dominant_topics(&mut wtr, dominant)
}
