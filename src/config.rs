use crate::error::{PipelineError, Result};
use crate::precipitation::PrecipCategory;
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

// Configuration structure for column and property name mapping
#[derive(Debug, Clone)]
pub struct ColumnConfig {
    pub watershed_id: String,
    pub date: String,
    pub topic: String,
    pub precipitation: String,
    pub geometry_id: String,
    pub city_name: String,
}

impl ColumnConfig {
    pub fn new() -> Self {
        ColumnConfig {
            watershed_id: "HYBAS_ID".to_string(),
            date: "date".to_string(),
            topic: "topic".to_string(),
            precipitation: "precip_category".to_string(),
            geometry_id: "HYBAS_ID".to_string(),
            city_name: "name".to_string(),
        }
    }
}

// Output format configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Png,
    Svg,
}

impl OutputFormat {
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());
        match ext.as_deref() {
            Some("png") => Ok(OutputFormat::Png),
            Some("svg") => Ok(OutputFormat::Svg),
            _ => Err(PipelineError::UnsupportedOutput(path.display().to_string())),
        }
    }
}

/// A named, inclusive date window. Each period becomes one facet of the map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Period {
    pub label: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl Period {
    pub fn new(label: &str, start: NaiveDate, end: NaiveDate) -> Self {
        Period {
            label: label.to_string(),
            start,
            end,
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

impl Default for Period {
    // The 7-27 July 2021 window
    fn default() -> Self {
        Period {
            label: "Overall".to_string(),
            start: NaiveDate::from_ymd_opt(2021, 7, 7).unwrap_or_default(),
            end: NaiveDate::from_ymd_opt(2021, 7, 27).unwrap_or_default(),
        }
    }
}

// LABEL=YYYY-MM-DD..YYYY-MM-DD
impl FromStr for Period {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || PipelineError::InvalidPeriod(s.to_string());
        let (label, range) = s.split_once('=').ok_or_else(invalid)?;
        let (start, end) = range.split_once("..").ok_or_else(invalid)?;
        let label = label.trim();
        if label.is_empty() {
            return Err(invalid());
        }
        let start = NaiveDate::parse_from_str(start.trim(), "%Y-%m-%d").map_err(|_| invalid())?;
        let end = NaiveDate::parse_from_str(end.trim(), "%Y-%m-%d").map_err(|_| invalid())?;
        if end < start {
            return Err(invalid());
        }
        Ok(Period::new(label, start, end))
    }
}

/// Fails on the first label that repeats; facets and grouping keys are
/// keyed by label.
pub fn check_unique_labels(periods: &[Period]) -> Result<()> {
    let mut seen = BTreeSet::new();
    for period in periods {
        if !seen.insert(period.label.as_str()) {
            return Err(PipelineError::DuplicatePeriod(period.label.clone()));
        }
    }
    Ok(())
}

/// Human readable span covering all periods, e.g. "July 7-27".
pub fn window_label(periods: &[Period]) -> String {
    let (Some(start), Some(end)) = (
        periods.iter().map(|p| p.start).min(),
        periods.iter().map(|p| p.end).max(),
    ) else {
        return String::new();
    };

    if start == end {
        format!("{} {}", start.format("%B"), start.day())
    } else if start.year() != end.year() {
        format!(
            "{} {}, {}-{} {}, {}",
            start.format("%B"),
            start.day(),
            start.year(),
            end.format("%B"),
            end.day(),
            end.year()
        )
    } else if start.month() != end.month() {
        format!(
            "{} {}-{} {}",
            start.format("%B"),
            start.day(),
            end.format("%B"),
            end.day()
        )
    } else {
        format!("{} {}-{}", start.format("%B"), start.day(), end.day())
    }
}

// RGB colour written as #RRGGBB in the style file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct HexColor(pub u8, pub u8, pub u8);

impl TryFrom<String> for HexColor {
    type Error = PipelineError;

    fn try_from(value: String) -> Result<Self> {
        let invalid = || PipelineError::InvalidColor(value.clone());
        let hex = value.strip_prefix('#').ok_or_else(invalid)?;
        if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(invalid());
        }
        let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| invalid());
        Ok(HexColor(channel(0)?, channel(2)?, channel(4)?))
    }
}

impl From<HexColor> for String {
    fn from(color: HexColor) -> Self {
        color.to_string()
    }
}

impl fmt::Display for HexColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02X}{:02X}{:02X}", self.0, self.1, self.2)
    }
}

/// Manual scales for every visual channel of the figure.
///
/// Unknown fields in a style file are rejected; missing ones fall back to
/// the compiled-in defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StyleConfig {
    pub topic_order: Vec<String>,
    pub topic_colors: BTreeMap<String, HexColor>,
    pub na_color: HexColor,
    pub precipitation_sizes: BTreeMap<PrecipCategory, f64>,
    // Pixels per unit of marker size
    pub point_scale_px: f64,
    pub point_color: HexColor,
    pub exceedance_color: HexColor,
    pub stream_color: HexColor,
    pub river_alpha: f64,
    pub basin_color: HexColor,
    pub city_color: HexColor,
    pub border_color: HexColor,
}

impl Default for StyleConfig {
    fn default() -> Self {
        let topics = [
            ("Flood damage", HexColor(0x66, 0xC2, 0xA5)),
            ("Rescue operations", HexColor(0xFC, 0x8D, 0x62)),
            ("Weather warnings", HexColor(0x8D, 0xA0, 0xCB)),
            ("Donations and help", HexColor(0xE7, 0x8A, 0xC3)),
            ("Infrastructure", HexColor(0xA6, 0xD8, 0x54)),
            ("Politics", HexColor(0xFF, 0xD9, 0x2F)),
            ("Climate change", HexColor(0xE5, 0xC4, 0x94)),
            ("Other", HexColor(0x66, 0x66, 0x99)),
        ];

        StyleConfig {
            topic_order: topics.iter().map(|(t, _)| t.to_string()).collect(),
            topic_colors: topics.iter().map(|(t, c)| (t.to_string(), *c)).collect(),
            na_color: HexColor(0xBD, 0xBD, 0xBD),
            precipitation_sizes: BTreeMap::from([
                (PrecipCategory::VeryLow, 0.2),
                (PrecipCategory::Low, 0.5),
                (PrecipCategory::Medium, 0.75),
                (PrecipCategory::High, 1.0),
                (PrecipCategory::VeryHigh, 1.5),
            ]),
            point_scale_px: 8.0,
            point_color: HexColor(0x08, 0x30, 0x6B),
            exceedance_color: HexColor(0xD7, 0x30, 0x27),
            stream_color: HexColor(0x31, 0x82, 0xBD),
            river_alpha: 0.7,
            basin_color: HexColor(0x25, 0x25, 0x25),
            city_color: HexColor(0x00, 0x00, 0x00),
            border_color: HexColor(0xFF, 0xFF, 0xFF),
        }
    }
}

impl StyleConfig {
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    // Checks that every level found in the data has a visual mapping
    pub fn validate<'a>(
        &self,
        topics: impl IntoIterator<Item = &'a str>,
        categories: impl IntoIterator<Item = PrecipCategory>,
    ) -> Result<()> {
        for topic in topics {
            if !self.topic_colors.contains_key(topic) || !self.topic_order.iter().any(|t| t == topic)
            {
                return Err(PipelineError::UnmappedTopic(topic.to_string()));
            }
        }
        for category in categories {
            if !self.precipitation_sizes.contains_key(&category) {
                return Err(PipelineError::UnmappedPrecipitation(category.to_string()));
            }
        }
        Ok(())
    }

    // Position of a topic in the display order, unknown topics sort last
    pub fn topic_rank(&self, topic: &str) -> usize {
        self.topic_order
            .iter()
            .position(|t| t == topic)
            .unwrap_or(self.topic_order.len())
    }

    pub fn topic_color(&self, topic: Option<&str>) -> HexColor {
        topic
            .and_then(|t| self.topic_colors.get(t))
            .copied()
            .unwrap_or(self.na_color)
    }

    pub fn marker_size(&self, category: PrecipCategory) -> Option<f64> {
        self.precipitation_sizes.get(&category).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_period_parse() {
        let period: Period = "Overall=2021-07-07..2021-07-27".parse().unwrap();
        assert_eq!(period, Period::default());
        assert!(period.contains(NaiveDate::from_ymd_opt(2021, 7, 7).unwrap()));
        assert!(period.contains(NaiveDate::from_ymd_opt(2021, 7, 27).unwrap()));
        assert!(!period.contains(NaiveDate::from_ymd_opt(2021, 7, 28).unwrap()));
    }

    #[test]
    fn test_period_parse_rejects_bad_input() {
        assert!("Overall".parse::<Period>().is_err());
        assert!("=2021-07-07..2021-07-27".parse::<Period>().is_err());
        assert!("Late=2021-07-27..2021-07-07".parse::<Period>().is_err());
        assert!("Late=2021-07-07-2021-07-27".parse::<Period>().is_err());
    }

    #[test]
    fn test_check_unique_labels() {
        let early: Period = "Early=2021-07-07..2021-07-14".parse().unwrap();
        let late: Period = "Late=2021-07-15..2021-07-27".parse().unwrap();
        assert!(check_unique_labels(&[early.clone(), late]).is_ok());

        let again: Period = "Early=2021-07-10..2021-07-27".parse().unwrap();
        let err = check_unique_labels(&[early, again]).unwrap_err();
        assert!(matches!(err, PipelineError::DuplicatePeriod(ref l) if l == "Early"));
    }

    #[test]
    fn test_window_label() {
        assert_eq!(window_label(&[Period::default()]), "July 7-27");
        let split: Vec<Period> = vec![
            "A=2021-06-30..2021-07-03".parse().unwrap(),
            "B=2021-07-04..2021-07-05".parse().unwrap(),
        ];
        assert_eq!(window_label(&split), "June 30-July 5");
        assert_eq!(window_label(&[]), "");
    }

    #[test]
    fn test_output_format_from_path() {
        assert_eq!(
            OutputFormat::from_path(Path::new("map.PNG")).unwrap(),
            OutputFormat::Png
        );
        assert_eq!(
            OutputFormat::from_path(Path::new("out/map.svg")).unwrap(),
            OutputFormat::Svg
        );
        assert!(OutputFormat::from_path(Path::new("map.pdf")).is_err());
    }

    #[test]
    fn test_hex_color() {
        let color = HexColor::try_from("#1a2B3c".to_string()).unwrap();
        assert_eq!(color, HexColor(0x1A, 0x2B, 0x3C));
        assert_eq!(color.to_string(), "#1A2B3C");
        assert!(HexColor::try_from("1A2B3C".to_string()).is_err());
        assert!(HexColor::try_from("#1A2B".to_string()).is_err());
        // from_str_radix alone would take the signs
        assert!(HexColor::try_from("#+1+2+3".to_string()).is_err());
        assert!(HexColor::try_from("#1A2B3G".to_string()).is_err());
    }

    #[test]
    fn test_style_json_override() {
        let json = r##"{
            "topic_order": ["Rain", "Help"],
            "topic_colors": {"Rain": "#0000FF", "Help": "#00FF00"},
            "precipitation_sizes": {"Very_low": 0.1, "Low": 0.2, "Medium": 0.3, "High": 0.4, "Very_high": 0.5}
        }"##;
        let style: StyleConfig = serde_json::from_str(json).unwrap();
        assert_eq!(style.topic_rank("Help"), 1);
        assert_eq!(style.topic_rank("Unknown"), 2);
        assert_eq!(style.marker_size(PrecipCategory::High), Some(0.4));
        // untouched fields keep their defaults
        assert_eq!(style.na_color, StyleConfig::default().na_color);
    }

    #[test]
    fn test_validate_flags_unmapped_levels() {
        let style = StyleConfig::default();
        assert!(style.validate(["Flood damage"], [PrecipCategory::High]).is_ok());
        assert!(matches!(
            style.validate(["Aliens"], []),
            Err(PipelineError::UnmappedTopic(t)) if t == "Aliens"
        ));

        let mut sparse = StyleConfig::default();
        sparse.precipitation_sizes.remove(&PrecipCategory::VeryHigh);
        assert!(matches!(
            sparse.validate([], [PrecipCategory::VeryHigh]),
            Err(PipelineError::UnmappedPrecipitation(_))
        ));
    }

    #[test]
    fn test_topic_color_falls_back_to_na() {
        let style = StyleConfig::default();
        assert_eq!(style.topic_color(None), style.na_color);
        assert_eq!(
            style.topic_color(Some("Politics")),
            HexColor(0xFF, 0xD9, 0x2F)
        );
    }
}
