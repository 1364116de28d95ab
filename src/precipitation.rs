use crate::config::Period;
use crate::error::{PipelineError, Result};
use crate::observation::{Observation, WatershedId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Ordinal rainfall intensity bucket, ordered low to high.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum PrecipCategory {
    #[serde(rename = "Very_low")]
    VeryLow,
    #[serde(rename = "Low")]
    Low,
    #[serde(rename = "Medium")]
    Medium,
    #[serde(rename = "High")]
    High,
    #[serde(rename = "Very_high")]
    VeryHigh,
}

impl PrecipCategory {
    pub const ALL: [PrecipCategory; 5] = [
        PrecipCategory::VeryLow,
        PrecipCategory::Low,
        PrecipCategory::Medium,
        PrecipCategory::High,
        PrecipCategory::VeryHigh,
    ];

    // Legend order, highest magnitude first
    pub fn legend_order() -> impl Iterator<Item = PrecipCategory> {
        Self::ALL.into_iter().rev()
    }

    pub fn label(&self) -> &'static str {
        match self {
            PrecipCategory::VeryLow => "Very_low",
            PrecipCategory::Low => "Low",
            PrecipCategory::Medium => "Medium",
            PrecipCategory::High => "High",
            PrecipCategory::VeryHigh => "Very_high",
        }
    }
}

impl fmt::Display for PrecipCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// Accepts both raw ("3_Medium") and stripped ("Medium") labels
impl FromStr for PrecipCategory {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self> {
        let label = strip_numeric_prefix(s.trim());
        PrecipCategory::ALL
            .into_iter()
            .find(|c| c.label() == label)
            .ok_or_else(|| PipelineError::UnknownPrecipitation(s.to_string()))
    }
}

/// Removes a leading `<digits>_` prefix. Labels without one are returned unchanged.
pub fn strip_numeric_prefix(label: &str) -> &str {
    let rest = label.trim_start_matches(|c: char| c.is_ascii_digit());
    if rest.len() == label.len() {
        return label;
    }
    rest.strip_prefix('_').unwrap_or(label)
}

// Distinct precipitation category for one watershed and period
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct PrecipitationSummary {
    pub watershed_id: WatershedId,
    pub period: String,
    pub category: PrecipCategory,
}

/// Distinct (watershed, period, category) rows over in-window observations.
///
/// Several categories for the same watershed and period are all kept. The
/// result is sorted so it does not depend on input row order.
pub fn extract_precipitation(
    observations: &[Observation],
    periods: &[Period],
) -> Result<Vec<PrecipitationSummary>> {
    let mut distinct = BTreeSet::new();

    for period in periods {
        for obs in observations.iter().filter(|o| period.contains(o.date)) {
            let category: PrecipCategory = obs.precipitation.parse()?;
            distinct.insert(PrecipitationSummary {
                watershed_id: obs.watershed_id,
                period: period.label.clone(),
                category,
            });
        }
    }

    Ok(distinct.into_iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn obs(id: WatershedId, day: u32, precipitation: &str) -> Observation {
        Observation {
            watershed_id: id,
            date: NaiveDate::from_ymd_opt(2021, 7, day).unwrap(),
            topic: None,
            precipitation: precipitation.to_string(),
        }
    }

    #[test]
    fn test_strip_numeric_prefix() {
        assert_eq!(strip_numeric_prefix("5_Medium"), "Medium");
        assert_eq!(strip_numeric_prefix("12_Very_high"), "Very_high");
        assert_eq!(strip_numeric_prefix("Very_low"), "Very_low");
        // digits without underscore are not a prefix
        assert_eq!(strip_numeric_prefix("5Medium"), "5Medium");
        assert_eq!(strip_numeric_prefix(""), "");
    }

    #[test]
    fn test_strip_is_idempotent() {
        for label in ["1_Very_low", "2_High", "Medium", "99_Low", "_Low"] {
            let once = strip_numeric_prefix(label);
            assert_eq!(strip_numeric_prefix(once), once);
        }
    }

    #[test]
    fn test_parse_category() {
        assert_eq!("2_High".parse::<PrecipCategory>().unwrap(), PrecipCategory::High);
        assert_eq!(
            "Very_low".parse::<PrecipCategory>().unwrap(),
            PrecipCategory::VeryLow
        );
        assert!(matches!(
            "3_Moderate".parse::<PrecipCategory>(),
            Err(PipelineError::UnknownPrecipitation(_))
        ));
    }

    #[test]
    fn test_category_ordering() {
        assert!(PrecipCategory::VeryLow < PrecipCategory::Low);
        assert!(PrecipCategory::Low < PrecipCategory::Medium);
        assert!(PrecipCategory::Medium < PrecipCategory::High);
        assert!(PrecipCategory::High < PrecipCategory::VeryHigh);

        let legend: Vec<_> = PrecipCategory::legend_order().collect();
        assert_eq!(legend.first(), Some(&PrecipCategory::VeryHigh));
        assert_eq!(legend.last(), Some(&PrecipCategory::VeryLow));
    }

    #[test]
    fn test_extract_is_order_independent() {
        let rows = vec![
            obs(1, 10, "5_Very_high"),
            obs(1, 11, "1_Very_low"),
            obs(1, 12, "3_Medium"),
            obs(1, 13, "2_Low"),
            obs(1, 14, "4_High"),
        ];
        let expected: Vec<PrecipCategory> = PrecipCategory::ALL.to_vec();
        let periods = [Period::default()];

        let mut orders = Vec::new();
        permutations(&mut rows.clone(), rows.len(), &mut orders);
        assert_eq!(orders.len(), 120);
        for order in &orders {
            let cats: Vec<_> = extract_precipitation(order, &periods)
                .unwrap()
                .into_iter()
                .map(|s| s.category)
                .collect();
            assert_eq!(cats, expected);
        }
    }

    // Heap's algorithm
    fn permutations(rows: &mut [Observation], k: usize, out: &mut Vec<Vec<Observation>>) {
        if k <= 1 {
            out.push(rows.to_vec());
            return;
        }
        for i in 0..k - 1 {
            permutations(rows, k - 1, out);
            if k % 2 == 0 {
                rows.swap(i, k - 1);
            } else {
                rows.swap(0, k - 1);
            }
        }
        permutations(rows, k - 1, out);
    }

    #[test]
    fn test_extract_distinct_and_fan_out() {
        let rows = vec![
            obs(1, 10, "2_High"),
            obs(1, 11, "2_High"),
            obs(1, 12, "1_Low"),
            obs(2, 12, "1_Low"),
            // outside the window
            obs(3, 30, "1_Low"),
        ];
        let summaries = extract_precipitation(&rows, &[Period::default()]).unwrap();
        assert_eq!(summaries.len(), 3);
        assert_eq!(
            summaries
                .iter()
                .filter(|s| s.watershed_id == 1)
                .map(|s| s.category)
                .collect::<Vec<_>>(),
            vec![PrecipCategory::Low, PrecipCategory::High]
        );
        assert!(summaries.iter().all(|s| s.watershed_id != 3));
    }
}
