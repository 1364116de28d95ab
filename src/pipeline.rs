use crate::aggregate::{DominantTopic, aggregate_topics, assign_periods, select_dominant};
use crate::config::{Period, StyleConfig, check_unique_labels};
use crate::error::Result;
use crate::observation::{Observation, WatershedId};
use crate::precipitation::{PrecipitationSummary, extract_precipitation};
use log::info;
use std::collections::BTreeSet;

// Derived tables of one run, ready to be joined onto geometry
#[derive(Debug)]
pub struct Summaries {
    pub assignments: BTreeSet<(WatershedId, String)>,
    pub dominant: Vec<DominantTopic>,
    pub precipitation: Vec<PrecipitationSummary>,
}

/// Runs the tabular stages: period assignment, topic aggregation, dominant
/// topic selection and precipitation extraction. Fails when a topic or
/// precipitation level in the result has no mapping in `style`, or when two
/// periods share a label.
pub fn summarize(
    observations: &[Observation],
    periods: &[Period],
    style: &StyleConfig,
) -> Result<Summaries> {
    check_unique_labels(periods)?;
    let assignments = assign_periods(observations, periods);
    let aggregates = aggregate_topics(observations, periods);
    let dominant = select_dominant(&aggregates);
    let precipitation = extract_precipitation(observations, periods)?;

    style.validate(
        dominant.iter().map(|d| d.topic.as_str()),
        precipitation.iter().map(|p| p.category),
    )?;

    info!(
        "{} watershed/period pairs in window, {} topic groups, {} dominant topics, {} precipitation rows",
        assignments.len(),
        aggregates.len(),
        dominant.len(),
        precipitation.len()
    );

    Ok(Summaries {
        assignments,
        dominant,
        precipitation,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HexColor;
    use crate::error::PipelineError;
    use crate::join::{TopicLabel, join_topics, precipitation_centroids};
    use crate::layers::Watershed;
    use chrono::NaiveDate;
    use geo::{MultiPolygon, Point, polygon};

    fn obs(id: WatershedId, day: u32, topic: Option<&str>, precipitation: &str) -> Observation {
        Observation {
            watershed_id: id,
            date: NaiveDate::from_ymd_opt(2021, 7, day).unwrap(),
            topic: topic.map(str::to_string),
            precipitation: precipitation.to_string(),
        }
    }

    fn square(id: WatershedId, x: f64) -> Watershed {
        Watershed {
            id,
            geometry: MultiPolygon(vec![polygon![
                (x: x, y: 50.0),
                (x: x + 1.0, y: 50.0),
                (x: x + 1.0, y: 51.0),
                (x: x, y: 51.0),
            ]]),
        }
    }

    fn style_ab() -> StyleConfig {
        let mut style = StyleConfig::default();
        style.topic_order = vec!["A".to_string(), "B".to_string()];
        style.topic_colors = [
            ("A".to_string(), HexColor(255, 0, 0)),
            ("B".to_string(), HexColor(0, 0, 255)),
        ]
        .into();
        style
    }

    #[test]
    fn test_single_watershed_end_to_end() {
        let observations = vec![
            obs(1, 10, Some("A"), "2_High"),
            obs(1, 11, Some("B"), "2_High"),
            obs(1, 12, Some("A"), "2_High"),
            obs(1, 13, Some("A"), "2_High"),
        ];
        let watersheds = vec![square(1, 7.0)];
        let style = style_ab();
        let periods = [Period::default()];

        let summaries = summarize(&observations, &periods, &style).unwrap();
        let features = join_topics(
            &watersheds,
            &summaries.assignments,
            &summaries.dominant,
            &style,
        );
        assert_eq!(features.len(), 1);
        assert_eq!(features[0].topic, TopicLabel::Topic("A".to_string()));

        let points = precipitation_centroids(&watersheds, &summaries.precipitation);
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].location, Point::new(7.5, 50.5));
        assert_eq!(style.marker_size(points[0].category), Some(1.0));
    }

    #[test]
    fn test_watershed_without_window_observations_is_excluded() {
        let observations = vec![
            obs(1, 10, Some("A"), "2_High"),
            // only before the window
            obs(2, 1, Some("B"), "1_Low"),
            // in window without topic
            obs(3, 15, None, "1_Low"),
        ];
        let watersheds = vec![square(1, 0.0), square(2, 2.0), square(3, 4.0)];
        let style = style_ab();

        let summaries = summarize(&observations, &[Period::default()], &style).unwrap();
        let features = join_topics(
            &watersheds,
            &summaries.assignments,
            &summaries.dominant,
            &style,
        );

        let ids: Vec<_> = features.iter().map(|f| f.watershed_id).collect();
        assert_eq!(ids, vec![1, 3]);
        assert_eq!(features[1].topic, TopicLabel::NotAvailable);

        let points = precipitation_centroids(&watersheds, &summaries.precipitation);
        assert!(points.iter().all(|p| p.watershed_id != 2));
    }

    #[test]
    fn test_unmapped_topic_is_fatal() {
        let observations = vec![obs(1, 10, Some("Z"), "2_High")];
        let err = summarize(&observations, &[Period::default()], &style_ab()).unwrap_err();
        assert!(matches!(err, PipelineError::UnmappedTopic(t) if t == "Z"));
    }

    #[test]
    fn test_empty_window_is_not_fatal() {
        let observations = vec![obs(1, 1, Some("A"), "2_High")];
        let summaries = summarize(&observations, &[Period::default()], &style_ab()).unwrap();
        assert!(summaries.assignments.is_empty());
        assert!(summaries.dominant.is_empty());
        assert!(summaries.precipitation.is_empty());
    }

    #[test]
    fn test_repeated_period_label_is_fatal() {
        let observations = vec![obs(1, 12, Some("A"), "2_High")];
        let periods: Vec<Period> = vec![
            "A=2021-07-07..2021-07-20".parse().unwrap(),
            "A=2021-07-10..2021-07-27".parse().unwrap(),
        ];
        let err = summarize(&observations, &periods, &style_ab()).unwrap_err();
        assert!(matches!(err, PipelineError::DuplicatePeriod(l) if l == "A"));
    }
}
