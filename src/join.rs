use crate::aggregate::DominantTopic;
use crate::config::StyleConfig;
use crate::layers::Watershed;
use crate::observation::{Observation, WatershedId};
use crate::precipitation::{PrecipCategory, PrecipitationSummary};
use geo::{Centroid, MultiPolygon, Point};
use log::{debug, warn};
use std::collections::{BTreeSet, HashMap};
use std::fmt;

// Fill category of a watershed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TopicLabel {
    Topic(String),
    NotAvailable,
}

impl TopicLabel {
    pub fn as_topic(&self) -> Option<&str> {
        match self {
            TopicLabel::Topic(t) => Some(t),
            TopicLabel::NotAvailable => None,
        }
    }
}

impl fmt::Display for TopicLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TopicLabel::Topic(t) => f.write_str(t),
            TopicLabel::NotAvailable => f.write_str("N/A"),
        }
    }
}

// Watershed polygon with its dominant topic for one period
#[derive(Debug, Clone)]
pub struct MapFeature<'a> {
    pub watershed_id: WatershedId,
    pub period: String,
    pub geometry: &'a MultiPolygon<f64>,
    pub topic: TopicLabel,
}

// Centroid marker carrying one precipitation category
#[derive(Debug, Clone, PartialEq)]
pub struct PrecipitationPoint {
    pub watershed_id: WatershedId,
    pub period: String,
    pub location: Point<f64>,
    pub category: PrecipCategory,
}

/// Joins dominant topics onto watershed polygons.
///
/// One feature is produced per watershed and assigned period. Watersheds
/// without any assigned period are left out entirely; assigned watersheds
/// without a dominant topic get [`TopicLabel::NotAvailable`]. The result is
/// ordered by the style's topic order with N/A last.
pub fn join_topics<'a>(
    watersheds: &'a [Watershed],
    assignments: &BTreeSet<(WatershedId, String)>,
    dominant: &[DominantTopic],
    style: &StyleConfig,
) -> Vec<MapFeature<'a>> {
    let dominant_by_key: HashMap<(WatershedId, &str), &str> = dominant
        .iter()
        .map(|d| ((d.watershed_id, d.period.as_str()), d.topic.as_str()))
        .collect();

    let mut periods_by_id: HashMap<WatershedId, Vec<&str>> = HashMap::new();
    for (id, period) in assignments {
        periods_by_id.entry(*id).or_default().push(period);
    }

    let mut features = Vec::new();
    for watershed in watersheds {
        let Some(periods) = periods_by_id.get(&watershed.id) else {
            debug!("Watershed {} has no assigned period, dropped", watershed.id);
            continue;
        };
        for period in periods {
            let topic = match dominant_by_key.get(&(watershed.id, *period)) {
                Some(t) => TopicLabel::Topic(t.to_string()),
                None => TopicLabel::NotAvailable,
            };
            features.push(MapFeature {
                watershed_id: watershed.id,
                period: period.to_string(),
                geometry: &watershed.geometry,
                topic,
            });
        }
    }

    features.sort_by_key(|f| match f.topic.as_topic() {
        Some(t) => style.topic_rank(t),
        None => usize::MAX,
    });
    features
}

/// Reduces each watershed with a precipitation summary to centroid points,
/// one per summary row. Fan-out rows share the same location.
pub fn precipitation_centroids(
    watersheds: &[Watershed],
    summaries: &[PrecipitationSummary],
) -> Vec<PrecipitationPoint> {
    let mut by_id: HashMap<WatershedId, Vec<&PrecipitationSummary>> = HashMap::new();
    for summary in summaries {
        by_id.entry(summary.watershed_id).or_default().push(summary);
    }

    let mut points = Vec::new();
    for watershed in watersheds {
        let Some(rows) = by_id.get(&watershed.id) else {
            continue;
        };
        let Some(centroid) = watershed.geometry.centroid() else {
            warn!(
                "Watershed {} has a degenerate polygon, no precipitation marker",
                watershed.id
            );
            continue;
        };
        points.extend(rows.iter().map(|s| PrecipitationPoint {
            watershed_id: watershed.id,
            period: s.period.clone(),
            location: centroid,
            category: s.category,
        }));
    }
    points
}

// Ids that only one side of the join knows about
#[derive(Debug, Default, PartialEq)]
pub struct JoinReport {
    pub observed_without_geometry: BTreeSet<WatershedId>,
    pub geometry_without_observations: BTreeSet<WatershedId>,
    // Ids carried by more than one watershed feature
    pub duplicate_geometry_ids: BTreeSet<WatershedId>,
}

impl JoinReport {
    pub fn new(observations: &[Observation], watersheds: &[Watershed]) -> Self {
        let observed: BTreeSet<WatershedId> = observations.iter().map(|o| o.watershed_id).collect();
        let mut mapped = BTreeSet::new();
        let mut duplicate_geometry_ids = BTreeSet::new();
        for watershed in watersheds {
            if !mapped.insert(watershed.id) {
                duplicate_geometry_ids.insert(watershed.id);
            }
        }

        JoinReport {
            observed_without_geometry: observed.difference(&mapped).copied().collect(),
            geometry_without_observations: mapped.difference(&observed).copied().collect(),
            duplicate_geometry_ids,
        }
    }

    pub fn is_clean(&self) -> bool {
        self.observed_without_geometry.is_empty()
            && self.geometry_without_observations.is_empty()
            && self.duplicate_geometry_ids.is_empty()
    }

    pub fn log(&self) {
        if self.is_clean() {
            debug!("Every observed watershed id has a geometry and vice versa");
            return;
        }
        if !self.observed_without_geometry.is_empty() {
            warn!(
                "{} watershed ids in observations have no geometry: {:?}",
                self.observed_without_geometry.len(),
                self.observed_without_geometry
            );
        }
        if !self.geometry_without_observations.is_empty() {
            warn!(
                "{} watersheds have no observations and will not be drawn",
                self.geometry_without_observations.len()
            );
        }
        if !self.duplicate_geometry_ids.is_empty() {
            warn!(
                "{} watershed ids appear on more than one feature and will be drawn repeatedly: {:?}",
                self.duplicate_geometry_ids.len(),
                self.duplicate_geometry_ids
            );
        }
    }
}
