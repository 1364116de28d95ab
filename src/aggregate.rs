use crate::config::Period;
use crate::observation::{Observation, WatershedId};
use chrono::NaiveDate;
use log::{debug, warn};
use std::collections::{BTreeSet, HashMap};

// Topic count for one watershed within one period
#[derive(Debug, Clone, PartialEq)]
pub struct PeriodAggregate {
    pub watershed_id: WatershedId,
    pub period: String,
    pub topic: String,
    pub count: usize,
    // Earliest in-window date the topic was seen
    pub first_date: NaiveDate,
}

// Most frequent topic for one watershed within one period
#[derive(Debug, Clone, PartialEq)]
pub struct DominantTopic {
    pub watershed_id: WatershedId,
    pub period: String,
    pub topic: String,
    pub count: usize,
    pub representative_date: NaiveDate,
}

/// (watershed, period) pairs that have at least one in-window observation,
/// whether or not the observation carries a topic.
pub fn assign_periods(
    observations: &[Observation],
    periods: &[Period],
) -> BTreeSet<(WatershedId, String)> {
    periods
        .iter()
        .flat_map(|period| {
            observations
                .iter()
                .filter(|o| period.contains(o.date))
                .map(|o| (o.watershed_id, period.label.clone()))
        })
        .collect()
}

/// Counts topic mentions per (watershed, period, topic).
///
/// Observations without a topic or outside every period are dropped. Groups
/// are emitted period by period, in order of first appearance in
/// `observations`, and each key occurs exactly once.
pub fn aggregate_topics(observations: &[Observation], periods: &[Period]) -> Vec<PeriodAggregate> {
    let mut aggregates: Vec<PeriodAggregate> = Vec::new();

    for period in periods {
        let mut index: HashMap<(WatershedId, &str), usize> = HashMap::new();
        let before = aggregates.len();

        for obs in observations.iter().filter(|o| period.contains(o.date)) {
            let Some(topic) = obs.topic.as_deref() else {
                continue;
            };

            match index.get(&(obs.watershed_id, topic)) {
                Some(&i) => {
                    let agg = &mut aggregates[i];
                    agg.count += 1;
                    agg.first_date = agg.first_date.min(obs.date);
                }
                None => {
                    index.insert((obs.watershed_id, topic), aggregates.len());
                    aggregates.push(PeriodAggregate {
                        watershed_id: obs.watershed_id,
                        period: period.label.clone(),
                        topic: topic.to_string(),
                        count: 1,
                        first_date: obs.date,
                    });
                }
            }
        }

        let groups = aggregates.len() - before;
        if groups == 0 {
            warn!(
                "No topic observations in period {} ({} to {})",
                period.label, period.start, period.end
            );
        } else {
            debug!("Period {}: {} topic groups", period.label, groups);
        }
    }

    aggregates
}

/// Picks the topic with the highest count for every (watershed, period).
///
/// Ties go to the topic that appears first in `aggregates`, which for the
/// output of [`aggregate_topics`] is the topic mentioned first in the
/// observation table.
pub fn select_dominant(aggregates: &[PeriodAggregate]) -> Vec<DominantTopic> {
    let mut dominant: Vec<DominantTopic> = Vec::new();
    let mut index: HashMap<(WatershedId, &str), usize> = HashMap::new();

    for agg in aggregates {
        let key = (agg.watershed_id, agg.period.as_str());
        match index.get(&key) {
            Some(&i) => {
                // strictly greater keeps the earlier topic on ties
                if agg.count > dominant[i].count {
                    dominant[i].topic = agg.topic.clone();
                    dominant[i].count = agg.count;
                    dominant[i].representative_date = agg.first_date;
                }
            }
            None => {
                index.insert(key, dominant.len());
                dominant.push(DominantTopic {
                    watershed_id: agg.watershed_id,
                    period: agg.period.clone(),
                    topic: agg.topic.clone(),
                    count: agg.count,
                    representative_date: agg.first_date,
                });
            }
        }
    }

    dominant
}
