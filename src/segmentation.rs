//! User segmentation
//!
//! Builds one longitudinal metric vector per subject, standardizes the feature
//! columns and partitions subjects with seeded k-means. Each cluster is then
//! summarized and labelled from its mean mood and stress.

use crate::config::ClusteringConfig;
use crate::error::ComputeError;
use crate::model::{KMeans, StandardScaler};
use crate::stats::{mean, round2, sample_std};
use crate::types::{
    ClusterSummary, EmotionalRecord, Metric, NormalizedDataset, Segmentation, TrendDirection,
    User, UserMetricVector, UserSegment, WeeklyTrend,
};
use chrono::NaiveDate;
use std::collections::BTreeMap;
use tracing::debug;

/// Mood at or above this value counts toward a wellbeing streak
pub const STREAK_MOOD_THRESHOLD: f64 = 7.0;

/// Length in days of each window compared by the weekly trend
pub const TREND_WINDOW_DAYS: i64 = 7;

/// Clusters subjects by their wellbeing profile
pub struct SegmentationEngine;

impl SegmentationEngine {
    /// Segment every subject that has at least one record
    pub fn segment(
        dataset: &NormalizedDataset,
        config: &ClusteringConfig,
        seed: u64,
    ) -> Result<Segmentation, ComputeError> {
        let profiles: Vec<(&User, Vec<&EmotionalRecord>)> = dataset
            .subjects
            .iter()
            .map(|user| (user, dataset.records_for(&user.id).collect::<Vec<_>>()))
            .filter(|(_, records)| !records.is_empty())
            .collect();

        if profiles.is_empty() {
            return Err(ComputeError::InsufficientData(
                "no subject has any records".to_string(),
            ));
        }
        let as_of = dataset
            .records
            .iter()
            .map(|r| r.date)
            .max()
            .ok_or_else(|| ComputeError::InsufficientData("no records to segment".to_string()))?;

        let vectors: Vec<UserMetricVector> = profiles
            .iter()
            .map(|(_, records)| metric_vector(records))
            .collect();
        let features: Vec<Vec<f64>> = vectors.iter().map(UserMetricVector::features).collect();

        let scaler = StandardScaler.fit(&features)?;
        let scaled = scaler.transform(&features);

        let kmeans = KMeans::from_config(config, seed);
        let model = kmeans.fit(&scaled)?;
        let labels = compact_labels(&model.labels);
        debug!(
            subjects = profiles.len(),
            requested = config.n_clusters,
            clusters = model.n_clusters(),
            inertia = model.inertia,
            "segmented subjects"
        );

        let users: Vec<UserSegment> = profiles
            .iter()
            .zip(vectors)
            .zip(&labels)
            .map(|(((user, records), metrics), &cluster)| UserSegment {
                user_id: user.id.clone(),
                profession: user.profession.clone(),
                record_count: records.len(),
                metrics,
                wellbeing_streak: wellbeing_streak(records),
                weekly_trend: weekly_trend(records, as_of),
                cluster,
            })
            .collect();

        let clusters = summarize_clusters(&users);
        Ok(Segmentation { users, clusters })
    }
}

/// Qualitative label for a cluster's mean mood and stress (first match wins)
pub fn interpret_cluster(avg_mood: f64, avg_stress: f64) -> &'static str {
    if avg_mood >= 7.0 && avg_stress <= 4.0 {
        "High Wellbeing"
    } else if avg_mood >= 6.0 && avg_stress <= 6.0 {
        "Moderate Wellbeing"
    } else if avg_mood <= 5.0 && avg_stress >= 6.0 {
        "High Risk"
    } else {
        "Variable Wellbeing"
    }
}

/// Number of most-recent consecutive records with a high mood
///
/// Expects records in date order; a missing mood ends the streak.
pub fn wellbeing_streak(records: &[&EmotionalRecord]) -> u32 {
    records
        .iter()
        .rev()
        .take_while(|r| r.mood.is_some_and(|m| m >= STREAK_MOOD_THRESHOLD))
        .count() as u32
}

/// Week-over-week change in mean mood, counted back from `as_of`
///
/// The current window holds the `TREND_WINDOW_DAYS` ending at `as_of`, the
/// previous window the same span before it. An empty current window counts
/// as a mean of zero; an empty previous window yields no trend.
pub fn weekly_trend(records: &[&EmotionalRecord], as_of: NaiveDate) -> WeeklyTrend {
    let mut current = Vec::new();
    let mut previous = Vec::new();
    for record in records {
        let Some(mood) = record.mood else { continue };
        let age = (as_of - record.date).num_days();
        if (0..TREND_WINDOW_DAYS).contains(&age) {
            current.push(mood);
        } else if (TREND_WINDOW_DAYS..2 * TREND_WINDOW_DAYS).contains(&age) {
            previous.push(mood);
        }
    }

    let Some(prior) = mean(&previous).filter(|m| *m > 0.0) else {
        return WeeklyTrend::default();
    };
    let progress = (mean(&current).unwrap_or(0.0) - prior) / prior * 100.0;
    let direction = if progress >= 0.0 {
        TrendDirection::Improving
    } else {
        TrendDirection::Worsening
    };

    WeeklyTrend {
        // Half-way values round up
        progress_pct: Some((progress + 0.5).floor() as i64),
        direction: Some(direction),
    }
}

fn metric_vector(records: &[&EmotionalRecord]) -> UserMetricVector {
    let stats = |metric: Metric| {
        let values: Vec<f64> = records.iter().filter_map(|r| r.score(metric)).collect();
        (
            round2(mean(&values).unwrap_or(0.0)),
            round2(sample_std(&values).unwrap_or(0.0)),
        )
    };

    let (mood_mean, mood_std) = stats(Metric::Mood);
    let (stress_mean, stress_std) = stats(Metric::Stress);
    let (energy_mean, energy_std) = stats(Metric::Energy);
    let (sleep_mean, sleep_std) = stats(Metric::Sleep);

    UserMetricVector {
        mood_mean,
        mood_std,
        stress_mean,
        stress_std,
        energy_mean,
        energy_std,
        sleep_mean,
        sleep_std,
    }
}

/// Renumber labels to 0..k in order of first appearance
fn compact_labels(labels: &[usize]) -> Vec<usize> {
    let mut mapping: BTreeMap<usize, usize> = BTreeMap::new();
    labels
        .iter()
        .map(|&label| {
            let next = mapping.len();
            *mapping.entry(label).or_insert(next)
        })
        .collect()
}

fn summarize_clusters(users: &[UserSegment]) -> BTreeMap<String, ClusterSummary> {
    let mut members: BTreeMap<usize, Vec<&UserSegment>> = BTreeMap::new();
    for user in users {
        members.entry(user.cluster).or_default().push(user);
    }

    members
        .into_iter()
        .map(|(cluster, group)| {
            let moods: Vec<f64> = group.iter().map(|u| u.metrics.mood_mean).collect();
            let stresses: Vec<f64> = group.iter().map(|u| u.metrics.stress_mean).collect();
            let avg_mood = mean(&moods).unwrap_or(0.0);
            let avg_stress = mean(&stresses).unwrap_or(0.0);

            let summary = ClusterSummary {
                size: group.len(),
                avg_mood: round2(avg_mood),
                avg_stress: round2(avg_stress),
                description: interpret_cluster(avg_mood, avg_stress).to_string(),
            };
            (format!("Cluster_{cluster}"), summary)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Role;
    use chrono::{Duration, NaiveDate};
    use pretty_assertions::assert_eq;
    use std::collections::BTreeSet;

    fn subject(id: &str) -> User {
        User {
            id: id.to_string(),
            role: Role::Subject,
            profession: Some("engineer".to_string()),
        }
    }

    fn record(user_id: &str, day: i64, mood: f64, stress: f64) -> EmotionalRecord {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        EmotionalRecord {
            id: None,
            user_id: user_id.to_string(),
            date: start + Duration::days(day),
            mood: Some(mood),
            stress: Some(stress),
            energy: Some(6.0),
            sleep: Some(7.0),
            tags: BTreeSet::new(),
            note: None,
        }
    }

    fn mixed_dataset() -> NormalizedDataset {
        let mut records = Vec::new();
        for day in 0..5 {
            records.push(record("calm-1", day, 8.0 + (day % 2) as f64, 2.0));
            records.push(record("calm-2", day, 8.5, 3.0 - (day % 2) as f64));
            records.push(record("tense-1", day, 3.0, 8.0 + (day % 2) as f64));
            records.push(record("tense-2", day, 4.0 - (day % 2) as f64, 9.0));
            records.push(record("mid-1", day, 6.0, 5.0));
        }
        NormalizedDataset {
            subjects: ["calm-1", "calm-2", "tense-1", "tense-2", "mid-1", "silent"]
                .iter()
                .map(|id| subject(id))
                .collect(),
            records,
        }
    }

    #[test]
    fn test_interpret_cluster_boundaries() {
        assert_eq!(interpret_cluster(7.0, 4.0), "High Wellbeing");
        assert_eq!(interpret_cluster(6.0, 6.0), "Moderate Wellbeing");
        assert_eq!(interpret_cluster(5.0, 6.0), "High Risk");
        assert_eq!(interpret_cluster(5.5, 5.0), "Variable Wellbeing");
        assert_eq!(interpret_cluster(7.5, 5.0), "Moderate Wellbeing");
    }

    #[test]
    fn test_cluster_sizes_cover_segmented_subjects() {
        let seg = SegmentationEngine::segment(&mixed_dataset(), &ClusteringConfig::default(), 42)
            .unwrap();
        // The subject without records is not segmented
        assert_eq!(seg.users.len(), 5);
        let total: usize = seg.clusters.values().map(|c| c.size).sum();
        assert_eq!(total, 5);
        assert!(seg.clusters.len() <= 4);

        for user in &seg.users {
            assert!(seg.clusters.contains_key(&format!("Cluster_{}", user.cluster)));
        }
    }

    #[test]
    fn test_calm_and_tense_subjects_separate() {
        let seg = SegmentationEngine::segment(&mixed_dataset(), &ClusteringConfig::default(), 42)
            .unwrap();
        let cluster_of = |id: &str| seg.users.iter().find(|u| u.user_id == id).unwrap().cluster;
        assert_ne!(cluster_of("calm-1"), cluster_of("tense-1"));
        assert_ne!(cluster_of("calm-2"), cluster_of("tense-2"));
    }

    #[test]
    fn test_labels_are_contiguous() {
        let seg = SegmentationEngine::segment(&mixed_dataset(), &ClusteringConfig::default(), 42)
            .unwrap();
        let keys: Vec<String> = (0..seg.clusters.len()).map(|i| format!("Cluster_{i}")).collect();
        let actual: Vec<String> = seg.clusters.keys().cloned().collect();
        assert_eq!(actual, keys);
    }

    #[test]
    fn test_deterministic_for_seed() {
        let data = mixed_dataset();
        let config = ClusteringConfig::default();
        let a = SegmentationEngine::segment(&data, &config, 42).unwrap();
        let b = SegmentationEngine::segment(&data, &config, 42).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_identical_profiles_single_cluster() {
        let mut records = Vec::new();
        for id in ["a", "b", "c"] {
            for day in 0..3 {
                records.push(record(id, day, 8.0, 2.0));
            }
        }
        let data = NormalizedDataset {
            subjects: vec![subject("a"), subject("b"), subject("c")],
            records,
        };
        let seg = SegmentationEngine::segment(&data, &ClusteringConfig::default(), 42).unwrap();
        assert_eq!(seg.clusters.len(), 1);
        let only = &seg.clusters["Cluster_0"];
        assert_eq!(only.size, 3);
        assert_eq!(only.avg_mood, 8.0);
        assert_eq!(only.avg_stress, 2.0);
        assert_eq!(only.description, "High Wellbeing");
    }

    #[test]
    fn test_single_record_user_has_zero_std() {
        let data = NormalizedDataset {
            subjects: vec![subject("solo")],
            records: vec![record("solo", 0, 5.0, 5.0)],
        };
        let seg = SegmentationEngine::segment(&data, &ClusteringConfig::default(), 42).unwrap();
        let metrics = &seg.users[0].metrics;
        assert_eq!(metrics.mood_mean, 5.0);
        assert_eq!(metrics.mood_std, 0.0);
        assert_eq!(seg.users[0].record_count, 1);
    }

    #[test]
    fn test_wellbeing_streak_counts_recent_run() {
        let records = vec![
            record("u", 0, 9.0, 2.0),
            record("u", 1, 5.0, 2.0),
            record("u", 2, 7.0, 2.0),
            record("u", 3, 8.0, 2.0),
        ];
        let refs: Vec<&EmotionalRecord> = records.iter().collect();
        assert_eq!(wellbeing_streak(&refs), 2);

        let mut missing = record("u", 4, 8.0, 2.0);
        missing.mood = None;
        let mut refs = refs;
        refs.push(&missing);
        assert_eq!(wellbeing_streak(&refs), 0);
    }

    #[test]
    fn test_distinct_subjects_get_own_clusters() {
        let mut records = Vec::new();
        for day in 0..4 {
            records.push(record("calm", day, 8.0, 2.0));
            records.push(record("tense", day, 3.0, 8.0));
            records.push(record("steady", day, 6.0, 5.0));
        }
        let two = NormalizedDataset {
            subjects: vec![subject("calm"), subject("tense")],
            records: records.iter().filter(|r| r.user_id != "steady").cloned().collect(),
        };
        let seg = SegmentationEngine::segment(&two, &ClusteringConfig::default(), 42).unwrap();
        let labels: Vec<(&str, &str)> = seg
            .clusters
            .iter()
            .map(|(key, c)| (key.as_str(), c.description.as_str()))
            .collect();
        assert_eq!(
            labels,
            vec![("Cluster_0", "High Wellbeing"), ("Cluster_1", "High Risk")]
        );

        let three = NormalizedDataset {
            subjects: vec![subject("calm"), subject("tense"), subject("steady")],
            records,
        };
        let seg = SegmentationEngine::segment(&three, &ClusteringConfig::default(), 42).unwrap();
        assert_eq!(seg.clusters.len(), 3);
        assert!(seg.clusters.values().all(|c| c.size == 1));
        assert_eq!(seg.clusters["Cluster_2"].description, "Moderate Wellbeing");
    }

    #[test]
    fn test_weekly_trend_improving() {
        // Days 0..7 form the previous week, days 7..14 the current one
        let records: Vec<EmotionalRecord> = (0..14)
            .map(|day| record("u", day, if day < 7 { 5.0 } else { 6.0 }, 3.0))
            .collect();
        let refs: Vec<&EmotionalRecord> = records.iter().collect();
        let as_of = records[13].date;
        assert_eq!(
            weekly_trend(&refs, as_of),
            WeeklyTrend {
                progress_pct: Some(20),
                direction: Some(TrendDirection::Improving),
            }
        );
    }

    #[test]
    fn test_weekly_trend_worsening() {
        let records: Vec<EmotionalRecord> = (0..14)
            .map(|day| record("u", day, if day < 7 { 8.0 } else { 6.0 }, 3.0))
            .collect();
        let refs: Vec<&EmotionalRecord> = records.iter().collect();
        assert_eq!(
            weekly_trend(&refs, records[13].date),
            WeeklyTrend {
                progress_pct: Some(-25),
                direction: Some(TrendDirection::Worsening),
            }
        );
    }

    #[test]
    fn test_weekly_trend_without_previous_week_is_null() {
        let records: Vec<EmotionalRecord> = (0..5).map(|day| record("u", day, 7.0, 3.0)).collect();
        let refs: Vec<&EmotionalRecord> = records.iter().collect();
        assert_eq!(weekly_trend(&refs, records[4].date), WeeklyTrend::default());

        let json = serde_json::to_value(WeeklyTrend::default()).unwrap();
        assert_eq!(json, serde_json::json!({"progress_pct": null, "direction": null}));
    }

    #[test]
    fn test_weekly_trend_measured_from_dataset_end() {
        // "early" stops a week before "late" does; its last week is empty
        let mut records: Vec<EmotionalRecord> =
            (0..14).map(|day| record("early", day, 6.0, 3.0)).collect();
        records.extend((7..21).map(|day| record("late", day, 6.0, 3.0)));
        let data = NormalizedDataset {
            subjects: vec![subject("early"), subject("late")],
            records,
        };
        let seg = SegmentationEngine::segment(&data, &ClusteringConfig::default(), 42).unwrap();
        let trend_of = |id: &str| seg.users.iter().find(|u| u.user_id == id).unwrap().weekly_trend;
        assert_eq!(trend_of("early").progress_pct, Some(-100));
        assert_eq!(trend_of("early").direction, Some(TrendDirection::Worsening));
        assert_eq!(trend_of("late").progress_pct, Some(0));
        assert_eq!(trend_of("late").direction, Some(TrendDirection::Improving));
    }

    #[test]
    fn test_compact_labels_first_appearance() {
        assert_eq!(compact_labels(&[2, 2, 0, 3, 0]), vec![0, 0, 1, 2, 1]);
    }
}
