//! Insight generation
//!
//! Independent threshold rules over the normalized records. Each rule emits
//! at most one insight; the result is ranked by priority with generation
//! order preserved inside a priority level.

use crate::patterns::{metric_correlation, weekday_mood_means};
use crate::stats::mean;
use crate::types::{Insight, InsightKind, Metric, NormalizedDataset, Priority};
use tracing::debug;

/// Mean stress above this raises an alert
pub const STRESS_ALERT_THRESHOLD: f64 = 6.0;

/// Mean mood below this raises an alert
pub const MOOD_ALERT_THRESHOLD: f64 = 5.0;

/// Stress/sleep correlation below this is reported
pub const STRESS_SLEEP_CORRELATION_THRESHOLD: f64 = -0.5;

/// Turns aggregate statistics into ranked findings
pub struct InsightGenerator;

impl InsightGenerator {
    pub fn generate(dataset: &NormalizedDataset) -> Vec<Insight> {
        let mut insights = Vec::new();

        if let Some(stress) = mean(&dataset.column(Metric::Stress)) {
            if stress > STRESS_ALERT_THRESHOLD {
                insights.push(Insight {
                    kind: InsightKind::Alert,
                    title: "Elevated Stress Level".to_string(),
                    description: format!("Average stress: {stress:.1}/10."),
                    priority: Priority::High,
                });
            }
        }

        if let Some(mood) = mean(&dataset.column(Metric::Mood)) {
            if mood < MOOD_ALERT_THRESHOLD {
                insights.push(Insight {
                    kind: InsightKind::Alert,
                    title: "Low Mood State".to_string(),
                    description: format!("Average mood: {mood:.1}/10."),
                    priority: Priority::High,
                });
            }
        }

        if let Some(corr) = metric_correlation(&dataset.records, Metric::Stress, Metric::Sleep) {
            if corr < STRESS_SLEEP_CORRELATION_THRESHOLD {
                insights.push(Insight {
                    kind: InsightKind::Insight,
                    title: "Stress–Sleep Relationship".to_string(),
                    description: format!("Significant negative correlation ({corr:.2})."),
                    priority: Priority::Medium,
                });
            }
        }

        if let Some(day) = lowest_mood_weekday(dataset) {
            insights.push(Insight {
                kind: InsightKind::Pattern,
                title: "Lowest-Mood Weekday".to_string(),
                description: format!("{day}s are the lowest-mood day on average."),
                priority: Priority::Low,
            });
        }

        // Stable: equal priorities keep generation order
        insights.sort_by_key(|i| i.priority);
        debug!(count = insights.len(), "insights generated");
        insights
    }
}

/// Weekday with the lowest mean mood; the alphabetically first wins ties
fn lowest_mood_weekday(dataset: &NormalizedDataset) -> Option<String> {
    let mut lowest: Option<(String, f64)> = None;
    for (day, value) in weekday_mood_means(&dataset.records) {
        if lowest.as_ref().map_or(true, |(_, best)| value < *best) {
            lowest = Some((day, value));
        }
    }
    lowest.map(|(day, _)| day)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::EmotionalRecord;
    use chrono::{Duration, NaiveDate};
    use pretty_assertions::assert_eq;
    use std::collections::BTreeSet;

    // 2024-01-01 is a Monday
    fn record(day: i64, mood: f64, stress: f64, sleep: f64) -> EmotionalRecord {
        EmotionalRecord {
            id: None,
            user_id: "u1".to_string(),
            date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + Duration::days(day),
            mood: Some(mood),
            stress: Some(stress),
            energy: Some(5.0),
            sleep: Some(sleep),
            tags: BTreeSet::new(),
            note: None,
        }
    }

    fn dataset(records: Vec<EmotionalRecord>) -> NormalizedDataset {
        NormalizedDataset {
            subjects: vec![],
            records,
        }
    }

    #[test]
    fn test_high_stress_good_mood() {
        let data = dataset(vec![
            record(0, 8.0, 7.0, 6.0),
            record(1, 8.0, 7.4, 6.0),
            record(2, 8.0, 7.2, 6.0),
        ]);
        let insights = InsightGenerator::generate(&data);

        assert_eq!(insights.len(), 2);
        assert_eq!(insights[0].title, "Elevated Stress Level");
        assert_eq!(insights[0].description, "Average stress: 7.2/10.");
        assert_eq!(insights[0].kind, InsightKind::Alert);
        assert_eq!(insights[0].priority, Priority::High);
        assert!(insights.iter().all(|i| i.title != "Low Mood State"));
        assert_eq!(insights[1].kind, InsightKind::Pattern);
    }

    #[test]
    fn test_low_mood_alert() {
        let data = dataset(vec![record(0, 3.0, 5.0, 5.0), record(1, 4.0, 5.0, 5.0)]);
        let insights = InsightGenerator::generate(&data);
        assert_eq!(insights[0].title, "Low Mood State");
        assert_eq!(insights[0].description, "Average mood: 3.5/10.");
    }

    #[test]
    fn test_stress_sleep_correlation_insight() {
        let data = dataset(vec![
            record(0, 6.0, 2.0, 9.0),
            record(1, 6.0, 4.0, 7.0),
            record(2, 6.0, 6.0, 5.0),
            record(3, 6.0, 8.0, 3.0),
        ]);
        let insights = InsightGenerator::generate(&data);
        let insight = insights
            .iter()
            .find(|i| i.kind == InsightKind::Insight)
            .unwrap();
        assert_eq!(insight.title, "Stress–Sleep Relationship");
        assert_eq!(insight.description, "Significant negative correlation (-1.00).");
        assert_eq!(insight.priority, Priority::Medium);
    }

    #[test]
    fn test_lowest_weekday_always_emitted() {
        let data = dataset(vec![
            record(0, 4.0, 3.0, 7.0),
            record(1, 9.0, 3.0, 7.0),
            record(2, 8.0, 3.0, 7.0),
        ]);
        let insights = InsightGenerator::generate(&data);
        let pattern = insights.last().unwrap();
        assert_eq!(pattern.title, "Lowest-Mood Weekday");
        assert_eq!(pattern.description, "Mondays are the lowest-mood day on average.");
        assert_eq!(pattern.priority, Priority::Low);
    }

    #[test]
    fn test_weekday_tie_breaks_alphabetically() {
        // Monday and Friday share the lowest mean
        let data = dataset(vec![
            record(0, 5.0, 3.0, 7.0),
            record(4, 5.0, 3.0, 7.0),
            record(2, 8.0, 3.0, 7.0),
        ]);
        let insights = InsightGenerator::generate(&data);
        assert_eq!(
            insights.last().unwrap().description,
            "Fridays are the lowest-mood day on average."
        );
    }

    #[test]
    fn test_sorted_by_priority() {
        let data = dataset(vec![
            record(0, 3.0, 8.0, 9.0),
            record(1, 4.0, 9.0, 2.0),
            record(2, 2.0, 7.0, 8.0),
            record(3, 3.0, 9.5, 1.0),
        ]);
        let insights = InsightGenerator::generate(&data);
        let priorities: Vec<Priority> = insights.iter().map(|i| i.priority).collect();
        let mut sorted = priorities.clone();
        sorted.sort();
        assert_eq!(priorities, sorted);
        assert_eq!(insights[0].title, "Elevated Stress Level");
        assert_eq!(insights[1].title, "Low Mood State");
    }
}
