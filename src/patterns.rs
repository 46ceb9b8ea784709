//! Temporal pattern analysis
//!
//! Aggregates normalized records by weekday and by ISO week, computes the
//! cross-metric Pearson matrix, and counts emotion tags. Means and standard
//! deviations are rounded to two decimals; correlations are computed on raw
//! values and rounded only at output.

use crate::stats::{mean, pearson, round2, sample_std};
use crate::types::{
    weekday_name, CorrelationMatrix, EmotionalRecord, MeanStd, Metric, MoodPatterns,
    NormalizedDataset, TagCount, WeekStats, WeekdayStats,
};
use chrono::Datelike;
use std::collections::{BTreeMap, HashMap};

/// Analyzer for weekday, weekly and cross-metric patterns
pub struct PatternAnalyzer;

impl PatternAnalyzer {
    /// Compute the full pattern summary
    pub fn analyze(dataset: &NormalizedDataset) -> MoodPatterns {
        let records = &dataset.records;
        MoodPatterns {
            by_weekday: by_weekday(records),
            by_week: by_week(records),
            correlations: correlation_matrix(records),
            emotion_frequencies: emotion_frequencies(records),
        }
    }
}

/// Mean mood per weekday name on raw values, keys in grouping order
pub fn weekday_mood_means(records: &[EmotionalRecord]) -> BTreeMap<String, f64> {
    group_by_weekday(records)
        .into_iter()
        .filter_map(|(day, group)| Some((day, mean(&column(&group, Metric::Mood))?)))
        .collect()
}

fn group_by_weekday(records: &[EmotionalRecord]) -> BTreeMap<String, Vec<&EmotionalRecord>> {
    let mut groups: BTreeMap<String, Vec<&EmotionalRecord>> = BTreeMap::new();
    for record in records {
        groups
            .entry(weekday_name(record.date.weekday()).to_string())
            .or_default()
            .push(record);
    }
    groups
}

fn by_weekday(records: &[EmotionalRecord]) -> BTreeMap<String, WeekdayStats> {
    group_by_weekday(records)
        .into_iter()
        .map(|(day, group)| {
            let stats = WeekdayStats {
                mood: mean_std(&column(&group, Metric::Mood)),
                stress: mean_std(&column(&group, Metric::Stress)),
                energy: mean_std(&column(&group, Metric::Energy)),
                records: group.len(),
            };
            (day, stats)
        })
        .collect()
}

fn by_week(records: &[EmotionalRecord]) -> BTreeMap<u32, WeekStats> {
    let mut groups: BTreeMap<u32, Vec<&EmotionalRecord>> = BTreeMap::new();
    for record in records {
        groups
            .entry(record.date.iso_week().week())
            .or_default()
            .push(record);
    }

    groups
        .into_iter()
        .map(|(week, group)| {
            let metric_mean = |metric| mean(&column(&group, metric)).map(round2);
            let stats = WeekStats {
                mood: metric_mean(Metric::Mood),
                stress: metric_mean(Metric::Stress),
                energy: metric_mean(Metric::Energy),
                sleep: metric_mean(Metric::Sleep),
                records: group.len(),
            };
            (week, stats)
        })
        .collect()
}

/// Raw (unrounded) Pearson correlation between two metrics
pub fn metric_correlation(records: &[EmotionalRecord], a: Metric, b: Metric) -> Option<f64> {
    let xs: Vec<Option<f64>> = records.iter().map(|r| r.score(a)).collect();
    let ys: Vec<Option<f64>> = records.iter().map(|r| r.score(b)).collect();
    pearson(&xs, &ys)
}

fn correlation_matrix(records: &[EmotionalRecord]) -> CorrelationMatrix {
    let mut matrix = CorrelationMatrix::new();
    for (i, &a) in Metric::ALL.iter().enumerate() {
        for &b in &Metric::ALL[i..] {
            let value = metric_correlation(records, a, b).map(round2);
            matrix.entry(a).or_default().insert(b, value);
            matrix.entry(b).or_default().insert(a, value);
        }
    }
    matrix
}

fn emotion_frequencies(records: &[EmotionalRecord]) -> Vec<TagCount> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for tag in records.iter().flat_map(|r| r.tags.iter()) {
        *counts.entry(tag.as_str()).or_default() += 1;
    }

    let mut frequencies: Vec<TagCount> = counts
        .into_iter()
        .map(|(tag, count)| TagCount {
            tag: tag.to_string(),
            count,
        })
        .collect();
    frequencies.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.tag.cmp(&b.tag)));
    frequencies
}

fn column(group: &[&EmotionalRecord], metric: Metric) -> Vec<f64> {
    group.iter().filter_map(|r| r.score(metric)).collect()
}

fn mean_std(values: &[f64]) -> MeanStd {
    MeanStd {
        mean: mean(values).map(round2),
        std: sample_std(values).map(round2),
    }
}
