//! Short-horizon mood forecasting
//!
//! Regresses mood on (days since first record, weekday, stress, energy, sleep)
//! with a seeded random forest, then predicts the seven days after the last
//! observed date with the other scores held at their historical means.

use crate::config::{ForecastConfig, ForecastScope};
use crate::error::ComputeError;
use crate::model::RandomForestRegressor;
use crate::stats::{mean, round_to};
use crate::types::{
    Confidence, EmotionalRecord, ForecastBasis, ForecastPoint, Metric, MoodForecast,
    NormalizedDataset, UserForecast,
};
use chrono::{Datelike, Duration, NaiveDate};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, warn};

/// Number of days predicted past the last observation
pub const FORECAST_HORIZON: u32 = 7;

/// Produces pooled and optionally per-subject mood forecasts
pub struct MoodForecaster;

impl MoodForecaster {
    pub fn forecast(
        dataset: &NormalizedDataset,
        config: &ForecastConfig,
        seed: u64,
    ) -> Result<MoodForecast, ComputeError> {
        let records: Vec<&EmotionalRecord> = dataset.records.iter().collect();
        let pooled = forecast_records(&records, config, seed)?;

        let per_user = match config.scope {
            ForecastScope::Pooled => None,
            ForecastScope::PerUser => {
                let mut forecasts = BTreeMap::new();
                for user in &dataset.subjects {
                    let own: Vec<&EmotionalRecord> = dataset.records_for(&user.id).collect();
                    if own.iter().all(|r| r.mood.is_none()) {
                        debug!(user_id = %user.id, "no mood values; skipping per-user forecast");
                        continue;
                    }
                    forecasts.insert(user.id.clone(), forecast_records(&own, config, seed)?);
                }
                Some(forecasts)
            }
        };

        Ok(MoodForecast {
            scope: config.scope,
            basis: pooled.basis,
            points: pooled.points,
            per_user,
        })
    }
}

/// Training matrix derived from a record set
struct TrainingSet {
    rows: Vec<Vec<f64>>,
    targets: Vec<f64>,
    first_date: NaiveDate,
    last_date: NaiveDate,
    distinct_dates: usize,
    /// Imputation means for stress, energy, sleep
    score_means: [f64; 3],
}

impl TrainingSet {
    fn build(records: &[&EmotionalRecord]) -> Option<Self> {
        let labelled: Vec<&EmotionalRecord> =
            records.iter().copied().filter(|r| r.mood.is_some()).collect();
        let first_date = labelled.iter().map(|r| r.date).min()?;
        let last_date = labelled.iter().map(|r| r.date).max()?;
        let distinct_dates = labelled.iter().map(|r| r.date).collect::<BTreeSet<_>>().len();

        let column_mean = |metric: Metric| {
            let values: Vec<f64> = labelled.iter().filter_map(|r| r.score(metric)).collect();
            mean(&values).unwrap_or(0.0)
        };
        let score_means = [
            column_mean(Metric::Stress),
            column_mean(Metric::Energy),
            column_mean(Metric::Sleep),
        ];

        let mut rows = Vec::with_capacity(labelled.len());
        let mut targets = Vec::with_capacity(labelled.len());
        for record in &labelled {
            let Some(mood) = record.mood else { continue };
            rows.push(vec![
                (record.date - first_date).num_days() as f64,
                record.date.weekday().num_days_from_monday() as f64,
                record.stress.unwrap_or(score_means[0]),
                record.energy.unwrap_or(score_means[1]),
                record.sleep.unwrap_or(score_means[2]),
            ]);
            targets.push(mood);
        }

        Some(Self {
            rows,
            targets,
            first_date,
            last_date,
            distinct_dates,
            score_means,
        })
    }

    fn future_row(&self, offset: u32) -> Vec<f64> {
        let date = self.last_date + Duration::days(i64::from(offset));
        vec![
            (date - self.first_date).num_days() as f64,
            date.weekday().num_days_from_monday() as f64,
            self.score_means[0],
            self.score_means[1],
            self.score_means[2],
        ]
    }
}

fn forecast_records(
    records: &[&EmotionalRecord],
    config: &ForecastConfig,
    seed: u64,
) -> Result<UserForecast, ComputeError> {
    let training = TrainingSet::build(records).ok_or_else(|| {
        ComputeError::InsufficientData("no records with a mood value to forecast from".to_string())
    })?;
    let historical = mean(&training.targets).unwrap_or(0.0);

    let (basis, predictions): (ForecastBasis, Vec<f64>) =
        if training.distinct_dates < config.min_forecast_dates {
            warn!(
                dates = training.distinct_dates,
                required = config.min_forecast_dates,
                "too few distinct dates for a trend model; using historical mean"
            );
            (
                ForecastBasis::HistoricalMean,
                vec![historical; FORECAST_HORIZON as usize],
            )
        } else {
            let model = RandomForestRegressor::from_config(config, seed)
                .fit(&training.rows, &training.targets)?;
            let predictions = (1..=FORECAST_HORIZON)
                .map(|offset| model.predict(&training.future_row(offset)))
                .collect();
            (ForecastBasis::Model, predictions)
        };

    debug!(
        samples = training.targets.len(),
        basis = ?basis,
        "mood forecast computed"
    );

    let points = predictions
        .into_iter()
        .zip(1..=FORECAST_HORIZON)
        .map(|(predicted, day)| ForecastPoint {
            day,
            predicted_mood: round_to(predicted, 1),
            confidence: if (predicted - historical).abs() < config.confidence_threshold {
                Confidence::High
            } else {
                Confidence::Medium
            },
        })
        .collect();

    Ok(UserForecast { basis, points })
}
