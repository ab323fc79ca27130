//! Scoring engine.
//!
//! Pure transform from (raw forecast, rule sequence) to per-hour scored
//! rows. No I/O, fully deterministic: identical inputs always produce
//! byte-identical output. All data mismatches (rule field absent from an
//! hour, enum value absent from its translation table) fail the whole
//! scoring run; a partially-scored hour must never leave this module.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::AppError;

/// One hour of scored output: `time`, one annotated field per rule in rule
/// order, then the accumulated `score`. Map-based because the scored fields
/// are profile-defined, not known at compile time.
pub type ScoredRow = serde_json::Map<String, Value>;

/// A single scoring rule within a profile.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringRule {
    /// Forecast-hour field this rule reads. Must exist in every hour
    /// record processed against the profile.
    pub name: String,
    /// Optional discrete-value -> numeric translation, keyed by the raw
    /// value's string form.
    #[serde(default)]
    pub translation: Option<HashMap<String, f64>>,
    /// The ideal value; scoring measures the deviation from it.
    pub ideal: f64,
    /// Score the magnitude of the deviation rather than its direction.
    #[serde(default)]
    pub absolute: bool,
    /// Optional nonlinear shaping: "exp" -> (0.33*diff)^2, "sq" -> diff^2,
    /// anything else -> identity.
    #[serde(default)]
    pub func: Option<String>,
    pub normalizer: f64,
    pub weight: f64,
}

/// Score every hour of a raw forecast against a rule sequence.
///
/// Rows come back in input hour order; the accumulated total is order-
/// independent, but per-rule output fields follow rule order.
pub fn score(forecast: &Value, rules: &[ScoringRule]) -> Result<Vec<ScoredRow>, AppError> {
    let hours = forecast
        .pointer("/forecastHourly/hours")
        .and_then(Value::as_array)
        .ok_or_else(|| AppError::MissingField("forecastHourly.hours".to_string()))?;

    let mut rows = Vec::with_capacity(hours.len());

    for hour in hours {
        let mut row = ScoredRow::new();
        let mut total = 0.0_f64;

        row.insert(
            "time".to_string(),
            hour.get("forecastStart").cloned().unwrap_or(Value::Null),
        );

        for rule in rules {
            let raw = hour
                .get(&rule.name)
                .ok_or_else(|| AppError::MissingField(rule.name.clone()))?;

            let value = match &rule.translation {
                Some(table) => {
                    let key = value_string(raw);
                    *table
                        .get(&key)
                        .ok_or_else(|| AppError::TranslationMissing {
                            field: rule.name.clone(),
                            value: key,
                        })?
                }
                None => raw
                    .as_f64()
                    .ok_or_else(|| AppError::MissingField(rule.name.clone()))?,
            };

            let mut diff = value - rule.ideal;
            if rule.absolute {
                diff = diff.abs();
            }
            diff = apply_func(rule.func.as_deref(), diff);

            let contribution = diff * rule.normalizer * rule.weight;
            total += contribution;

            row.insert(
                rule.name.clone(),
                Value::String(format!("{:.2} ({})", contribution, value_string(raw))),
            );
        }

        row.insert("score".to_string(), Value::String(format!("{:.2}", total)));
        rows.push(row);
    }

    Ok(rows)
}

fn apply_func(name: Option<&str>, diff: f64) -> f64 {
    match name {
        Some("exp") => (0.33 * diff).powi(2),
        Some("sq") => diff.powi(2),
        _ => diff,
    }
}

/// String form of a raw value: translation-table key and annotation text.
/// Strings stay bare (no JSON quotes); everything else renders as JSON.
fn value_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
