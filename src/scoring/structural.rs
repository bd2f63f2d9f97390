//! Structural comparison of a submitted JSON answer against a reference
//!
//! - objects: mean over the expected keys
//! - arrays: mean best match of each expected element, in any order
//! - strings: trimmed, case-insensitive equality
//! - numbers, booleans, null: exact equality
//!
//! Keys and elements the submission adds beyond the reference are ignored.

use serde_json::Value;

/// Outcome of comparing an answer with the reference
#[derive(Debug, Clone, PartialEq)]
pub struct Comparison {
    /// Fraction of the reference matched, in `[0, 1]`
    pub ratio: f64,
    /// Paths of reference entries with no match at all
    pub missing: Vec<String>,
}

pub fn compare(expected: &Value, actual: &Value) -> Comparison {
    let mut missing = Vec::new();
    let ratio = similarity(expected, actual, "", &mut missing);
    Comparison {
        ratio: ratio.clamp(0.0, 1.0),
        missing,
    }
}

fn similarity(expected: &Value, actual: &Value, path: &str, missing: &mut Vec<String>) -> f64 {
    match (expected, actual) {
        (Value::Object(exp), Value::Object(act)) => {
            if exp.is_empty() {
                return 1.0;
            }
            let total: f64 = exp
                .iter()
                .map(|(key, exp_val)| {
                    let child = join_key(path, key);
                    match act.get(key) {
                        Some(act_val) => similarity(exp_val, act_val, &child, missing),
                        None => {
                            missing.push(child);
                            0.0
                        }
                    }
                })
                .sum();
            total / exp.len() as f64
        }
        (Value::Array(exp), Value::Array(act)) => {
            if exp.is_empty() {
                return 1.0;
            }
            let total: f64 = exp
                .iter()
                .map(|exp_item| {
                    // Nested misses of a non-chosen candidate are not reported
                    let mut scratch = Vec::new();
                    let best = act
                        .iter()
                        .map(|act_item| similarity(exp_item, act_item, path, &mut scratch))
                        .fold(0.0, f64::max);
                    if best == 0.0 {
                        missing.push(format!("{}[{}]", path, describe(exp_item)));
                    }
                    best
                })
                .sum();
            total / exp.len() as f64
        }
        (Value::String(exp), Value::String(act)) => {
            bool_score(exp.trim().to_lowercase() == act.trim().to_lowercase())
        }
        (Value::Number(exp), Value::Number(act)) => bool_score(exp.as_f64() == act.as_f64()),
        (Value::Bool(exp), Value::Bool(act)) => bool_score(exp == act),
        (Value::Null, Value::Null) => 1.0,
        _ => {
            // A container of the wrong type counts as missing; a wrong scalar is just wrong
            if !path.is_empty() && matches!(expected, Value::Object(_) | Value::Array(_)) {
                missing.push(path.to_string());
            }
            0.0
        }
    }
}

fn bool_score(matched: bool) -> f64 {
    if matched { 1.0 } else { 0.0 }
}

fn join_key(path: &str, key: &str) -> String {
    if path.is_empty() {
        key.to_string()
    } else {
        format!("{path}.{key}")
    }
}

/// Short human label for a reference element
fn describe(value: &Value) -> String {
    let label = match value {
        Value::String(s) => s.clone(),
        Value::Object(map) => ["name", "id", "title"]
            .iter()
            .find_map(|k| map.get(*k).and_then(Value::as_str))
            .map(str::to_string)
            .unwrap_or_else(|| value.to_string()),
        other => other.to_string(),
    };
    truncate(&label, 60)
}

fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_chars).collect();
        format!("{head}...")
    }
}
