//! Wire types for Paymo records.
//!
//! Upstream records are only partially trusted: numeric fields can arrive as
//! numbers, numeric strings, `null`, or be missing entirely. Numeric and
//! boolean fields therefore deserialize leniently into `Option`s, and anything
//! that is not a usable value becomes `None` instead of failing the record.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// A project as returned by `GET /projects` (optionally with `include=tasks`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Project {
    pub id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default, deserialize_with = "lenient_bool")]
    pub active: Option<bool>,
    #[serde(default)]
    pub client: Option<ClientRef>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default, deserialize_with = "lenient_bool")]
    pub billable: Option<bool>,
    #[serde(default)]
    pub billing_type: Option<String>,
    #[serde(default, deserialize_with = "lenient_bool")]
    pub flat_billing: Option<bool>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub budget_hours: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub price_per_hour: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub price: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub estimated_price: Option<f64>,
    /// Worked seconds already recorded on the project record itself.
    #[serde(default, deserialize_with = "lenient_f64")]
    pub recorded_time: Option<f64>,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub end_date: Option<String>,
    #[serde(default)]
    pub created_on: Option<String>,
    #[serde(default)]
    pub updated_on: Option<String>,
    #[serde(default, deserialize_with = "nullable_vec")]
    pub tasks: Vec<Task>,
}

impl Project {
    pub fn is_flat_billing(&self) -> bool {
        self.flat_billing.unwrap_or(false)
    }

    pub fn is_active(&self) -> bool {
        self.active.unwrap_or(false)
    }

    pub fn client_name(&self) -> &str {
        self.client
            .as_ref()
            .and_then(|c| c.name.as_deref())
            .unwrap_or("")
    }

    /// All time entries nested under the project's tasks
    /// (present with `include=tasks.entries`).
    pub fn task_entries(&self) -> impl Iterator<Item = &TimeEntry> {
        self.tasks.iter().flat_map(|t| t.entries.iter())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClientRef {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Task {
    #[serde(default, deserialize_with = "lenient_i64")]
    pub id: Option<i64>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub budget_hours: Option<f64>,
    #[serde(default, deserialize_with = "nullable_vec")]
    pub entries: Vec<TimeEntry>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TimeEntry {
    #[serde(default, deserialize_with = "lenient_i64")]
    pub id: Option<i64>,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub task_id: Option<i64>,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub user_id: Option<i64>,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub project_id: Option<i64>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub start_time: Option<String>,
    #[serde(default)]
    pub end_time: Option<String>,
    /// Seconds.
    #[serde(default, deserialize_with = "lenient_f64")]
    pub duration: Option<f64>,
    #[serde(default)]
    pub description: Option<String>,
}

/// Strip Paymo's list envelope (`{"projects": [...]}`), falling back to the
/// body itself when the key is absent or null.
pub fn unwrap_collection(mut body: Value, key: &str) -> Value {
    match body.get_mut(key) {
        Some(inner) if !inner.is_null() => inner.take(),
        _ => body,
    }
}

// ── Lenient Scalar Conversion ───────────────────────────────────

pub fn value_as_f64(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    n.is_finite().then_some(n)
}

pub fn value_as_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

pub fn value_as_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => n.as_f64().map(|f| f != 0.0),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "1" => Some(true),
            "false" | "0" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

fn lenient_f64<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
    let value = Option::<Value>::deserialize(d)?;
    Ok(value.as_ref().and_then(value_as_f64))
}

fn lenient_i64<'de, D: Deserializer<'de>>(d: D) -> Result<Option<i64>, D::Error> {
    let value = Option::<Value>::deserialize(d)?;
    Ok(value.as_ref().and_then(value_as_i64))
}

fn lenient_bool<'de, D: Deserializer<'de>>(d: D) -> Result<Option<bool>, D::Error> {
    let value = Option::<Value>::deserialize(d)?;
    Ok(value.as_ref().and_then(value_as_bool))
}

fn nullable_vec<'de, D, T>(d: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(d)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn project_tolerates_stringly_and_null_fields() {
        let project: Project = serde_json::from_value(json!({
            "id": 7,
            "name": "Website",
            "budget_hours": "12.5",
            "price_per_hour": null,
            "flat_billing": 0,
            "price": "n/a",
            "tasks": null
        }))
        .unwrap();
        assert_eq!(project.budget_hours, Some(12.5));
        assert_eq!(project.price_per_hour, None);
        assert_eq!(project.flat_billing, Some(false));
        assert_eq!(project.price, None);
        assert!(project.tasks.is_empty());
        assert!(!project.is_active());
    }

    #[test]
    fn project_with_nested_tasks_and_entries() {
        let project: Project = serde_json::from_value(json!({
            "id": 1,
            "name": "App",
            "active": true,
            "client": {"id": 3, "name": "Acme"},
            "tasks": [
                {"id": 10, "budget_hours": 4, "entries": [{"id": 100, "duration": 3600}]},
                {"id": 11, "entries": [{"id": 101, "duration": "1800"}]}
            ]
        }))
        .unwrap();
        assert_eq!(project.client_name(), "Acme");
        assert!(project.is_active());
        let durations: Vec<f64> = project.task_entries().filter_map(|e| e.duration).collect();
        assert_eq!(durations, vec![3600.0, 1800.0]);
    }

    #[test]
    fn unwrap_collection_handles_envelope_and_bare_lists() {
        let wrapped = json!({"invoices": [{"id": 1}]});
        assert_eq!(unwrap_collection(wrapped, "invoices"), json!([{"id": 1}]));

        let bare = json!([{"id": 2}]);
        assert_eq!(unwrap_collection(bare.clone(), "invoices"), bare);

        let null_inner = json!({"invoices": null, "other": 1});
        assert_eq!(
            unwrap_collection(null_inner.clone(), "invoices"),
            null_inner
        );
    }

    #[test]
    fn scalar_conversions() {
        assert_eq!(value_as_f64(&json!(3)), Some(3.0));
        assert_eq!(value_as_f64(&json!(" 2.5 ")), Some(2.5));
        assert_eq!(value_as_f64(&json!(true)), None);
        assert_eq!(value_as_f64(&json!("NaN")), None);
        assert_eq!(value_as_i64(&json!(42.0)), Some(42));
        assert_eq!(value_as_i64(&json!(42.5)), None);
        assert_eq!(value_as_i64(&json!("17")), Some(17));
        assert_eq!(value_as_bool(&json!("TRUE")), Some(true));
        assert_eq!(value_as_bool(&json!("maybe")), None);
    }
}
