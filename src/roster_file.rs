//! Roster upload parsing.
//!
//! Uploads are JSON roster exports. Only a handful of fields matter here:
//! the force name, an optional faction, two cost totals looked up by name and
//! the number of models. Everything else is kept verbatim in the stored
//! payload.
//!
//! Accepted shapes, either at the top level or under a `"roster"` key:
//!
//! ```json
//! {
//!   "name": "The Iron Saints",
//!   "faction": "Heretic Legion",
//!   "costs": [{ "name": "ducats", "value": 700 }, { "name": "glory points", "value": 2 }],
//!   "forces": [{ "catalogueName": "Heretic Legion", "selections": [
//!     { "name": "Heretic Priest", "type": "model", "number": 1 },
//!     { "name": "Troops", "type": "unit", "number": 3, "selections": [] }
//!   ]}]
//! }
//! ```

use derive_getters::Getters;
use derive_new::new;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, instrument, warn};

/// Names of the two cost totals to extract.
#[derive(Debug, Clone, PartialEq, Eq, Getters, new)]
pub struct CostNames {
    primary: String,
    glory: String,
}

impl Default for CostNames {
    fn default() -> Self {
        Self::new("ducats".to_string(), "glory points".to_string())
    }
}

/// The fields extracted from an upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Getters)]
pub struct RosterSummary {
    name: String,
    faction: Option<String>,
    model_count: i32,
    cost: i32,
    glory_cost: i32,
}

/// Why an upload was rejected.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display)]
pub enum RosterFileError {
    /// The payload is not a JSON object.
    #[display("roster is not a JSON document: {}", _0)]
    NotJson(String),
    /// No usable force name.
    #[display("roster has no name")]
    MissingName,
    /// A cost total is present but not numeric.
    #[display("cost '{}' is not a number", _0)]
    InvalidCost(String),
    /// A unit or model selection declares a negative number of models.
    #[display("selection '{}' has a negative model number ({})", _0, _1)]
    NegativeModelNumber(String, i64),
    /// The models add up to more than a roster can hold.
    #[display("model count exceeds {}", i32::MAX)]
    ModelCountOverflow,
}

impl std::error::Error for RosterFileError {}

/// Parses an uploaded roster.
///
/// # Errors
///
/// Returns [`RosterFileError`] if the document is not JSON, has no name,
/// carries a non-numeric value for one of the requested costs, or declares a
/// negative or unrepresentable number of models.
#[instrument(skip(raw, costs), fields(len = raw.len()))]
pub fn parse_roster(raw: &str, costs: &CostNames) -> Result<RosterSummary, RosterFileError> {
    let document: Value =
        serde_json::from_str(raw).map_err(|e| RosterFileError::NotJson(e.to_string()))?;
    let top = document
        .as_object()
        .ok_or_else(|| RosterFileError::NotJson("expected an object".to_string()))?;
    let roster = match top.get("roster") {
        Some(Value::Object(inner)) => inner,
        _ => top,
    };

    let name = roster
        .get("name")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .ok_or(RosterFileError::MissingName)?
        .to_string();

    let summary = RosterSummary {
        faction: faction(roster),
        model_count: model_count(roster)?,
        cost: cost(roster, costs.primary())?,
        glory_cost: cost(roster, costs.glory())?,
        name,
    };

    debug!(
        name = %summary.name,
        faction = ?summary.faction,
        models = summary.model_count,
        cost = summary.cost,
        glory = summary.glory_cost,
        "Roster parsed"
    );
    Ok(summary)
}

fn faction(roster: &Map<String, Value>) -> Option<String> {
    let declared = roster.get("faction").and_then(Value::as_str);
    let from_force = || {
        roster
            .get("forces")
            .and_then(Value::as_array)
            .and_then(|forces| forces.first())
            .and_then(|force| force.get("catalogueName"))
            .and_then(Value::as_str)
    };
    declared
        .or_else(from_force)
        .map(str::trim)
        .filter(|f| !f.is_empty())
        .map(str::to_string)
}

fn cost(roster: &Map<String, Value>, wanted: &str) -> Result<i32, RosterFileError> {
    let Some(entries) = roster.get("costs").and_then(Value::as_array) else {
        return Ok(0);
    };
    let entry = entries.iter().find(|entry| {
        entry
            .get("name")
            .and_then(Value::as_str)
            .is_some_and(|name| name.trim().eq_ignore_ascii_case(wanted))
    });
    let Some(entry) = entry else {
        debug!(cost = wanted, "Cost not listed, defaulting to zero");
        return Ok(0);
    };

    let number = match entry.get("value") {
        None | Some(Value::Null) => return Ok(0),
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        Some(_) => None,
    };
    match number {
        Some(n) if n.is_finite() && n.abs() <= f64::from(i32::MAX) => Ok(n.round() as i32),
        _ => {
            warn!(cost = wanted, "Non-numeric cost value");
            Err(RosterFileError::InvalidCost(wanted.to_string()))
        }
    }
}

fn model_count(roster: &Map<String, Value>) -> Result<i32, RosterFileError> {
    let mut total = selections_models(roster.get("selections"))?;
    if let Some(forces) = roster.get("forces").and_then(Value::as_array) {
        for force in forces {
            total = add_models(total, selections_models(force.get("selections"))?)?;
        }
    }
    Ok(total)
}

/// Sums models over a selection list, descending into nested selections.
fn selections_models(selections: Option<&Value>) -> Result<i32, RosterFileError> {
    let Some(list) = selections.and_then(Value::as_array) else {
        return Ok(0);
    };
    let mut total = 0;
    for selection in list {
        let own = match selection.get("type").and_then(Value::as_str) {
            Some("unit") | Some("model") => declared_models(selection)?,
            _ => 0,
        };
        total = add_models(total, own)?;
        total = add_models(total, selections_models(selection.get("selections"))?)?;
    }
    Ok(total)
}

/// A selection's own `number`, defaulting to one model when absent.
fn declared_models(selection: &Value) -> Result<i32, RosterFileError> {
    let Some(declared) = selection.get("number") else {
        return Ok(1);
    };
    let Some(number) = declared.as_i64() else {
        if declared.as_u64().is_some() {
            return Err(RosterFileError::ModelCountOverflow);
        }
        return Ok(1);
    };
    if number < 0 {
        let name = selection
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or("unnamed")
            .to_string();
        warn!(selection = %name, number, "Negative model number");
        return Err(RosterFileError::NegativeModelNumber(name, number));
    }
    i32::try_from(number).map_err(|_| RosterFileError::ModelCountOverflow)
}

fn add_models(total: i32, more: i32) -> Result<i32, RosterFileError> {
    total.checked_add(more).ok_or_else(|| {
        warn!(total, more, "Model count overflow");
        RosterFileError::ModelCountOverflow
    })
}
