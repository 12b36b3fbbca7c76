//! Declared game results and their normalization.
//!
//! Submissions arrive from forms, so numbers may come as strings and list
//! rows may be half filled in. [`ResultSubmission::normalize`] turns that into
//! a [`ResultReport`] with concrete types, dropping incomplete rows.

use derive_getters::Getters;
use derive_new::new;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, instrument};

/// A rolled outcome such as an injury or a skill advancement.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RolledEntry {
    /// Name of the model affected.
    pub name: String,
    /// Declared roll.
    pub roll: i32,
}

/// A named entry with no roll, used for elite promotions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NamedEntry {
    /// Name of the model promoted.
    pub name: String,
}

/// One unvalidated list row as submitted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntryInput {
    /// Model name, possibly blank.
    #[serde(default)]
    pub name: Option<String>,
    /// Roll as a number or numeric string, possibly absent.
    #[serde(default)]
    pub roll: Option<Value>,
}

/// One side of a submission as received.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SideInput {
    /// Victory points.
    #[serde(default)]
    pub victory_points: Option<Value>,
    /// Glory points.
    #[serde(default)]
    pub glory_points: Option<Value>,
    /// Whether reinforcements were taken.
    #[serde(default)]
    pub reinforcement: bool,
    /// Injury rows.
    #[serde(default)]
    pub injuries: Vec<EntryInput>,
    /// Skill advancement rows.
    #[serde(default)]
    pub skills: Vec<EntryInput>,
    /// Elite promotion rows; only the name matters.
    #[serde(default)]
    pub elites: Vec<EntryInput>,
    /// Exploration dice, if the scenario awarded any.
    #[serde(default)]
    pub exploration_dice: Option<Value>,
}

/// A result submission covering both slots.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultSubmission {
    /// Data for `warband_1`.
    #[serde(default)]
    pub side_1: SideInput,
    /// Data for `warband_2`.
    #[serde(default)]
    pub side_2: SideInput,
}

/// Normalized result data for one side.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Getters)]
pub struct SideReport {
    victory_points: i32,
    glory_points: i32,
    reinforcement: bool,
    injuries: Vec<RolledEntry>,
    skills: Vec<RolledEntry>,
    elites: Vec<NamedEntry>,
    exploration_dice: Option<i32>,
}

impl SideReport {
    /// Assembles a side report from stored parts.
    #[allow(clippy::too_many_arguments)]
    pub fn from_parts(
        victory_points: i32,
        glory_points: i32,
        reinforcement: bool,
        injuries: Vec<RolledEntry>,
        skills: Vec<RolledEntry>,
        elites: Vec<NamedEntry>,
        exploration_dice: Option<i32>,
    ) -> Self {
        Self {
            victory_points,
            glory_points,
            reinforcement,
            injuries,
            skills,
            elites,
            exploration_dice,
        }
    }
}

/// Normalized result data for both slots.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Getters, new)]
pub struct ResultReport {
    side_1: SideReport,
    side_2: SideReport,
}

/// A submitted value that could not be read as a number.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display)]
#[display("{field}: {reason}")]
pub struct ReportError {
    /// Path of the offending field, e.g. `side_1.injuries[2].roll`.
    pub field: String,
    /// Why it was rejected.
    pub reason: String,
}

impl std::error::Error for ReportError {}

impl ResultSubmission {
    /// Normalizes both sides.
    ///
    /// # Errors
    ///
    /// Returns [`ReportError`] if a present numeric field is not an integer.
    #[instrument(skip(self))]
    pub fn normalize(self) -> Result<ResultReport, ReportError> {
        let report = ResultReport {
            side_1: self.side_1.normalize("side_1")?,
            side_2: self.side_2.normalize("side_2")?,
        };
        debug!(
            injuries_1 = report.side_1.injuries.len(),
            injuries_2 = report.side_2.injuries.len(),
            "Result normalized"
        );
        Ok(report)
    }
}

impl SideInput {
    fn normalize(self, prefix: &str) -> Result<SideReport, ReportError> {
        let victory_points =
            optional_int(self.victory_points.as_ref(), &format!("{prefix}.victory_points"))?
                .unwrap_or(0);
        let glory_points =
            optional_int(self.glory_points.as_ref(), &format!("{prefix}.glory_points"))?
                .unwrap_or(0);
        let exploration_dice = optional_int(
            self.exploration_dice.as_ref(),
            &format!("{prefix}.exploration_dice"),
        )?;

        Ok(SideReport {
            victory_points,
            glory_points,
            reinforcement: self.reinforcement,
            injuries: rolled_entries(self.injuries, &format!("{prefix}.injuries"))?,
            skills: rolled_entries(self.skills, &format!("{prefix}.skills"))?,
            elites: named_entries(self.elites),
            exploration_dice,
        })
    }
}

fn non_blank(name: Option<String>) -> Option<String> {
    name.map(|n| n.trim().to_string()).filter(|n| !n.is_empty())
}

fn rolled_entries(rows: Vec<EntryInput>, field: &str) -> Result<Vec<RolledEntry>, ReportError> {
    let mut entries = Vec::with_capacity(rows.len());
    for (index, row) in rows.into_iter().enumerate() {
        let Some(name) = non_blank(row.name) else {
            continue;
        };
        let Some(roll) = optional_int(row.roll.as_ref(), &format!("{field}[{index}].roll"))? else {
            continue;
        };
        entries.push(RolledEntry { name, roll });
    }
    Ok(entries)
}

fn named_entries(rows: Vec<EntryInput>) -> Vec<NamedEntry> {
    rows.into_iter()
        .filter_map(|row| non_blank(row.name))
        .map(|name| NamedEntry { name })
        .collect()
}

/// Reads an optional loose integer. Null, absent and blank strings are `None`.
fn optional_int(value: Option<&Value>, field: &str) -> Result<Option<i32>, ReportError> {
    let invalid = |reason: &str| ReportError {
        field: field.to_string(),
        reason: reason.to_string(),
    };

    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n
            .as_i64()
            .and_then(|n| i32::try_from(n).ok())
            .map(Some)
            .ok_or_else(|| invalid("expected a whole number")),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(Value::String(s)) => s
            .trim()
            .parse::<i32>()
            .map(Some)
            .map_err(|_| invalid("expected a whole number")),
        Some(_) => Err(invalid("expected a number or numeric string")),
    }
}
