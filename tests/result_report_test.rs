//! Tests for result submission normalization.

use serde_json::json;
use strictly_campaign::{NamedEntry, ResultSubmission, RolledEntry};

fn submission(value: serde_json::Value) -> ResultSubmission {
    serde_json::from_value(value).expect("Invalid submission JSON")
}

#[test]
fn test_normalize_coerces_numbers_and_drops_incomplete_rows() {
    let report = submission(json!({
        "side_1": {
            "victory_points": "3",
            "glory_points": 1,
            "reinforcement": true,
            "injuries": [
                { "name": "Brother Anselm", "roll": "11" },
                { "name": "", "roll": 4 },
                { "name": "Sister Odile" },
                { "name": "Hound", "roll": null }
            ],
            "skills": [{ "name": " Captain ", "roll": 6 }],
            "elites": [{ "name": "Brother Anselm" }, { "name": "  " }, { "roll": 3 }],
            "exploration_dice": "2"
        },
        "side_2": {}
    }))
    .normalize()
    .expect("Normalize failed");

    let side_1 = report.side_1();
    assert_eq!(*side_1.victory_points(), 3);
    assert_eq!(*side_1.glory_points(), 1);
    assert!(*side_1.reinforcement());
    assert_eq!(
        side_1.injuries(),
        &vec![RolledEntry {
            name: "Brother Anselm".to_string(),
            roll: 11
        }]
    );
    assert_eq!(
        side_1.skills(),
        &vec![RolledEntry {
            name: "Captain".to_string(),
            roll: 6
        }]
    );
    assert_eq!(
        side_1.elites(),
        &vec![NamedEntry {
            name: "Brother Anselm".to_string()
        }]
    );
    assert_eq!(*side_1.exploration_dice(), Some(2));
}

#[test]
fn test_missing_scores_default_to_zero() {
    let report = submission(json!({ "side_1": { "victory_points": "" } }))
        .normalize()
        .expect("Normalize failed");
    assert_eq!(*report.side_1().victory_points(), 0);
    assert_eq!(*report.side_2().glory_points(), 0);
    assert_eq!(*report.side_2().exploration_dice(), None);
    assert!(report.side_2().injuries().is_empty());
}

#[test]
fn test_non_numeric_score_rejected() {
    let err = submission(json!({ "side_2": { "glory_points": "many" } }))
        .normalize()
        .expect_err("Should fail");
    assert_eq!(err.field, "side_2.glory_points");
}

#[test]
fn test_non_numeric_roll_rejected_with_path() {
    let err = submission(json!({
        "side_1": { "skills": [{ "name": "Ok", "roll": 2 }, { "name": "Bad", "roll": "d6" }] }
    }))
    .normalize()
    .expect_err("Should fail");
    assert_eq!(err.field, "side_1.skills[1].roll");
}

#[test]
fn test_fractional_score_rejected() {
    let err = submission(json!({ "side_1": { "victory_points": 2.5 } }))
        .normalize()
        .expect_err("Should fail");
    assert_eq!(err.field, "side_1.victory_points");
}
