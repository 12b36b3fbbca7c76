//! End-to-end tests for readiness, result submission and approval.

mod common;

use std::sync::Arc;
use std::thread;

use serde_json::json;

use common::{Campaign, setup_campaign};
use strictly_campaign::{
    Actor, CampaignError, Game, GameStatus, ResultSubmission, RolledEntry, Warband, WarbandStatus,
};

fn result(vp_1: i32, gp_1: i32, vp_2: i32, gp_2: i32) -> ResultSubmission {
    serde_json::from_value(json!({
        "side_1": {
            "victory_points": vp_1,
            "glory_points": gp_1,
            "injuries": [{ "name": "Brother Anselm", "roll": 9 }],
            "elites": [{ "name": "Sister Odile" }],
            "exploration_dice": 2
        },
        "side_2": { "victory_points": vp_2, "glory_points": gp_2, "reinforcement": true }
    }))
    .expect("Invalid submission JSON")
}

fn status(game: &Game) -> GameStatus {
    game.parse_status().expect("Invalid status")
}

/// X (Alice) and Y (Bob), both active.
fn two_warbands(c: &Campaign) -> (Warband, Warband) {
    (
        c.active_warband(&c.alice, "Iron Saints"),
        c.active_warband(&c.bob, "Black Grail"),
    )
}

#[test]
fn test_both_sides_ready_activates_game() {
    let c = setup_campaign();
    let (x, y) = two_warbands(&c);
    let game = c.propose(&c.alice, &x, &y);

    let after_x = c.readiness.mark_ready(&c.alice, *game.id()).expect("Ready X failed");
    assert!(*after_x.ready_1());
    assert!(!*after_x.ready_2());
    assert_eq!(status(&after_x), GameStatus::Planned);

    let after_y = c.readiness.mark_ready(&c.bob, *game.id()).expect("Ready Y failed");
    assert!(*after_y.ready_1() && *after_y.ready_2());
    assert_eq!(status(&after_y), GameStatus::Active);
}

#[test]
fn test_mark_ready_twice_is_idempotent() {
    let c = setup_campaign();
    let (x, y) = two_warbands(&c);
    let game = c.propose(&c.alice, &x, &y);

    let once = c.readiness.mark_ready(&c.bob, *game.id()).expect("Ready failed");
    let twice = c.readiness.mark_ready(&c.bob, *game.id()).expect("Ready again failed");
    assert_eq!(once.ready_1(), twice.ready_1());
    assert_eq!(once.ready_2(), twice.ready_2());
    assert_eq!(once.status(), twice.status());
    assert_eq!(once.version(), twice.version());
}

#[test]
fn test_mark_ready_rejects_strangers_and_active_games() {
    let c = setup_campaign();
    let (x, y) = two_warbands(&c);
    let game = c.propose(&c.alice, &x, &y);

    let err = c
        .readiness
        .mark_ready(&c.carol, *game.id())
        .expect_err("Stranger should fail");
    assert!(matches!(err, CampaignError::Unauthorized(_)));
    assert!(err.to_string().contains("not your game"));

    let super_admin = Actor::new(*c.admin.player_id(), false, true);
    let err = c
        .readiness
        .mark_ready(&super_admin, *game.id())
        .expect_err("Readiness is for players only");
    assert!(matches!(err, CampaignError::Unauthorized(_)));

    c.readiness.mark_ready(&c.alice, *game.id()).expect("Ready failed");
    c.readiness.mark_ready(&c.bob, *game.id()).expect("Ready failed");
    let err = c
        .readiness
        .mark_ready(&c.alice, *game.id())
        .expect_err("Active game should refuse");
    assert!(matches!(err, CampaignError::InvalidState(_)));

    let err = c.readiness.mark_ready(&c.alice, 9_999).expect_err("Unknown game");
    assert!(matches!(err, CampaignError::NotFound(_)));
}

#[test]
fn test_submit_then_approve_finishes_and_invalidates_rosters() {
    let c = setup_campaign();
    let (x, y) = two_warbands(&c);
    let game = c.active_game((&c.alice, &x), (&c.bob, &y));

    let pending = c
        .approval
        .submit_result(&c.alice, *game.id(), result(3, 1, 1, 0))
        .expect("Submit failed");
    assert_eq!(status(&pending), GameStatus::PendingApproval);
    assert!(*pending.approved_1());
    assert!(!*pending.approved_2());
    assert_eq!(*pending.victory_points_1(), 3);
    assert_eq!(*pending.glory_points_1(), 1);
    assert_eq!(*pending.submitted_by(), Some(*c.alice.player_id()));

    let finished = c.approval.approve(&c.bob, *game.id()).expect("Approve failed");
    assert_eq!(status(&finished), GameStatus::Finished);
    assert!(*finished.approved_1() && *finished.approved_2());

    for warband in [&x, &y] {
        assert_eq!(
            c.warband(*warband.id()).parse_status().expect("Status"),
            WarbandStatus::NeedsUpdate
        );
    }

    let err = c
        .approval
        .submit_result(&c.alice, *game.id(), result(0, 0, 0, 0))
        .expect_err("Finished game is terminal");
    assert!(matches!(err, CampaignError::InvalidState(_)));
}

#[test]
fn test_reject_discards_scores_but_keeps_side_data() {
    let c = setup_campaign();
    let (x, y) = two_warbands(&c);
    let game = c.active_game((&c.alice, &x), (&c.bob, &y));
    c.approval
        .submit_result(&c.alice, *game.id(), result(3, 2, 1, 1))
        .expect("Submit failed");

    let rejected = c.approval.reject(&c.bob, *game.id()).expect("Reject failed");
    assert_eq!(status(&rejected), GameStatus::Active);
    assert_eq!(*rejected.victory_points_1(), 0);
    assert_eq!(*rejected.victory_points_2(), 0);
    assert_eq!(*rejected.glory_points_1(), 0);
    assert_eq!(*rejected.glory_points_2(), 0);
    assert!(!*rejected.approved_1() && !*rejected.approved_2());

    let report = rejected.report().expect("Report failed");
    assert_eq!(
        report.side_1().injuries(),
        &vec![RolledEntry {
            name: "Brother Anselm".to_string(),
            roll: 9
        }]
    );
    assert_eq!(*report.side_1().exploration_dice(), Some(2));

    for warband in [&x, &y] {
        assert_eq!(
            c.warband(*warband.id()).parse_status().expect("Status"),
            WarbandStatus::Active
        );
    }
}

#[test]
fn test_resubmission_restarts_approvals_from_new_submitter() {
    let c = setup_campaign();
    let (x, y) = two_warbands(&c);
    let game = c.active_game((&c.alice, &x), (&c.bob, &y));
    c.approval
        .submit_result(&c.alice, *game.id(), result(3, 1, 1, 0))
        .expect("Submit failed");

    let edited = c
        .approval
        .submit_result(&c.bob, *game.id(), result(2, 1, 2, 1))
        .expect("Resubmit failed");
    assert_eq!(status(&edited), GameStatus::PendingApproval);
    assert!(!*edited.approved_1());
    assert!(*edited.approved_2());
    assert_eq!(*edited.victory_points_2(), 2);

    // Bob approving his own submission again changes nothing.
    let again = c.approval.approve(&c.bob, *game.id()).expect("Approve failed");
    assert_eq!(status(&again), GameStatus::PendingApproval);

    let finished = c.approval.approve(&c.alice, *game.id()).expect("Approve failed");
    assert_eq!(status(&finished), GameStatus::Finished);
}

#[test]
fn test_approval_requires_pending_result() {
    let c = setup_campaign();
    let (x, y) = two_warbands(&c);
    let game = c.active_game((&c.alice, &x), (&c.bob, &y));

    let err = c.approval.approve(&c.bob, *game.id()).expect_err("Should fail");
    assert!(matches!(err, CampaignError::InvalidState(_)));
    let err = c.approval.reject(&c.bob, *game.id()).expect_err("Should fail");
    assert!(matches!(err, CampaignError::InvalidState(_)));
}

#[test]
fn test_submission_from_stranger_or_planned_game_rejected() {
    let c = setup_campaign();
    let (x, y) = two_warbands(&c);
    let game = c.propose(&c.alice, &x, &y);

    let err = c
        .approval
        .submit_result(&c.alice, *game.id(), result(1, 0, 0, 0))
        .expect_err("Planned game should refuse");
    assert!(matches!(err, CampaignError::InvalidState(_)));

    c.readiness.mark_ready(&c.alice, *game.id()).expect("Ready failed");
    c.readiness.mark_ready(&c.bob, *game.id()).expect("Ready failed");
    let err = c
        .approval
        .submit_result(&c.carol, *game.id(), result(1, 0, 0, 0))
        .expect_err("Stranger should fail");
    assert!(matches!(err, CampaignError::Unauthorized(_)));

    // Campaign admins do not bypass ownership; only super-admins do.
    let err = c
        .approval
        .submit_result(&c.admin, *game.id(), result(1, 0, 0, 0))
        .expect_err("Campaign admin should fail");
    assert!(matches!(err, CampaignError::Unauthorized(_)));
}

#[test]
fn test_malformed_submission_leaves_game_untouched() {
    let c = setup_campaign();
    let (x, y) = two_warbands(&c);
    let game = c.active_game((&c.alice, &x), (&c.bob, &y));

    let bad: ResultSubmission =
        serde_json::from_value(json!({ "side_1": { "victory_points": "three" } }))
            .expect("Invalid submission JSON");
    let err = c
        .approval
        .submit_result(&c.alice, *game.id(), bad)
        .expect_err("Should fail");
    assert!(matches!(err, CampaignError::MalformedInput(_)));

    let unchanged = c.pairing.game(*game.id()).expect("Game missing");
    assert_eq!(status(&unchanged), GameStatus::Active);
    assert_eq!(unchanged.version(), game.version());
}

#[test]
fn test_super_admin_acts_for_both_sides() {
    let c = setup_campaign();
    let (x, y) = two_warbands(&c);
    let game = c.active_game((&c.alice, &x), (&c.bob, &y));
    let super_admin = Actor::new(*c.admin.player_id(), false, true);

    let pending = c
        .approval
        .submit_result(&super_admin, *game.id(), result(1, 1, 1, 1))
        .expect("Submit failed");
    assert_eq!(status(&pending), GameStatus::PendingApproval);

    let finished = c
        .approval
        .approve(&super_admin, *game.id())
        .expect("Approve failed");
    assert_eq!(status(&finished), GameStatus::Finished);
    assert_eq!(
        c.warband(*x.id()).parse_status().expect("Status"),
        WarbandStatus::NeedsUpdate
    );
}

#[test]
fn test_owner_of_both_warbands_acts_once_per_step() {
    let c = setup_campaign();
    let x1 = c.active_warband(&c.alice, "Iron Saints");
    let x2 = c.active_warband(&c.alice, "Second Crusade");
    let game = c.propose(&c.alice, &x1, &x2);

    let active = c.readiness.mark_ready(&c.alice, *game.id()).expect("Ready failed");
    assert_eq!(status(&active), GameStatus::Active);

    let pending = c
        .approval
        .submit_result(&c.alice, *game.id(), result(2, 0, 1, 0))
        .expect("Submit failed");
    assert!(*pending.approved_1() && *pending.approved_2());
    assert_eq!(status(&pending), GameStatus::PendingApproval);

    let finished = c.approval.approve(&c.alice, *game.id()).expect("Approve failed");
    assert_eq!(status(&finished), GameStatus::Finished);
}

#[test]
fn test_concurrent_ready_activates_exactly_once() {
    let c = setup_campaign();
    let (x, y) = two_warbands(&c);
    let game = c.propose(&c.alice, &x, &y);
    let readiness = Arc::new(c.readiness.clone());
    let game_id = *game.id();

    let handles: Vec<_> = [c.alice, c.bob]
        .into_iter()
        .map(|actor| {
            let readiness = Arc::clone(&readiness);
            thread::spawn(move || readiness.mark_ready(&actor, game_id))
        })
        .collect();
    for handle in handles {
        handle.join().expect("Thread panicked").expect("Ready failed");
    }

    let game = c.pairing.game(game_id).expect("Game missing");
    assert_eq!(status(&game), GameStatus::Active);
    assert!(*game.ready_1() && *game.ready_2());
    // Two flag flips, one write each.
    assert_eq!(*game.version(), 2);
}

#[test]
fn test_concurrent_approve_and_reject_apply_one_outcome() {
    let c = setup_campaign();
    let (x, y) = two_warbands(&c);
    let game = c.active_game((&c.alice, &x), (&c.bob, &y));
    let game_id = *game.id();
    c.approval
        .submit_result(&c.alice, game_id, result(3, 1, 1, 0))
        .expect("Submit failed");

    let approval = Arc::new(c.approval.clone());
    let bob = c.bob;
    let approve = {
        let approval = Arc::clone(&approval);
        thread::spawn(move || approval.approve(&bob, game_id))
    };
    let reject = {
        let approval = Arc::clone(&approval);
        thread::spawn(move || approval.reject(&bob, game_id))
    };
    let approved = approve.join().expect("Thread panicked");
    let rejected = reject.join().expect("Thread panicked");
    assert!(approved.is_ok() != rejected.is_ok(), "Exactly one must win");

    let game = c.pairing.game(game_id).expect("Game missing");
    let warband_status = c.warband(*x.id()).parse_status().expect("Status");
    if approved.is_ok() {
        assert_eq!(status(&game), GameStatus::Finished);
        assert_eq!(warband_status, WarbandStatus::NeedsUpdate);
    } else {
        assert_eq!(status(&game), GameStatus::Active);
        assert_eq!(*game.victory_points_1(), 0);
        assert_eq!(warband_status, WarbandStatus::Active);
    }
}
