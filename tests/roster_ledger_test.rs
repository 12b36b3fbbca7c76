//! Tests for the roster ledger.

mod common;

use std::sync::Arc;
use std::thread;

use common::{roster_json, setup_campaign};
use strictly_campaign::{Actor, CampaignError, WarbandStatus};

#[test]
fn test_new_warband_starts_checking_with_roster_one() {
    let c = setup_campaign();
    let submission = c
        .ledger
        .apply_roster(&c.alice, c.campaign_id, None, roster_json("Iron Saints", 650))
        .expect("Submission failed");

    let warband = submission.warband();
    assert_eq!(warband.name(), "Iron Saints");
    assert_eq!(warband.faction().as_deref(), Some("Trench Pilgrims"));
    assert_eq!(warband.player_id(), c.alice.player_id());
    assert_eq!(warband.parse_status().expect("Status"), WarbandStatus::Checking);

    let roster = submission.roster();
    assert_eq!(*roster.game_number(), 1);
    assert_eq!(*roster.cost(), 650);
    assert_eq!(*roster.glory_cost(), 1);
    assert_eq!(*roster.model_count(), 5);
    assert_eq!(*roster.payload(), roster_json("Iron Saints", 650));
}

#[test]
fn test_appended_roster_gets_next_number_and_resets_status() {
    let c = setup_campaign();
    let warband = c.active_warband(&c.alice, "Iron Saints");
    c.ledger
        .apply_roster(&c.alice, c.campaign_id, Some(*warband.id()), roster_json("Iron Saints", 700))
        .expect("Second roster failed");
    c.ledger
        .review_warband(&c.admin, *warband.id(), WarbandStatus::NeedsUpdate)
        .expect("Review failed");

    let third = c
        .ledger
        .apply_roster(&c.alice, c.campaign_id, Some(*warband.id()), roster_json("Iron Saints", 750))
        .expect("Third roster failed");

    assert_eq!(*third.roster().game_number(), 3);
    assert_eq!(
        third.warband().parse_status().expect("Status"),
        WarbandStatus::Checking
    );

    let latest = c.ledger.latest_roster(*warband.id()).expect("Latest failed");
    assert_eq!(latest.id(), third.roster().id());

    let numbers: Vec<i32> = c
        .ledger
        .rosters(*warband.id())
        .expect("List failed")
        .iter()
        .map(|r| *r.game_number())
        .collect();
    assert_eq!(numbers, vec![1, 2, 3]);
}

#[test]
fn test_duplicate_warband_name_rejected() {
    let c = setup_campaign();
    c.ledger
        .apply_roster(&c.alice, c.campaign_id, None, roster_json("Iron Saints", 700))
        .expect("First failed");
    let err = c
        .ledger
        .apply_roster(&c.alice, c.campaign_id, None, roster_json("Iron Saints", 700))
        .expect_err("Duplicate should fail");
    assert!(matches!(err, CampaignError::AlreadyExists(_)));

    // Another player may use the same name.
    c.ledger
        .apply_roster(&c.bob, c.campaign_id, None, roster_json("Iron Saints", 700))
        .expect("Other player's warband failed");
}

#[test]
fn test_malformed_roster_writes_nothing() {
    let c = setup_campaign();
    let err = c
        .ledger
        .apply_roster(&c.alice, c.campaign_id, None, r#"{"costs": []}"#.to_string())
        .expect_err("Should fail");
    assert!(matches!(err, CampaignError::MalformedInput(_)));
    assert!(c.ledger.warbands(c.campaign_id).expect("List failed").is_empty());
}

#[test]
fn test_non_member_cannot_submit() {
    let c = setup_campaign();
    let outsider = c.repo.create_player("Dmitri".to_string()).expect("Create failed");
    let err = c
        .ledger
        .apply_roster(
            &Actor::player(*outsider.id()),
            c.campaign_id,
            None,
            roster_json("Strays", 500),
        )
        .expect_err("Should fail");
    assert!(matches!(err, CampaignError::Unauthorized(_)));
}

#[test]
fn test_cannot_append_to_someone_elses_warband() {
    let c = setup_campaign();
    let warband = c.active_warband(&c.alice, "Iron Saints");
    let err = c
        .ledger
        .apply_roster(&c.bob, c.campaign_id, Some(*warband.id()), roster_json("Iron Saints", 700))
        .expect_err("Should fail");
    assert!(matches!(err, CampaignError::Unauthorized(_)));
    assert!(err.to_string().contains("not your warband"));
}

#[test]
fn test_unknown_campaign_rejected() {
    let c = setup_campaign();
    let err = c
        .ledger
        .apply_roster(&c.alice, 9_999, None, roster_json("Iron Saints", 700))
        .expect_err("Should fail");
    assert!(matches!(err, CampaignError::NotFound(_)));
}

#[test]
fn test_replace_keeps_number_and_resets_status() {
    let c = setup_campaign();
    let warband = c.active_warband(&c.alice, "Iron Saints");
    let roster = c.ledger.latest_roster(*warband.id()).expect("Latest failed");

    let replaced = c
        .ledger
        .replace_roster_payload(&c.alice, *roster.id(), roster_json("Iron Saints", 810))
        .expect("Replace failed");
    assert_eq!(replaced.id(), roster.id());
    assert_eq!(*replaced.game_number(), 1);
    assert_eq!(*replaced.cost(), 810);
    assert_eq!(
        c.warband(*warband.id()).parse_status().expect("Status"),
        WarbandStatus::Checking
    );
}

#[test]
fn test_replace_by_stranger_rejected_but_admin_allowed() {
    let c = setup_campaign();
    let warband = c.active_warband(&c.alice, "Iron Saints");
    let roster = c.ledger.latest_roster(*warband.id()).expect("Latest failed");

    let err = c
        .ledger
        .replace_roster_payload(&c.bob, *roster.id(), roster_json("Iron Saints", 1))
        .expect_err("Should fail");
    assert!(matches!(err, CampaignError::Unauthorized(_)));

    c.ledger
        .replace_roster_payload(&c.admin, *roster.id(), roster_json("Iron Saints", 640))
        .expect("Admin replace failed");
}

#[test]
fn test_review_and_delete_require_admin() {
    let c = setup_campaign();
    let warband = c.active_warband(&c.alice, "Iron Saints");
    let roster = c.ledger.latest_roster(*warband.id()).expect("Latest failed");

    let err = c
        .ledger
        .review_warband(&c.alice, *warband.id(), WarbandStatus::Active)
        .expect_err("Should fail");
    assert!(matches!(err, CampaignError::Unauthorized(_)));

    let err = c
        .ledger
        .delete_roster(&c.alice, *roster.id())
        .expect_err("Should fail");
    assert!(matches!(err, CampaignError::Unauthorized(_)));
}

#[test]
fn test_number_after_admin_deletion_never_reused() {
    let c = setup_campaign();
    let warband = c.active_warband(&c.alice, "Iron Saints");
    let id = Some(*warband.id());
    c.ledger
        .apply_roster(&c.alice, c.campaign_id, id, roster_json("Iron Saints", 700))
        .expect("Second failed");
    let first = c
        .ledger
        .rosters(*warband.id())
        .expect("List failed")
        .into_iter()
        .next()
        .expect("Missing first roster");
    c.ledger
        .delete_roster(&c.admin, *first.id())
        .expect("Delete failed");

    let next = c
        .ledger
        .apply_roster(&c.alice, c.campaign_id, id, roster_json("Iron Saints", 720))
        .expect("Third failed");
    assert_eq!(*next.roster().game_number(), 3);
}

#[test]
fn test_deleted_warband_accepts_no_rosters() {
    let c = setup_campaign();
    let warband = c.active_warband(&c.alice, "Iron Saints");
    c.ledger
        .review_warband(&c.admin, *warband.id(), WarbandStatus::Deleted)
        .expect("Review failed");
    let err = c
        .ledger
        .apply_roster(&c.alice, c.campaign_id, Some(*warband.id()), roster_json("Iron Saints", 700))
        .expect_err("Should fail");
    assert!(matches!(err, CampaignError::InvalidState(_)));
}

#[test]
fn test_deleted_warband_rosters_cannot_be_replaced() {
    let c = setup_campaign();
    let warband = c.active_warband(&c.alice, "Iron Saints");
    let roster = c.ledger.latest_roster(*warband.id()).expect("Latest failed");
    c.ledger
        .review_warband(&c.admin, *warband.id(), WarbandStatus::Deleted)
        .expect("Review failed");

    for actor in [&c.alice, &c.admin] {
        let err = c
            .ledger
            .replace_roster_payload(actor, *roster.id(), roster_json("Iron Saints", 640))
            .expect_err("Should fail");
        assert!(matches!(err, CampaignError::InvalidState(_)));
    }

    assert_eq!(
        c.warband(*warband.id()).parse_status().expect("Bad status"),
        WarbandStatus::Deleted
    );
    let unchanged = c.ledger.latest_roster(*warband.id()).expect("Latest failed");
    assert_eq!(*unchanged.cost(), 700);
}

#[test]
fn test_campaign_admin_rights_stop_at_their_campaign() {
    let c = setup_campaign();
    let warband = c.active_warband(&c.alice, "Iron Saints");
    let roster = c.ledger.latest_roster(*warband.id()).expect("Latest failed");

    let outsider = c
        .repo
        .create_player("Visiting Referee".to_string())
        .expect("Create player failed");
    let other = c
        .repo
        .create_campaign("Winter Siege".to_string())
        .expect("Create campaign failed");
    c.repo
        .join_campaign(*other.id(), *outsider.id())
        .expect("Join failed");
    let outsider = Actor::new(*outsider.id(), true, false);

    let err = c
        .ledger
        .review_warband(&outsider, *warband.id(), WarbandStatus::Deleted)
        .expect_err("Should fail");
    assert!(matches!(err, CampaignError::Unauthorized(_)));
    let err = c
        .ledger
        .delete_roster(&outsider, *roster.id())
        .expect_err("Should fail");
    assert!(matches!(err, CampaignError::Unauthorized(_)));
    let err = c
        .ledger
        .replace_roster_payload(&outsider, *roster.id(), roster_json("Iron Saints", 1))
        .expect_err("Should fail");
    assert!(matches!(err, CampaignError::Unauthorized(_)));
    assert_eq!(
        c.warband(*warband.id()).parse_status().expect("Bad status"),
        WarbandStatus::Active
    );

    let super_admin = Actor::new(*outsider.player_id(), false, true);
    let reviewed = c
        .ledger
        .review_warband(&super_admin, *warband.id(), WarbandStatus::NeedsUpdate)
        .expect("Super-admin review failed");
    assert_eq!(
        reviewed.parse_status().expect("Bad status"),
        WarbandStatus::NeedsUpdate
    );
}

#[test]
fn test_concurrent_submissions_get_distinct_numbers() {
    let c = setup_campaign();
    let warband = c.active_warband(&c.alice, "Iron Saints");
    let ledger = Arc::new(c.ledger.clone());
    let (alice, campaign_id, warband_id) = (c.alice, c.campaign_id, *warband.id());

    let handles: Vec<_> = (0..4)
        .map(|i| {
            let ledger = Arc::clone(&ledger);
            thread::spawn(move || {
                ledger.apply_roster(
                    &alice,
                    campaign_id,
                    Some(warband_id),
                    roster_json("Iron Saints", 700 + i),
                )
            })
        })
        .collect();
    for handle in handles {
        handle
            .join()
            .expect("Thread panicked")
            .expect("Submission failed");
    }

    let numbers: Vec<i32> = c
        .ledger
        .rosters(warband_id)
        .expect("List failed")
        .iter()
        .map(|r| *r.game_number())
        .collect();
    assert_eq!(numbers, vec![1, 2, 3, 4, 5]);
}
