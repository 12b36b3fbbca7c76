//! Shared fixtures for integration tests.

#![allow(dead_code)]

use tempfile::NamedTempFile;

use strictly_campaign::{
    Actor, ApprovalService, CampaignConfig, CampaignRepository, Game, GameProposal,
    PairingService, ReadinessGate, RetryPolicy, RosterLedger, Warband, WarbandStatus,
};

/// A migrated database with one campaign and three members.
pub struct Campaign {
    /// Keeps the database file alive.
    pub db: NamedTempFile,
    pub repo: CampaignRepository,
    pub ledger: RosterLedger,
    pub pairing: PairingService,
    pub readiness: ReadinessGate,
    pub approval: ApprovalService,
    pub campaign_id: i32,
    pub alice: Actor,
    pub bob: Actor,
    pub carol: Actor,
    pub admin: Actor,
}

/// Creates a temporary database file with schema applied, one campaign,
/// three players who have all joined it and a campaign admin who has too.
pub fn setup_campaign() -> Campaign {
    let db = NamedTempFile::new().expect("Failed to create temp file");
    let db_path = db.path().to_str().expect("Invalid path").to_string();

    let repo = CampaignRepository::new(db_path).expect("Failed to create repository");
    repo.run_migrations().expect("Migrations failed");

    let campaign = repo
        .create_campaign("Autumn Offensive".to_string())
        .expect("Create campaign failed");
    let campaign_id = *campaign.id();

    let mut actors = Vec::new();
    for name in ["Alice", "Bob", "Carol"] {
        let player = repo
            .create_player(name.to_string())
            .expect("Create player failed");
        repo.join_campaign(campaign_id, *player.id())
            .expect("Join failed");
        actors.push(Actor::player(*player.id()));
    }
    let admin = repo
        .create_player("Referee".to_string())
        .expect("Create admin failed");
    repo.join_campaign(campaign_id, *admin.id())
        .expect("Admin join failed");

    let config = CampaignConfig::default();
    let retry = RetryPolicy::new(20, 1);

    Campaign {
        ledger: RosterLedger::new(repo.clone(), config.cost_names()),
        pairing: PairingService::new(repo.clone()),
        readiness: ReadinessGate::new(repo.clone(), retry),
        approval: ApprovalService::new(repo.clone(), retry),
        repo,
        db,
        campaign_id,
        alice: actors[0],
        bob: actors[1],
        carol: actors[2],
        admin: Actor::new(*admin.id(), true, false),
    }
}

/// A minimal roster export.
pub fn roster_json(name: &str, ducats: i32) -> String {
    serde_json::json!({
        "roster": {
            "name": name,
            "costs": [
                { "name": "ducats", "value": ducats },
                { "name": "glory points", "value": 1 }
            ],
            "forces": [{
                "catalogueName": "Trench Pilgrims",
                "selections": [
                    { "name": "War Prophet", "type": "model", "number": 1 },
                    { "name": "Pilgrims", "type": "unit", "number": 4 }
                ]
            }]
        }
    })
    .to_string()
}

impl Campaign {
    /// Founds a warband for `owner` and has the admin approve it.
    pub fn active_warband(&self, owner: &Actor, name: &str) -> Warband {
        let submission = self
            .ledger
            .apply_roster(owner, self.campaign_id, None, roster_json(name, 700))
            .expect("Roster submission failed");
        self.ledger
            .review_warband(&self.admin, *submission.warband().id(), WarbandStatus::Active)
            .expect("Review failed")
    }

    /// Proposes a game from `proposer`'s warband against `opponent`.
    pub fn propose(&self, proposer: &Actor, mine: &Warband, theirs: &Warband) -> Game {
        self.pairing
            .propose_game(
                proposer,
                self.campaign_id,
                &GameProposal::new(*mine.id(), *theirs.id(), None, None),
            )
            .expect("Proposal failed")
    }

    /// Proposes a game and has both sides mark ready.
    pub fn active_game(
        &self,
        (p1, w1): (&Actor, &Warband),
        (p2, w2): (&Actor, &Warband),
    ) -> Game {
        let game = self.propose(p1, w1, w2);
        self.readiness
            .mark_ready(p1, *game.id())
            .expect("Ready 1 failed");
        self.readiness
            .mark_ready(p2, *game.id())
            .expect("Ready 2 failed")
    }

    /// Reloads a warband.
    pub fn warband(&self, warband_id: i32) -> Warband {
        self.ledger
            .warbands(self.campaign_id)
            .expect("List warbands failed")
            .into_iter()
            .find(|w| *w.id() == warband_id)
            .expect("Warband missing")
    }
}
