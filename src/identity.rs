//! Who is acting.
//!
//! Authentication itself happens upstream (session cookies, SSO, ...). The
//! server asks an [`IdentityProvider`] to turn a request's headers into an
//! [`Actor`] and never looks at credentials directly.

use axum::http::HeaderMap;
use derive_getters::Getters;
use derive_new::new;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::CampaignError;
use crate::battle::{Side, resolve_side};

/// An authenticated player plus their admin flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Getters, new)]
pub struct Actor {
    player_id: i32,
    campaign_admin: bool,
    super_admin: bool,
}

impl Actor {
    /// An ordinary player with no admin rights.
    pub fn player(player_id: i32) -> Self {
        Self::new(player_id, false, false)
    }

    /// Returns true if the actor may perform admin-only actions in a
    /// campaign.
    ///
    /// The campaign admin flag only counts in campaigns the actor belongs to;
    /// super-admins administer every campaign.
    pub fn administers(&self, member_of_campaign: bool) -> bool {
        self.super_admin || (self.campaign_admin && member_of_campaign)
    }

    /// The side this actor controls, given the owners of both slots.
    pub fn side_in(&self, owner_1: i32, owner_2: i32) -> Option<Side> {
        resolve_side(owner_1, owner_2, self.player_id)
    }
}

/// Resolves the acting player from request headers.
pub trait IdentityProvider: Send + Sync + std::fmt::Debug {
    /// Returns the actor for a request.
    ///
    /// # Errors
    ///
    /// Returns [`CampaignError::Unauthenticated`] when no identity is present.
    fn identify(&self, headers: &HeaderMap) -> Result<Actor, CampaignError>;
}

/// Header carrying the authenticated player id.
pub const PLAYER_HEADER: &str = "x-player-id";
/// Header set to `true` for campaign admins. Honoured only in campaigns the
/// player has joined.
pub const CAMPAIGN_ADMIN_HEADER: &str = "x-campaign-admin";
/// Header set to `true` for super-admins.
pub const SUPER_ADMIN_HEADER: &str = "x-super-admin";

/// Trusts identity headers injected by an authenticating gateway.
///
/// Only deploy behind a proxy that strips these headers from client requests.
#[derive(Debug, Clone, Copy, Default)]
pub struct GatewayHeaders;

impl GatewayHeaders {
    fn flag(headers: &HeaderMap, name: &str) -> bool {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| matches!(v.trim(), "true" | "1" | "yes"))
    }
}

impl IdentityProvider for GatewayHeaders {
    #[instrument(skip(self, headers))]
    fn identify(&self, headers: &HeaderMap) -> Result<Actor, CampaignError> {
        let raw = headers.get(PLAYER_HEADER).ok_or_else(|| {
            CampaignError::Unauthenticated(format!("missing {PLAYER_HEADER} header"))
        })?;
        let player_id = raw
            .to_str()
            .ok()
            .and_then(|v| v.trim().parse::<i32>().ok())
            .ok_or_else(|| {
                CampaignError::Unauthenticated(format!("invalid {PLAYER_HEADER} header"))
            })?;

        let actor = Actor::new(
            player_id,
            Self::flag(headers, CAMPAIGN_ADMIN_HEADER),
            Self::flag(headers, SUPER_ADMIN_HEADER),
        );
        debug!(?actor, "Identified actor");
        Ok(actor)
    }
}
