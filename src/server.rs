//! HTTP surface for the campaign services.
//!
//! Handlers resolve the [`Actor`] through the configured [`IdentityProvider`],
//! then run the synchronous service call on the blocking pool.

use std::sync::Arc;

use axum::body::Body;
use axum::extract::{FromRequest, FromRequestParts, Path, State};
use axum::http::request::Parts;
use axum::http::{Request, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use chrono::NaiveDateTime;
use derive_getters::Getters;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tower::ServiceBuilder;
use tracing::{debug, error, info, instrument, warn};

use crate::CampaignError;
use crate::approval_service::ApprovalService;
use crate::battle::{GameStatus, ResultReport, ResultSubmission, WarbandStatus};
use crate::config::CampaignConfig;
use crate::db::{CampaignRepository, DbError, Game, Roster, Warband};
use crate::identity::{Actor, GatewayHeaders, IdentityProvider};
use crate::pairing_service::{GameProposal, PairingService};
use crate::readiness_gate::ReadinessGate;
use crate::roster_ledger::{RosterLedger, RosterSubmission};

/// Shared state handed to every handler.
#[derive(Debug, Clone, Getters)]
pub struct AppState {
    ledger: RosterLedger,
    pairing: PairingService,
    readiness: ReadinessGate,
    approval: ApprovalService,
    identity: Arc<dyn IdentityProvider>,
}

impl AppState {
    /// Builds the services over one repository.
    #[instrument(skip(repository, config, identity))]
    pub fn new(
        repository: CampaignRepository,
        config: &CampaignConfig,
        identity: Arc<dyn IdentityProvider>,
    ) -> Self {
        let retry = config.retry_policy();
        Self {
            ledger: RosterLedger::new(repository.clone(), config.cost_names()),
            pairing: PairingService::new(repository.clone()),
            readiness: ReadinessGate::new(repository.clone(), retry),
            approval: ApprovalService::new(repository, retry),
            identity,
        }
    }

    /// Opens the configured database, applies pending migrations and trusts
    /// gateway identity headers.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the database cannot be opened or migrated.
    #[instrument(skip(config), fields(database = %config.database_path()))]
    pub fn from_config(config: &CampaignConfig) -> Result<Self, DbError> {
        let repository = CampaignRepository::new(config.database_path().clone())?
            .with_busy_timeout(*config.busy_timeout_ms());
        let applied = repository.run_migrations()?;
        info!(applied, "Database ready");
        Ok(Self::new(repository, config, Arc::new(GatewayHeaders)))
    }
}

/// Builds the router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/campaigns/{campaign_id}/rosters", post(submit_roster))
        .route("/campaigns/{campaign_id}/warbands", get(list_warbands))
        .route(
            "/campaigns/{campaign_id}/games",
            post(propose_game).get(list_games),
        )
        .route("/rosters/{roster_id}", put(replace_roster).delete(delete_roster))
        .route("/warbands/{warband_id}/rosters", get(list_rosters))
        .route("/warbands/{warband_id}/rosters/latest", get(latest_roster))
        .route("/warbands/{warband_id}/status", post(review_warband))
        .route("/games/{game_id}", get(get_game).delete(cancel_game))
        .route("/games/{game_id}/ready", post(mark_ready))
        .route("/games/{game_id}/result", post(submit_result))
        .route("/games/{game_id}/approve", post(approve_result))
        .route("/games/{game_id}/reject", post(reject_result))
        .layer(ServiceBuilder::new().map_request(|req: Request<Body>| {
            info!(method = %req.method(), uri = %req.uri(), "Incoming HTTP request");
            req
        }))
        .with_state(state)
}

// ─────────────────────────────────────────────────────────────
//  Errors
// ─────────────────────────────────────────────────────────────

/// Error response body: `{"error": <kind>, "message": <reason>}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Machine-readable error kind.
    pub error: String,
    /// Human-readable reason.
    pub message: String,
}

/// A [`CampaignError`] on its way to the client.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    body: ErrorBody,
}

impl ApiError {
    fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            body: ErrorBody {
                error: "internal".to_string(),
                message: message.into(),
            },
        }
    }
}

/// HTTP status for each error kind.
pub fn status_for(err: &CampaignError) -> StatusCode {
    match err {
        CampaignError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
        CampaignError::Unauthorized(_) => StatusCode::FORBIDDEN,
        CampaignError::NotFound(_) => StatusCode::NOT_FOUND,
        CampaignError::InvalidState(_)
        | CampaignError::ConflictingSchedule(_)
        | CampaignError::AlreadyExists(_) => StatusCode::CONFLICT,
        CampaignError::MalformedInput(_) => StatusCode::UNPROCESSABLE_ENTITY,
        CampaignError::Conflict(_) => StatusCode::SERVICE_UNAVAILABLE,
        CampaignError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl From<CampaignError> for ApiError {
    fn from(err: CampaignError) -> Self {
        let status = status_for(&err);
        if status.is_server_error() {
            error!(error = %err, "Request failed");
        } else {
            debug!(error = %err, "Request refused");
        }
        let message = match &err {
            CampaignError::Database(_) => "database operation failed".to_string(),
            other => other.to_string(),
        };
        Self {
            status,
            body: ErrorBody {
                error: err.kind().to_string(),
                message,
            },
        }
    }
}

impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        CampaignError::from(err).into()
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

impl FromRequestParts<AppState> for Actor {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        state.identity.identify(&parts.headers).map_err(|err| {
            warn!(uri = %parts.uri, error = %err, "Identity rejected");
            ApiError::from(err)
        })
    }
}

/// A record id taken from the path.
///
/// Unparseable ids are refused with the usual error body.
#[derive(Debug, Clone, Copy)]
pub struct PathId(pub i32);

impl<S> FromRequestParts<S> for PathId
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let extracted = Path::<i32>::from_request_parts(parts, state).await;
        match extracted {
            Ok(Path(id)) => Ok(Self(id)),
            Err(rejection) => {
                warn!(uri = %parts.uri, "Invalid id in path");
                Err(CampaignError::MalformedInput(format!(
                    "invalid id in path {}: {}",
                    parts.uri.path(),
                    rejection.body_text()
                ))
                .into())
            }
        }
    }
}

/// A JSON request body.
///
/// Bodies that are not JSON or do not fit `T` are refused with the usual
/// error body.
#[derive(Debug, Clone)]
pub struct Payload<T>(pub T);

impl<S, T> FromRequest<S> for Payload<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = ApiError;

    async fn from_request(req: Request<Body>, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            Err(rejection) => {
                warn!(status = %rejection.status(), "Request body rejected");
                Err(CampaignError::MalformedInput(rejection.body_text()).into())
            }
        }
    }
}

/// Runs a service call on the blocking pool.
async fn blocking<T, F>(call: F) -> ApiResult<T>
where
    F: FnOnce() -> Result<T, CampaignError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(call)
        .await
        .map_err(|e| ApiError::internal(format!("worker task failed: {e}")))?
        .map_err(ApiError::from)
}

// ─────────────────────────────────────────────────────────────
//  Views and request bodies
// ─────────────────────────────────────────────────────────────

/// A game as returned to clients, with the result lists decoded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameView {
    /// Game id.
    pub id: i32,
    /// Owning campaign.
    pub campaign_id: i32,
    /// Warband in slot 1 (the proposer).
    pub warband_1_id: i32,
    /// Warband in slot 2.
    pub warband_2_id: i32,
    /// Roster snapshot for slot 1.
    pub roster_1_id: Option<i32>,
    /// Roster snapshot for slot 2.
    pub roster_2_id: Option<i32>,
    /// Slot 1 warband's game number.
    pub game_number_1: i32,
    /// Slot 2 warband's game number.
    pub game_number_2: i32,
    /// Lifecycle status.
    pub status: GameStatus,
    /// Slot 1 is ready.
    pub ready_1: bool,
    /// Slot 2 is ready.
    pub ready_2: bool,
    /// Slot 1 approved the pending result.
    pub approved_1: bool,
    /// Slot 2 approved the pending result.
    pub approved_2: bool,
    /// Result data for both slots.
    pub report: ResultReport,
    /// Player who last submitted a result.
    pub submitted_by: Option<i32>,
    /// Optimistic concurrency version.
    pub version: i32,
    /// Creation time.
    pub created_at: NaiveDateTime,
    /// Last change.
    pub updated_at: NaiveDateTime,
}

impl TryFrom<&Game> for GameView {
    type Error = DbError;

    fn try_from(game: &Game) -> Result<Self, Self::Error> {
        Ok(Self {
            id: *game.id(),
            campaign_id: *game.campaign_id(),
            warband_1_id: *game.warband_1_id(),
            warband_2_id: *game.warband_2_id(),
            roster_1_id: *game.roster_1_id(),
            roster_2_id: *game.roster_2_id(),
            game_number_1: *game.game_number_1(),
            game_number_2: *game.game_number_2(),
            status: game.parse_status()?,
            ready_1: *game.ready_1(),
            ready_2: *game.ready_2(),
            approved_1: *game.approved_1(),
            approved_2: *game.approved_2(),
            report: game.report()?,
            submitted_by: *game.submitted_by(),
            version: *game.version(),
            created_at: *game.created_at(),
            updated_at: *game.updated_at(),
        })
    }
}

fn view(game: &Game) -> ApiResult<Json<GameView>> {
    Ok(Json(GameView::try_from(game)?))
}

/// Body of a roster upload.
///
/// `roster` is either the raw export text or the export as a JSON object.
#[derive(Debug, Clone, Deserialize)]
pub struct RosterUpload {
    /// Existing warband to append to; omitted to found a new warband.
    #[serde(default)]
    pub warband_id: Option<i32>,
    /// The roster export.
    pub roster: Value,
}

/// Raw export text, whether it arrived as a string or as inline JSON.
fn payload_text(roster: Value) -> String {
    match roster {
        Value::String(text) => text,
        other => other.to_string(),
    }
}

/// Body of a roster replacement.
#[derive(Debug, Clone, Deserialize)]
pub struct RosterReplacement {
    /// The roster export.
    pub roster: Value,
}

/// Body of a warband review.
#[derive(Debug, Clone, Deserialize)]
pub struct WarbandReview {
    /// New status.
    pub status: WarbandStatus,
}

// ─────────────────────────────────────────────────────────────
//  Handlers
// ─────────────────────────────────────────────────────────────

async fn health() -> &'static str {
    "ok"
}

#[instrument(skip(state, upload), fields(player_id = actor.player_id()))]
async fn submit_roster(
    State(state): State<AppState>,
    actor: Actor,
    PathId(campaign_id): PathId,
    Payload(upload): Payload<RosterUpload>,
) -> ApiResult<(StatusCode, Json<RosterSubmission>)> {
    let ledger = state.ledger.clone();
    let warband_id = upload.warband_id;
    let payload = payload_text(upload.roster);
    let submission =
        blocking(move || ledger.apply_roster(&actor, campaign_id, warband_id, payload)).await?;
    Ok((StatusCode::CREATED, Json(submission)))
}

#[instrument(skip(state, body), fields(player_id = actor.player_id()))]
async fn replace_roster(
    State(state): State<AppState>,
    actor: Actor,
    PathId(roster_id): PathId,
    Payload(body): Payload<RosterReplacement>,
) -> ApiResult<Json<Roster>> {
    let ledger = state.ledger.clone();
    let payload = payload_text(body.roster);
    let roster =
        blocking(move || ledger.replace_roster_payload(&actor, roster_id, payload)).await?;
    Ok(Json(roster))
}

#[instrument(skip(state), fields(player_id = actor.player_id()))]
async fn delete_roster(
    State(state): State<AppState>,
    actor: Actor,
    PathId(roster_id): PathId,
) -> ApiResult<Json<Roster>> {
    let ledger = state.ledger.clone();
    Ok(Json(blocking(move || ledger.delete_roster(&actor, roster_id)).await?))
}

#[instrument(skip(state, _actor))]
async fn list_rosters(
    State(state): State<AppState>,
    _actor: Actor,
    PathId(warband_id): PathId,
) -> ApiResult<Json<Vec<Roster>>> {
    let ledger = state.ledger.clone();
    Ok(Json(blocking(move || ledger.rosters(warband_id)).await?))
}

#[instrument(skip(state, _actor))]
async fn latest_roster(
    State(state): State<AppState>,
    _actor: Actor,
    PathId(warband_id): PathId,
) -> ApiResult<Json<Roster>> {
    let ledger = state.ledger.clone();
    Ok(Json(blocking(move || ledger.latest_roster(warband_id)).await?))
}

#[instrument(skip(state, body), fields(player_id = actor.player_id()))]
async fn review_warband(
    State(state): State<AppState>,
    actor: Actor,
    PathId(warband_id): PathId,
    Payload(body): Payload<WarbandReview>,
) -> ApiResult<Json<Warband>> {
    let ledger = state.ledger.clone();
    Ok(Json(
        blocking(move || ledger.review_warband(&actor, warband_id, body.status)).await?,
    ))
}

#[instrument(skip(state, _actor))]
async fn list_warbands(
    State(state): State<AppState>,
    _actor: Actor,
    PathId(campaign_id): PathId,
) -> ApiResult<Json<Vec<Warband>>> {
    let ledger = state.ledger.clone();
    Ok(Json(blocking(move || ledger.warbands(campaign_id)).await?))
}

#[instrument(skip(state), fields(player_id = actor.player_id()))]
async fn propose_game(
    State(state): State<AppState>,
    actor: Actor,
    PathId(campaign_id): PathId,
    Payload(proposal): Payload<GameProposal>,
) -> ApiResult<(StatusCode, Json<GameView>)> {
    let pairing = state.pairing.clone();
    let game = blocking(move || pairing.propose_game(&actor, campaign_id, &proposal)).await?;
    Ok((StatusCode::CREATED, view(&game)?))
}

#[instrument(skip(state, _actor))]
async fn list_games(
    State(state): State<AppState>,
    _actor: Actor,
    PathId(campaign_id): PathId,
) -> ApiResult<Json<Vec<GameView>>> {
    let pairing = state.pairing.clone();
    let games = blocking(move || pairing.games(campaign_id)).await?;
    let views = games
        .iter()
        .map(GameView::try_from)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Json(views))
}

#[instrument(skip(state, _actor))]
async fn get_game(
    State(state): State<AppState>,
    _actor: Actor,
    PathId(game_id): PathId,
) -> ApiResult<Json<GameView>> {
    let pairing = state.pairing.clone();
    let game = blocking(move || pairing.game(game_id)).await?;
    view(&game)
}

#[instrument(skip(state), fields(player_id = actor.player_id()))]
async fn cancel_game(
    State(state): State<AppState>,
    actor: Actor,
    PathId(game_id): PathId,
) -> ApiResult<StatusCode> {
    let pairing = state.pairing.clone();
    blocking(move || pairing.cancel_game(&actor, game_id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state), fields(player_id = actor.player_id()))]
async fn mark_ready(
    State(state): State<AppState>,
    actor: Actor,
    PathId(game_id): PathId,
) -> ApiResult<Json<GameView>> {
    let readiness = state.readiness.clone();
    let game = blocking(move || readiness.mark_ready(&actor, game_id)).await?;
    view(&game)
}

#[instrument(skip(state, submission), fields(player_id = actor.player_id()))]
async fn submit_result(
    State(state): State<AppState>,
    actor: Actor,
    PathId(game_id): PathId,
    Payload(submission): Payload<ResultSubmission>,
) -> ApiResult<Json<GameView>> {
    let approval = state.approval.clone();
    let game = blocking(move || approval.submit_result(&actor, game_id, submission)).await?;
    view(&game)
}

#[instrument(skip(state), fields(player_id = actor.player_id()))]
async fn approve_result(
    State(state): State<AppState>,
    actor: Actor,
    PathId(game_id): PathId,
) -> ApiResult<Json<GameView>> {
    let approval = state.approval.clone();
    let game = blocking(move || approval.approve(&actor, game_id)).await?;
    view(&game)
}

#[instrument(skip(state), fields(player_id = actor.player_id()))]
async fn reject_result(
    State(state): State<AppState>,
    actor: Actor,
    PathId(game_id): PathId,
) -> ApiResult<Json<GameView>> {
    let approval = state.approval.clone();
    let game = blocking(move || approval.reject(&actor, game_id)).await?;
    view(&game)
}
