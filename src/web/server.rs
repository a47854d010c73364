use axum::{
    extract::{DefaultBodyLimit, Path, Query, State},
    http::{HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post, put},
    Router,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower::limit::ConcurrencyLimitLayer;
use tower::ServiceBuilder;
use tower_governor::{governor::GovernorConfigBuilder, GovernorLayer};
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::timeout::TimeoutLayer;

use crate::cli::ServeArgs;
use crate::core::pairing::{Pairing, PairingView};
use crate::core::participant::Participant;
use crate::core::types::{DerangementPolicy, ParticipantId, PoolTag};
use crate::matching::coordinator::{MatchCoordinator, MatchReport, RoundError};
use crate::matching::engine::MatchingConfig;
use crate::store::file::FileStore;
use crate::store::{PairingStore, StoreError};
use crate::utils::validation::{validate_new_participant, validate_pool_tag, ValidationError};

/// Request body limit; roster operations carry small JSON documents
pub const MAX_BODY_SIZE: usize = 256 * 1024;

/// Per-request timeout. A timed-out match may be retried as a whole.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Shared application state
pub struct AppState {
    pub store: Arc<dyn PairingStore>,
    /// Defaults for draws triggered through the API
    pub config: MatchingConfig,
}

impl AppState {
    pub fn new(store: Arc<dyn PairingStore>, config: MatchingConfig) -> Self {
        Self { store, config }
    }
}

/// Error response body
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub error_type: String,
    pub details: Option<String>,
}

/// Create a safe error response that prevents information disclosure
/// while logging detailed errors server-side for debugging
pub fn create_safe_error_response(
    error_type: &str,
    user_message: &str,
    internal_error: Option<&str>,
) -> ErrorResponse {
    if let Some(internal_msg) = internal_error {
        tracing::error!("Internal error ({}): {}", error_type, internal_msg);
    }

    ErrorResponse {
        error: user_message.to_string(),
        error_type: error_type.to_string(),
        details: None,
    }
}

/// Handler error: a status code plus a JSON body
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    body: ErrorResponse,
}

impl ApiError {
    fn new(status: StatusCode, error_type: &str, message: impl Into<String>) -> Self {
        Self {
            status,
            body: ErrorResponse {
                error: message.into(),
                error_type: error_type.to_string(),
                details: None,
            },
        }
    }

    fn internal(error_type: &str, user_message: &str, internal: &str) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            body: create_safe_error_response(error_type, user_message, Some(internal)),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        match &e {
            StoreError::UnknownParticipant(_) => {
                Self::new(StatusCode::NOT_FOUND, "unknown_participant", e.to_string())
            }
            StoreError::DuplicateParticipant(_) => {
                Self::new(StatusCode::CONFLICT, "duplicate_participant", e.to_string())
            }
            StoreError::RosterFull(_) => {
                Self::new(StatusCode::CONFLICT, "roster_full", e.to_string())
            }
            StoreError::Ineligible(_)
            | StoreError::CrossPool { .. }
            | StoreError::OutOfScope(_)
            | StoreError::InconsistentWrite(_) => {
                Self::new(StatusCode::CONFLICT, "inconsistent_write", e.to_string())
            }
            StoreError::ReadError(_)
            | StoreError::ParseError(_)
            | StoreError::CommitError(_)
            | StoreError::Poisoned => Self::internal(
                "store_failure",
                "The event store is unavailable",
                &e.to_string(),
            ),
        }
    }
}

impl From<RoundError> for ApiError {
    fn from(e: RoundError) -> Self {
        match e {
            // The roster moved between the read and the commit; safe to retry
            RoundError::Persistence(
                StoreError::Ineligible(_)
                | StoreError::UnknownParticipant(_)
                | StoreError::CrossPool { .. }
                | StoreError::OutOfScope(_),
            ) => Self::new(
                StatusCode::CONFLICT,
                "roster_changed",
                "Roster changed during matching, no changes made",
            ),
            RoundError::Persistence(inner) => Self::internal(
                "persistence_failure",
                "Matching failed, no changes made",
                &inner.to_string(),
            ),
            RoundError::InvalidAssignment { .. } => Self::new(
                StatusCode::UNPROCESSABLE_ENTITY,
                "invalid_assignment",
                e.to_string(),
            ),
            RoundError::EmptyPool(_) => {
                Self::new(StatusCode::NOT_FOUND, "empty_pool", e.to_string())
            }
        }
    }
}

impl From<ValidationError> for ApiError {
    fn from(e: ValidationError) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "validation_failed", e.to_string())
    }
}

/// Run a store-bound operation off the async runtime
async fn blocking<T, F>(state: &Arc<AppState>, f: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce(&dyn PairingStore, &MatchingConfig) -> Result<T, ApiError> + Send + 'static,
{
    let state = Arc::clone(state);
    tokio::task::spawn_blocking(move || f(state.store.as_ref(), &state.config))
        .await
        .map_err(|e| ApiError::internal("task_failure", "Request could not be completed", &e.to_string()))?
}

#[derive(Debug, Deserialize)]
pub struct NewParticipantRequest {
    pub id: String,
    pub pool: String,
    #[serde(default)]
    pub accepted: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct MatchParams {
    pub policy: Option<DerangementPolicy>,
    pub seed: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct AssignRequest {
    pub pairs: Vec<Pairing>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ResetResponse {
    pub cleared: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ParticipantPairingResponse {
    pub id: ParticipantId,
    #[serde(flatten)]
    pub pairing: PairingView,
}

/// Run the web server
///
/// # Errors
///
/// Returns an error if the tokio runtime cannot be created or the server fails to start.
pub fn run(args: ServeArgs, store_path: PathBuf) -> anyhow::Result<()> {
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async move { run_server(args, store_path).await })
}

/// Routes and state, without middleware
pub fn api_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route(
            "/api/participants",
            get(list_participants_handler).post(add_participant_handler),
        )
        .route(
            "/api/participants/{id}",
            axum::routing::delete(remove_participant_handler),
        )
        .route("/api/participants/{id}/accept", post(accept_handler))
        .route("/api/participants/{id}/revoke", post(revoke_handler))
        .route("/api/participants/{id}/pairing", get(pairing_of_handler))
        .route("/api/match", post(match_handler))
        .route("/api/pairings", get(pairings_handler))
        .route("/api/pairings/reset", post(reset_handler))
        .route("/api/pools/{pool}/pairings", put(assign_handler))
        .with_state(state)
}

/// Create the application router with all routes and middleware configured.
///
/// # Errors
///
/// Returns an error if the rate limiter configuration is rejected.
pub fn create_router(state: Arc<AppState>) -> anyhow::Result<Router> {
    let governor_conf = GovernorConfigBuilder::default()
        .per_second(10)
        .burst_size(50)
        .finish()
        .ok_or_else(|| anyhow::anyhow!("invalid rate limiter configuration"))?;

    let app = api_router(state).layer(
        ServiceBuilder::new()
            .layer(SetResponseHeaderLayer::if_not_present(
                HeaderName::from_static("x-content-type-options"),
                HeaderValue::from_static("nosniff"),
            ))
            .layer(SetResponseHeaderLayer::if_not_present(
                HeaderName::from_static("x-frame-options"),
                HeaderValue::from_static("DENY"),
            ))
            .layer(SetResponseHeaderLayer::if_not_present(
                HeaderName::from_static("referrer-policy"),
                HeaderValue::from_static("no-referrer"),
            ))
            // IP-based rate limiting
            .layer(GovernorLayer {
                config: Arc::new(governor_conf),
            })
            .layer(TimeoutLayer::with_status_code(
                StatusCode::REQUEST_TIMEOUT,
                REQUEST_TIMEOUT,
            ))
            .layer(ConcurrencyLimitLayer::new(100))
            .layer(DefaultBodyLimit::max(MAX_BODY_SIZE)),
    );

    Ok(app)
}

async fn run_server(args: ServeArgs, store_path: PathBuf) -> anyhow::Result<()> {
    let store: Arc<dyn PairingStore> = Arc::new(FileStore::open(&store_path));
    let config = MatchingConfig {
        policy: args.policy,
        seed: None,
    };
    let app = create_router(Arc::new(AppState::new(store, config)))?;

    let addr = format!("{}:{}", args.address, args.port);
    tracing::info!("Serving event store {}", store_path.display());
    println!("Starting secret-santa server at http://{addr}");

    let listener = TcpListener::bind(&addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}

async fn list_participants_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Participant>>, ApiError> {
    blocking(&state, |store, _| Ok(store.participants()?))
        .await
        .map(Json)
}

async fn add_participant_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<NewParticipantRequest>,
) -> Result<(StatusCode, Json<Participant>), ApiError> {
    let mut participant = Participant::new(request.id, request.pool);
    participant.accepted = request.accepted;

    validate_new_participant(&participant)?;
    let added = blocking(&state, move |store, _| Ok(store.add_participant(participant)?))
        .await?;

    Ok((StatusCode::CREATED, Json(added)))
}

async fn accept_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Participant>, ApiError> {
    let id = ParticipantId::new(id);
    blocking(&state, move |store, _| Ok(store.set_accepted(&id, true)?))
        .await
        .map(Json)
}

async fn revoke_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Participant>, ApiError> {
    let id = ParticipantId::new(id);
    blocking(&state, move |store, _| Ok(store.set_accepted(&id, false)?))
        .await
        .map(Json)
}

async fn remove_participant_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Participant>, ApiError> {
    let id = ParticipantId::new(id);
    blocking(&state, move |store, _| Ok(store.remove_participant(&id)?))
        .await
        .map(Json)
}

async fn pairing_of_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ParticipantPairingResponse>, ApiError> {
    let id = ParticipantId::new(id);
    blocking(&state, move |store, _| {
        let pairing = store.pairing_of(&id)?;
        Ok(ParticipantPairingResponse { id, pairing })
    })
    .await
    .map(Json)
}

/// Draw and commit a new round. Pools that could not be matched are reported
/// in the body; only a failed commit is an error.
async fn match_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<MatchParams>,
) -> Result<Json<MatchReport>, ApiError> {
    let start_time = std::time::Instant::now();

    let report = blocking(&state, move |store, defaults| {
        let config = MatchingConfig {
            policy: params.policy.unwrap_or(defaults.policy),
            seed: params.seed.or(defaults.seed),
        };
        Ok(MatchCoordinator::with_config(store, config).run_match()?)
    })
    .await?;

    tracing::debug!(
        "Match round served in {} ms",
        start_time.elapsed().as_millis()
    );
    Ok(Json(report))
}

async fn pairings_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Pairing>>, ApiError> {
    blocking(&state, |store, _| Ok(store.pairings()?))
        .await
        .map(Json)
}

async fn reset_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ResetResponse>, ApiError> {
    blocking(&state, |store, _| {
        let cleared = MatchCoordinator::new(store).reset()?;
        Ok(ResetResponse { cleared })
    })
    .await
    .map(Json)
}

async fn assign_handler(
    State(state): State<Arc<AppState>>,
    Path(pool): Path<String>,
    Json(request): Json<AssignRequest>,
) -> Result<Json<Vec<Pairing>>, ApiError> {
    let pool = PoolTag::new(pool);
    validate_pool_tag(&pool)?;

    blocking(&state, move |store, _| {
        MatchCoordinator::new(store).assign_pool(&pool, &request.pairs)?;
        Ok(request.pairs)
    })
    .await
    .map(Json)
}
