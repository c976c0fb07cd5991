use axum::http::StatusCode;
use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use axum_extra::TypedHeader;
use chrono::{Duration, Utc};
use std::sync::{Arc, Mutex};
use tower_http::cors::{Any, CorsLayer};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use roleta_core::{LinkError, LinkRegistry, PrizeWheel, RedemptionService, DEFAULT_TTL_SECS};
use roleta_shared::{
    ErrorResponse, GenerateLinkResponse, InvalidReason, RedemptionRecord, SpinResponse,
    ValidateResponse,
};

struct AppState {
    service: RedemptionService,
    redemptions: Mutex<Vec<RedemptionRecord>>,
    api_key: String,
    public_url: String,
}

type AdminAuth = TypedHeader<
    axum_extra::headers::Authorization<axum_extra::headers::authorization::Bearer>,
>;

fn reason_for(err: &LinkError) -> InvalidReason {
    match err {
        LinkError::NotFound => InvalidReason::NotFound,
        LinkError::AlreadyRedeemed { .. } => InvalidReason::AlreadyRedeemed,
        LinkError::Expired => InvalidReason::Expired,
    }
}

async fn route_generate_link(
    State(state): State<Arc<AppState>>,
    TypedHeader(axum_extra::headers::Authorization(bearer)): AdminAuth,
) -> Result<Json<GenerateLinkResponse>, StatusCode> {
    if bearer.token() != state.api_key {
        return Err(StatusCode::UNAUTHORIZED);
    }
    let issued = state.service.generate_link(Utc::now());
    info!(id = %issued.id, "issued spin link");
    Ok(Json(GenerateLinkResponse {
        link: format!("{}/spin/{}", state.public_url, issued.id),
        id: issued.id,
        expires_at: issued.expires_at,
    }))
}

async fn route_validate(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Json<ValidateResponse> {
    match state.service.validate_link(&id, Utc::now()) {
        Ok(()) => Json(ValidateResponse::ok()),
        Err(err) => Json(ValidateResponse::invalid(reason_for(&err), err.to_string())),
    }
}

async fn route_spin(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<SpinResponse>, (StatusCode, Json<ErrorResponse>)> {
    match state.service.redeem_link(&id, Utc::now()) {
        Ok(prize) => {
            info!(id = %id, prize = %prize, "link redeemed");
            state
                .redemptions
                .lock()
                .expect("redemption log lock")
                .push(RedemptionRecord {
                    ts: Utc::now(),
                    link_id: id,
                    prize: prize.clone(),
                });
            Ok(Json(SpinResponse { prize }))
        }
        Err(err) => {
            let status = match err {
                LinkError::NotFound => StatusCode::NOT_FOUND,
                LinkError::AlreadyRedeemed { .. } | LinkError::Expired => StatusCode::BAD_REQUEST,
            };
            let prize = match &err {
                LinkError::AlreadyRedeemed { prize } => Some(prize.clone()),
                _ => None,
            };
            Err((
                status,
                Json(ErrorResponse {
                    error: err.to_string(),
                    reason: reason_for(&err),
                    prize,
                }),
            ))
        }
    }
}

async fn route_admin_redemptions(
    State(state): State<Arc<AppState>>,
    TypedHeader(axum_extra::headers::Authorization(bearer)): AdminAuth,
) -> Result<Json<Vec<RedemptionRecord>>, StatusCode> {
    if bearer.token() != state.api_key {
        return Err(StatusCode::UNAUTHORIZED);
    }
    let records = state
        .redemptions
        .lock()
        .expect("redemption log lock")
        .clone();
    Ok(Json(records))
}

fn load_wheel() -> anyhow::Result<PrizeWheel> {
    match std::env::var("WHEEL_JSON") {
        Ok(json) => Ok(PrizeWheel(serde_json::from_str(&json)?)),
        Err(_) => Ok(PrizeWheel::simple_default()),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let ttl_secs: i64 = match std::env::var("LINK_TTL_SECS") {
        Ok(v) => v.parse()?,
        Err(_) => DEFAULT_TTL_SECS,
    };
    let sweep_secs: u64 = match std::env::var("SWEEP_INTERVAL_SECS") {
        Ok(v) => v.parse()?,
        Err(_) => 60,
    };

    let wheel = load_wheel()?;
    info!(
        prizes = wheel.0.len(),
        total_weight = wheel.total_weight(),
        "prize wheel loaded"
    );

    // A bad prize table must stop the server before it accepts traffic.
    let service = RedemptionService::new(LinkRegistry::new(Duration::seconds(ttl_secs)), wheel)?;

    let state = Arc::new(AppState {
        service,
        redemptions: Mutex::new(Vec::new()),
        api_key: std::env::var("API_KEY").unwrap_or_else(|_| "dev-key".into()),
        public_url: std::env::var("PUBLIC_URL")
            .unwrap_or_else(|_| "http://127.0.0.1:8080".to_string()),
    });

    // Periodic storage compaction. Expiry is re-derived from timestamps on
    // every read, so the interval is a memory tunable, not a correctness one.
    let sweeper = state.clone();
    tokio::spawn(async move {
        let mut tick = tokio::time::interval(std::time::Duration::from_secs(sweep_secs));
        loop {
            tick.tick().await;
            let removed = sweeper.service.sweep_expired(Utc::now());
            if removed > 0 {
                debug!(removed, "swept expired links");
            }
        }
    });

    let app = Router::new()
        .route("/api/generate-link", post(route_generate_link))
        .route("/api/validate-spin/:id", get(route_validate))
        .route("/api/spin/:id", post(route_spin))
        .route("/api/admin/redemptions", get(route_admin_redemptions))
        .with_state(state)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        );

    let addr = std::env::var("BIND").unwrap_or_else(|_| "127.0.0.1:8080".to_string());
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("listening on {addr}");
    axum::serve(listener, app).await?;
    Ok(())
}
