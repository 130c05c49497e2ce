use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};

use nudge_core::invites;
use nudge_db::parse_timestamp;
use nudge_types::api::{
    AcceptInviteRequest, AcceptInviteResponse, Claims, CreateInviteRequest, CreateInviteResponse,
    InviteStatusResponse,
};

use crate::auth::AppState;
use crate::blocking;
use crate::notify::Channel;

pub async fn create(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateInviteRequest>,
) -> Result<impl IntoResponse, StatusCode> {
    let engine = state.engine.clone();
    let creator_id = claims.sub.to_string();
    let creator_name = claims.username.clone();
    let created = blocking(move || {
        let created = invites::create(
            &engine,
            &creator_id,
            &req.recipient1,
            &req.recipient2,
            req.expires_in_hours,
        )?;

        // Fan out one delivery per recipient on the best available
        // channel; delivery failures don't fail invite creation.
        for recipient in [&req.recipient1, &req.recipient2] {
            if let Ok(Some(channel)) = Channel::select(engine.db(), recipient) {
                if let Err(err) = channel.deliver(engine.db(), &creator_name, &created.code) {
                    tracing::warn!("invite delivery failed: {:#}", err);
                }
            }
        }
        Ok(created)
    })
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(CreateInviteResponse {
            code: created.code,
            expires_at: created.expires_at,
        }),
    ))
}

pub async fn accept(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<AcceptInviteRequest>,
) -> Result<impl IntoResponse, StatusCode> {
    let engine = state.engine.clone();
    let user_id = claims.sub.to_string();
    let outcome =
        blocking(move || invites::accept(&engine, &req.code, &user_id, req.recipient_number))
            .await?;

    Ok(Json(AcceptInviteResponse {
        both_accepted: outcome.both_accepted,
        thread_id: outcome.thread_id,
    }))
}

pub async fn status(
    State(state): State<AppState>,
    Path(code): Path<String>,
    Extension(_claims): Extension<Claims>,
) -> Result<impl IntoResponse, StatusCode> {
    let engine = state.engine.clone();
    let row = blocking(move || invites::status(&engine, &code)).await?;

    Ok(Json(InviteStatusResponse {
        code: row.code,
        recipient1_accepted: row.recipient1_accepted,
        recipient2_accepted: row.recipient2_accepted,
        thread_id: row.thread_id,
        expires_at: row.expires_at.as_deref().map(parse_timestamp),
    }))
}
