use axum::{
    Extension, Json,
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;

use nudge_db::models::UserRow;
use nudge_db::parse_timestamp;
use nudge_types::api::{Claims, UserSearchResponse};
use nudge_types::models::User;

use crate::auth::AppState;
use crate::blocking;

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: String,
    #[serde(default = "default_limit")]
    pub limit: u32,
}

fn default_limit() -> u32 {
    20
}

pub async fn search(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
    Extension(_claims): Extension<Claims>,
) -> Result<impl IntoResponse, StatusCode> {
    if query.q.trim().len() < 2 {
        return Err(StatusCode::BAD_REQUEST);
    }

    let engine = state.engine.clone();
    let q = query.q.trim().to_string();
    let limit = query.limit.min(100);
    let rows = blocking(move || Ok(engine.db().search_users(&q, limit)?)).await?;

    let users: Vec<User> = rows.into_iter().map(user_view).collect();
    Ok(Json(UserSearchResponse {
        count: users.len(),
        users,
    }))
}

pub async fn active(
    State(state): State<AppState>,
    Extension(_claims): Extension<Claims>,
) -> Result<impl IntoResponse, StatusCode> {
    let engine = state.engine.clone();
    let rows = blocking(move || Ok(engine.db().list_active_users()?)).await?;

    let users: Vec<User> = rows.into_iter().map(user_view).collect();
    Ok(Json(UserSearchResponse {
        count: users.len(),
        users,
    }))
}

fn user_view(row: UserRow) -> User {
    User {
        id: row.id.parse().unwrap_or_default(),
        username: row.username,
        email: row.email,
        phone: row.phone,
        active: row.active,
        admin: row.is_admin,
        created_at: parse_timestamp(&row.created_at),
    }
}
