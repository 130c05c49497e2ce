use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    Router, middleware,
    routing::{delete, get, post},
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use nudge_api::auth::{self, AppState, AppStateInner};
use nudge_api::middleware::require_auth;
use nudge_api::{friends, invites, messages, notifications, users};
use nudge_core::ChatEngine;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "nudge=debug,tower_http=debug".into()),
        )
        .init();

    // Config
    let jwt_secret =
        std::env::var("NUDGE_JWT_SECRET").unwrap_or_else(|_| "dev-secret-change-me".into());
    let db_path = std::env::var("NUDGE_DB_PATH").unwrap_or_else(|_| "nudge.db".into());
    let host = std::env::var("NUDGE_HOST").unwrap_or_else(|_| "0.0.0.0".into());
    let port: u16 = std::env::var("NUDGE_PORT")
        .unwrap_or_else(|_| "3000".into())
        .parse()?;

    // Init database + engine
    let db = nudge_db::Database::open(&PathBuf::from(&db_path))?;
    let engine = Arc::new(ChatEngine::new(Arc::new(db)));

    let app_state: AppState = Arc::new(AppStateInner { engine, jwt_secret });

    // Routes
    let public_routes = Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .with_state(app_state.clone());

    let protected_routes = Router::new()
        .route("/auth/change-password", post(auth::change_password))
        .route("/users/search", get(users::search))
        .route("/users/active", get(users::active))
        .route("/messages", post(messages::send_message))
        .route("/messages/thread", get(messages::get_thread))
        .route("/messages/inbox", get(messages::inbox))
        .route("/messages/{message_id}/delete", post(messages::soft_delete_message))
        .route("/threads/{thread_id}/hide", post(messages::hide_thread))
        .route("/friends/requests", post(friends::send_request))
        .route("/friends/requests/respond", post(friends::respond))
        .route("/friends/requests/pending", get(friends::pending))
        .route("/friends/status", get(friends::relationship_status))
        .route("/friends", get(friends::list).delete(friends::remove))
        .route("/invites", post(invites::create))
        .route("/invites/accept", post(invites::accept))
        .route("/invites/{code}", get(invites::status))
        .route("/notifications", get(notifications::list))
        .route("/notifications/unread-count", get(notifications::unread_count))
        .route("/notifications/mark-read", post(notifications::mark_read))
        .route("/notifications/mark-all-read", post(notifications::mark_all_read))
        .route("/notifications/{notification_id}", delete(notifications::delete))
        .layer(middleware::from_fn(require_auth))
        .with_state(app_state);

    let app = Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("Nudge server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
