//! HTTP handlers: decode the request, call the auth core, encode the
//! answer.
//!
//! Bodies are taken as raw bytes and decoded with the server's [`Codec`],
//! so a bad body is our `400 {"error": ...}` rather than axum's own
//! rejection. Handlers hold no state of their own.

use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::header;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use poisson_directory::Directory;
use poisson_protocol::{
    Codec, LoginRequest, LogoutRequest, PasswordRequest, UpdateRequest,
    UsersQuery,
};

use crate::server::ServerState;
use crate::{AuthError, SessionsReport};

/// Builds the service's routes over `state`.
pub(crate) fn router<D, C>(state: Arc<ServerState<D, C>>) -> Router
where
    D: Directory,
    C: Codec,
{
    Router::new()
        .route("/status", get(status::<D, C>))
        .route("/login", post(login::<D, C>))
        .route("/logout", post(logout::<D, C>))
        .route("/users", get(users::<D, C>))
        .route("/update", post(update::<D, C>))
        .route("/password", post(password::<D, C>))
        .route("/debug", get(debug::<D, C>))
        .with_state(state)
}

/// `GET /status`: `true` if the directory answers.
async fn status<D: Directory, C: Codec>(
    State(state): State<Arc<ServerState<D, C>>>,
) -> Json<bool> {
    Json(state.core.status().await)
}

/// `POST /login`: the session token, as plain text.
async fn login<D: Directory, C: Codec>(
    State(state): State<Arc<ServerState<D, C>>>,
    body: Bytes,
) -> Result<impl IntoResponse, AuthError> {
    let request: LoginRequest = state.codec.decode(&body)?;
    let token = state.core.login(&request.username, request.password).await?;

    Ok((
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        token.to_string(),
    ))
}

/// `POST /logout`
async fn logout<D: Directory, C: Codec>(
    State(state): State<Arc<ServerState<D, C>>>,
    body: Bytes,
) -> Result<Json<bool>, AuthError> {
    let request: LogoutRequest = state.codec.decode(&body)?;
    state.core.logout(&request.token.into()).await?;
    Ok(Json(true))
}

/// `GET /users?username=<uid>`: one profile, or all of them without a
/// username.
async fn users<D: Directory, C: Codec>(
    State(state): State<Arc<ServerState<D, C>>>,
    Query(query): Query<UsersQuery>,
) -> Result<axum::response::Response, AuthError> {
    let response = match query.user() {
        Some(user) => Json(state.core.profile(&user).await?).into_response(),
        None => Json(state.core.profiles().await?).into_response(),
    };
    Ok(response)
}

/// `POST /update`
async fn update<D: Directory, C: Codec>(
    State(state): State<Arc<ServerState<D, C>>>,
    body: Bytes,
) -> Result<Json<bool>, AuthError> {
    let request: UpdateRequest = state.codec.decode(&body)?;
    state
        .core
        .update_property(&request.token.into(), &request.property, &request.value)
        .await?;
    Ok(Json(true))
}

/// `POST /password`
async fn password<D: Directory, C: Codec>(
    State(state): State<Arc<ServerState<D, C>>>,
    body: Bytes,
) -> Result<Json<bool>, AuthError> {
    let request: PasswordRequest = state.codec.decode(&body)?;
    state
        .core
        .change_password(&request.token.into(), request.password)
        .await?;
    Ok(Json(true))
}

/// `GET /debug`
async fn debug<D: Directory, C: Codec>(
    State(state): State<Arc<ServerState<D, C>>>,
) -> Json<SessionsReport> {
    Json(state.core.sessions_report().await)
}
