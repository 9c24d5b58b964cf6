use axum::{
    body::Bytes,
    extract::{Query, State},
    http::Uri,
    Json,
};

use crate::domain::models::{ExecQuery, ExecResponse};
use crate::domain::services::{render, RequestTranslator};
use crate::error::AppResult;
use crate::infrastructure::SharedStore;

#[derive(Clone)]
pub struct GatewayState {
    pub store: SharedStore,
    pub translator: RequestTranslator,
}

#[utoipa::path(
    post,
    path = "/shell/exec/{command}",
    params(
        ("command" = String, Path, description = "Store command, e.g. GET or JSON.SET"),
        ExecQuery
    ),
    request_body(
        content = Vec<String>,
        description = "JSON array of arguments, or a JSON object of named arguments",
        content_type = "application/json"
    ),
    responses(
        (status = 200, description = "Command executed", body = ExecResponse),
        (status = 400, description = "Malformed request or command rejected by the store"),
        (status = 403, description = "Command is blocked or origin not allowed"),
        (status = 429, description = "Request limit for the current window exceeded"),
        (status = 503, description = "Store unavailable")
    ),
    tag = "Shell"
)]
pub async fn execute_command(
    State(state): State<GatewayState>,
    uri: Uri,
    Query(query): Query<ExecQuery>,
    body: Bytes,
) -> AppResult<Json<ExecResponse>> {
    let command = state
        .translator
        .translate(uri.path(), query.key_prefix.as_deref(), &body)?;

    tracing::debug!(command = %command.name, args = command.args.len(), "Executing command");

    let reply = state.store.execute(&command).await?;
    let data = render(&command.name, &reply)?;

    Ok(Json(ExecResponse { data }))
}
