use axum::{extract::Query, Json};

use crate::domain::models::{SearchQuery, SearchResponse};
use crate::domain::services::search_commands;

#[utoipa::path(
    get,
    path = "/search",
    params(SearchQuery),
    responses(
        (status = 200, description = "Matching commands", body = SearchResponse)
    ),
    tag = "Search"
)]
pub async fn search(Query(query): Query<SearchQuery>) -> Json<SearchResponse> {
    Json(search_commands(query.q.as_deref().unwrap_or_default()))
}
