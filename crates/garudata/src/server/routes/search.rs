//! Keyword search endpoint

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::retrieval::SearchOutcome;
use crate::server::state::AppState;
use crate::types::SearchHit;

#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    /// Keyword matched case-insensitively against every field
    #[serde(default)]
    pub keywords: String,
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub results: Vec<SearchHit>,
    pub total: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// POST /api/search - Search all collections
pub async fn search(
    State(state): State<AppState>,
    Json(request): Json<SearchRequest>,
) -> Result<Json<SearchResponse>> {
    let response = match state.garudata().search(&request.keywords).await? {
        SearchOutcome::Matches(results) => SearchResponse {
            total: results.len(),
            results,
            message: None,
        },
        SearchOutcome::NoResults => SearchResponse {
            results: Vec::new(),
            total: 0,
            message: Some("No results found.".to_string()),
        },
    };

    Ok(Json(response))
}
