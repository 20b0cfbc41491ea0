//! API routes for the Garudata server

pub mod collections;
pub mod convert;
pub mod search;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::server::state::AppState;

/// Build all API routes
pub fn api_routes(max_upload_size: usize) -> Router<AppState> {
    Router::new()
        // Conversion - uploads get the configured body limit
        .route(
            "/convert/db",
            post(convert::convert_db).layer(DefaultBodyLimit::max(max_upload_size)),
        )
        .route(
            "/convert/csv",
            post(convert::convert_csv).layer(DefaultBodyLimit::max(max_upload_size)),
        )
        .route(
            "/convert/xlsx",
            post(convert::convert_xlsx).layer(DefaultBodyLimit::max(max_upload_size)),
        )
        // Search
        .route("/search", post(search::search))
        // Collections
        .route("/collections/recent", get(collections::list_recent))
        .route("/collections/:name/preview", get(collections::preview))
        .route("/collections/:name/download", get(collections::download))
        // Info
        .route("/info", get(info))
}

/// API info endpoint
async fn info() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "name": "garudata",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "Convert SQLite tables, CSV files and spreadsheets into JSON collections and search across them",
        "endpoints": {
            "POST /api/convert/db": "Convert a table of an uploaded SQLite database (db_file, table_name)",
            "POST /api/convert/csv": "Convert an uploaded CSV / TSV file (csv_file)",
            "POST /api/convert/xlsx": "Convert the active sheet of an uploaded workbook (xlsx_file)",
            "POST /api/search": "Keyword search across all collections",
            "GET /api/collections/recent": "Most recent conversions",
            "GET /api/collections/:name/preview": "First records of a collection",
            "GET /api/collections/:name/download": "Download a collection as JSON"
        }
    }))
}
