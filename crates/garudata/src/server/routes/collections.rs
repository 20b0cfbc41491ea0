//! Collection listing, preview and download endpoints

use axum::{
    extract::{Path, Query, State},
    http::header,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::server::state::AppState;
use crate::types::{CatalogEntry, Record};

/// Query parameters for the recent conversions listing
#[derive(Debug, Deserialize)]
pub struct RecentQuery {
    /// Limit results (default from `catalog.recent_limit`)
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct RecentResponse {
    pub conversions: Vec<CatalogEntry>,
    pub total: usize,
}

#[derive(Debug, Serialize)]
pub struct PreviewResponse {
    pub collection: String,
    pub records: Vec<Record>,
    /// Records in the whole collection
    pub total: usize,
}

/// GET /api/collections/recent - Most recent conversions first
pub async fn list_recent(
    State(state): State<AppState>,
    Query(params): Query<RecentQuery>,
) -> Result<Json<RecentResponse>> {
    let limit = params
        .limit
        .unwrap_or(state.config().catalog.recent_limit);
    let conversions = state.garudata().list_recent(limit)?;

    Ok(Json(RecentResponse {
        total: conversions.len(),
        conversions,
    }))
}

/// GET /api/collections/:name/preview - First records of a collection
pub async fn preview(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<PreviewResponse>> {
    let records = state.garudata().preview(&name)?;
    let total = state.garudata().store().get(&name)?.len();

    Ok(Json(PreviewResponse {
        collection: name,
        records,
        total,
    }))
}

/// GET /api/collections/:name/download - Collection JSON as an attachment
pub async fn download(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<impl IntoResponse> {
    let data = state.garudata().fetch_collection(&name).await?;
    let disposition = format!(
        "attachment; filename=\"{}.json\"",
        name.replace('"', "_")
    );

    Ok((
        [
            (header::CONTENT_TYPE, "application/json".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        data,
    ))
}

#[cfg(test)]
mod tests {
    use axum::{
        body::Body,
        http::{header, Request, StatusCode},
    };
    use tower::ServiceExt;

    use crate::server::routes::tests::{json_body, multipart_body, multipart_request, test_router};

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    async fn upload(app: &axum::Router, filename: &str, content: &str) {
        let body = multipart_body(&[], Some(("csv_file", filename, content.as_bytes())));
        let response = app
            .clone()
            .oneshot(multipart_request("/api/convert/csv", body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_recent_preview_download() {
        let dir = tempfile::tempdir().unwrap();
        let app = test_router(dir.path());

        let mut rows = String::from("n\n");
        for i in 0..15 {
            rows.push_str(&format!("{}\n", i));
        }
        upload(&app, "numbers.csv", &rows).await;
        upload(&app, "small.csv", "k\nv\n").await;

        let json = json_body(app.clone().oneshot(get("/api/collections/recent")).await.unwrap()).await;
        assert_eq!(json["total"], 2);
        assert_eq!(json["conversions"][0]["collection_name"], "small");

        let json = json_body(
            app.clone()
                .oneshot(get("/api/collections/recent?limit=1"))
                .await
                .unwrap(),
        )
        .await;
        assert_eq!(json["total"], 1);

        let json = json_body(
            app.clone()
                .oneshot(get("/api/collections/numbers/preview"))
                .await
                .unwrap(),
        )
        .await;
        assert_eq!(json["records"].as_array().unwrap().len(), 10);
        assert_eq!(json["records"][0]["n"], "0");
        assert_eq!(json["total"], 15);

        let response = app
            .clone()
            .oneshot(get("/api/collections/small/download"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=\"small.json\""
        );
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&bytes[..], br#"[{"k":"v"}]"#);
    }

    #[tokio::test]
    async fn test_unknown_collection_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let app = test_router(dir.path());

        for uri in ["/api/collections/ghost/preview", "/api/collections/ghost/download"] {
            let response = app.clone().oneshot(get(uri)).await.unwrap();
            assert_eq!(response.status(), StatusCode::NOT_FOUND, "{}", uri);
            assert_eq!(json_body(response).await["error"]["type"], "not_found");
        }
    }
}
