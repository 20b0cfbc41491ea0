//! Upload-and-convert endpoints

use axum::{
    extract::{Multipart, State},
    Json,
};
use serde::Serialize;
use std::path::PathBuf;

use crate::error::{Error, Result};
use crate::server::state::AppState;
use crate::types::{CollectionRef, SourceKind};

/// Extensions accepted for upload
const ALLOWED_EXTENSIONS: &[&str] = &["csv", "tsv", "xlsx", "xls", "ods", "db", "sqlite", "sqlite3"];

/// Response for a successful conversion
#[derive(Debug, Serialize)]
pub struct ConvertResponse {
    pub message: String,
    pub collection: CollectionRef,
}

/// Uploaded source saved in its own directory under the uploads directory
///
/// The directory is removed when the upload is dropped.
struct Upload {
    filename: String,
    path: PathBuf,
    table_name: Option<String>,
    _dir: tempfile::TempDir,
}

/// POST /api/convert/db - Convert a table of an uploaded SQLite database
pub async fn convert_db(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<ConvertResponse>> {
    let upload = receive(&state, multipart, "db_file", SourceKind::Relational).await?;
    let table = upload
        .table_name
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| Error::malformed(&upload.filename, "missing field 'table_name'"))?;

    let collection = state.garudata().convert_relational(&upload.path, table).await?;
    Ok(Json(response(&upload, collection)))
}

/// POST /api/convert/csv - Convert an uploaded CSV / TSV file
pub async fn convert_csv(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<ConvertResponse>> {
    let upload = receive(&state, multipart, "csv_file", SourceKind::Delimited).await?;
    let collection = state.garudata().convert_delimited(&upload.path).await?;
    Ok(Json(response(&upload, collection)))
}

/// POST /api/convert/xlsx - Convert the active sheet of an uploaded workbook
pub async fn convert_xlsx(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<ConvertResponse>> {
    let upload = receive(&state, multipart, "xlsx_file", SourceKind::Spreadsheet).await?;
    let collection = state.garudata().convert_spreadsheet(&upload.path).await?;
    Ok(Json(response(&upload, collection)))
}

fn response(upload: &Upload, collection: CollectionRef) -> ConvertResponse {
    ConvertResponse {
        message: format!(
            "Converted {} into '{}' ({} records)",
            upload.filename, collection.name, collection.record_count
        ),
        collection,
    }
}

/// Read the multipart form, check the file and save it under a fresh upload directory
async fn receive(
    state: &AppState,
    mut multipart: Multipart,
    file_field: &str,
    expected: SourceKind,
) -> Result<Upload> {
    let mut file: Option<(String, Vec<u8>)> = None;
    let mut table_name = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| Error::malformed("upload", format!("Failed to read multipart field: {}", e)))?
    {
        let name = field.name().unwrap_or("").to_string();

        if name == file_field {
            let filename = field.file_name().unwrap_or("").to_string();
            let data = field
                .bytes()
                .await
                .map_err(|e| Error::malformed(&filename, format!("Failed to read file: {}", e)))?;
            file = Some((filename, data.to_vec()));
        } else if name == "table_name" {
            let text = field
                .text()
                .await
                .map_err(|e| Error::malformed("upload", format!("Failed to read table_name: {}", e)))?;
            table_name = Some(text);
        }
    }

    let (original, data) =
        file.ok_or_else(|| Error::malformed("upload", format!("missing field '{}'", file_field)))?;

    let filename = sanitize_filename(&original)
        .ok_or_else(|| Error::malformed("upload", "no file selected"))?;
    check_extension(&filename, expected)?;

    // Same-named uploads must not share a path; the file name itself is kept
    // because it names the collection
    let dir = tempfile::Builder::new()
        .prefix("upload-")
        .tempdir_in(&state.config().storage.uploads_dir)?;
    let path = dir.path().join(&filename);
    tokio::fs::write(&path, &data).await?;

    tracing::info!("Received {} ({} bytes)", filename, data.len());

    Ok(Upload {
        filename,
        path,
        table_name,
        _dir: dir,
    })
}

/// Keep the last path component and replace anything outside `[A-Za-z0-9._-]`
fn sanitize_filename(name: &str) -> Option<String> {
    let base = name.rsplit(['/', '\\']).next().unwrap_or("");
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.').to_string();

    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned)
    }
}

fn check_extension(filename: &str, expected: SourceKind) -> Result<()> {
    let ext = std::path::Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default();

    let allowed = ALLOWED_EXTENSIONS.contains(&ext.as_str())
        && SourceKind::from_extension(&ext) == Some(expected);

    if !allowed {
        return Err(Error::UnsupportedSource(format!(
            "'{}' is not a supported {} file",
            filename, expected
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingestion::spreadsheet::tests::{write_xlsx, Cell};
    use crate::server::routes::tests::{json_body, multipart_body, multipart_request, test_router};
    use axum::http::StatusCode;
    use tower::ServiceExt;

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("report.csv").as_deref(), Some("report.csv"));
        assert_eq!(sanitize_filename("../../etc/passwd.csv").as_deref(), Some("passwd.csv"));
        assert_eq!(sanitize_filename("C:\\Users\\me\\my data.xlsx").as_deref(), Some("my_data.xlsx"));
        assert_eq!(sanitize_filename("..."), None);
        assert_eq!(sanitize_filename(""), None);
    }

    #[test]
    fn test_check_extension() {
        assert!(check_extension("a.CSV", SourceKind::Delimited).is_ok());
        assert!(check_extension("a.sqlite3", SourceKind::Relational).is_ok());
        assert!(check_extension("a.xlsx", SourceKind::Delimited).is_err());
        assert!(check_extension("a.txt", SourceKind::Delimited).is_err());
        assert!(check_extension("noext", SourceKind::Spreadsheet).is_err());
    }

    #[tokio::test]
    async fn test_convert_csv_upload() {
        let dir = tempfile::tempdir().unwrap();
        let app = test_router(dir.path());

        let body = multipart_body(&[], Some(("csv_file", "people.csv", b"name,age\nAnn,30\n")));
        let response = app
            .oneshot(multipart_request("/api/convert/csv", body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json = json_body(response).await;
        assert_eq!(json["collection"]["name"], "people");
        assert_eq!(json["collection"]["record_count"], 1);

        // Upload directory is gone once the request completes
        let leftovers: Vec<_> = std::fs::read_dir(dir.path().join("uploads")).unwrap().collect();
        assert!(leftovers.is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_same_name_uploads_convert_their_own_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let app = test_router(dir.path());

        let mut large = String::from("n\n");
        for i in 0..300 {
            large.push_str(&format!("{}\n", i));
        }
        let small_body = multipart_body(&[], Some(("csv_file", "same.csv", b"n\n1\n")));
        let large_body = multipart_body(&[], Some(("csv_file", "same.csv", large.as_bytes())));

        let (small, large) = tokio::join!(
            app.clone().oneshot(multipart_request("/api/convert/csv", small_body)),
            app.clone().oneshot(multipart_request("/api/convert/csv", large_body)),
        );
        let small = json_body(small.unwrap()).await;
        let large = json_body(large.unwrap()).await;

        assert_eq!(small["collection"]["name"], "same");
        assert_eq!(small["collection"]["record_count"], 1);
        assert_eq!(large["collection"]["name"], "same");
        assert_eq!(large["collection"]["record_count"], 300);

        let leftovers: Vec<_> = std::fs::read_dir(dir.path().join("uploads")).unwrap().collect();
        assert!(leftovers.is_empty());
    }

    #[tokio::test]
    async fn test_convert_db_upload() {
        let dir = tempfile::tempdir().unwrap();
        let app = test_router(dir.path());

        let db_path = dir.path().join("fixture.db");
        let conn = rusqlite::Connection::open(&db_path).unwrap();
        conn.execute_batch("CREATE TABLE t (v TEXT); INSERT INTO t VALUES ('a'), ('b');")
            .unwrap();
        drop(conn);
        let data = std::fs::read(&db_path).unwrap();

        let body = multipart_body(&[("table_name", "t")], Some(("db_file", "shop.db", &data)));
        let response = app
            .clone()
            .oneshot(multipart_request("/api/convert/db", body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["collection"]["record_count"], 2);

        // Unknown table
        let body = multipart_body(&[("table_name", "missing")], Some(("db_file", "shop.db", &data)));
        let response = app
            .clone()
            .oneshot(multipart_request("/api/convert/db", body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["error"]["type"], "query_failed");

        // Missing table name
        let body = multipart_body(&[], Some(("db_file", "shop.db", &data)));
        let response = app
            .oneshot(multipart_request("/api/convert/db", body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_convert_xlsx_upload() {
        let dir = tempfile::tempdir().unwrap();
        let app = test_router(dir.path());

        let fixture = dir.path().join("fixture.xlsx");
        write_xlsx(
            &fixture,
            &[(
                "Sheet1",
                vec![
                    vec![Cell::S("item"), Cell::S("qty")],
                    vec![Cell::S("bolt"), Cell::N(4.0)],
                ],
            )],
            None,
        );
        let data = std::fs::read(&fixture).unwrap();

        let body = multipart_body(&[], Some(("xlsx_file", "stock.xlsx", &data)));
        let response = app
            .oneshot(multipart_request("/api/convert/xlsx", body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = json_body(response).await;
        assert_eq!(json["collection"]["name"], "stock");
        assert_eq!(json["collection"]["source_kind"], "spreadsheet");
    }

    #[tokio::test]
    async fn test_missing_file_and_wrong_extension() {
        let dir = tempfile::tempdir().unwrap();
        let app = test_router(dir.path());

        let response = app
            .clone()
            .oneshot(multipart_request("/api/convert/csv", multipart_body(&[], None)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = multipart_body(&[], Some(("csv_file", "notes.pdf", b"%PDF")));
        let response = app
            .oneshot(multipart_request("/api/convert/csv", body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["error"]["type"], "unsupported_source");
    }

    #[tokio::test]
    async fn test_empty_csv_is_bad_request() {
        let dir = tempfile::tempdir().unwrap();
        let app = test_router(dir.path());

        let body = multipart_body(&[], Some(("csv_file", "empty.csv", b"")));
        let response = app
            .oneshot(multipart_request("/api/convert/csv", body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["error"]["type"], "malformed_input");
    }
}
