/// HTTP transport
///
/// A thin shell over the state manager: each handler is one call into
/// `InstanceState` plus serialization, nothing else. The server speaks
/// JSON (and raw bytes for downloads) only; there is no HTML and no
/// static asset serving here.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{Form, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::state::data::ScanResult;
use crate::state::manager::InstanceState;
use crate::state::StateError;

/// Build the application router around a shared session
pub fn router(state: Arc<InstanceState>) -> Router {
    Router::new()
        .route("/instance-info", get(instance_info))
        .route("/scan-result", get(scan_result))
        .route("/category_columns", get(category_columns))
        .route("/category_columns/add", post(add_category_column))
        .route("/category_columns/remove", post(remove_category_column))
        .route("/annotation_columns", get(annotation_columns))
        .route("/annotation_columns/add", post(add_annotation_column))
        .route("/annotation_columns/remove", post(remove_annotation_column))
        .route("/meta/update-name", post(update_name))
        .route("/meta/update-annotation", post(update_annotation))
        .route("/meta/update-thumbnail", post(update_thumbnail))
        .route("/meta/delete-thumbnail", post(delete_thumbnail))
        .route("/file", get(download_file))
        .with_state(state)
}

/// Bind and serve until the process is stopped
pub async fn serve(state: Arc<InstanceState>, addr: SocketAddr) -> std::io::Result<()> {
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    println!("🌐 Listening on http://{}", addr);
    axum::serve(listener, app).await
}

/// Schema-store failures are the only core errors that reach HTTP.
/// They surface as 500: no projection is meaningful without the schema.
struct AppError(StateError);

impl From<StateError> for AppError {
    fn from(err: StateError) -> Self {
        AppError(err)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        (StatusCode::INTERNAL_SERVER_ERROR, self.0.to_string()).into_response()
    }
}

// ========== Instance & scan ==========

async fn instance_info(State(state): State<Arc<InstanceState>>) -> Json<Value> {
    let instance = state.instance();
    Json(json!({
        "identity": instance.identity_path.display().to_string(),
        "instance_root": instance.instance_root.display().to_string(),
        "sibling_folders": instance
            .sibling_folders
            .iter()
            .map(|p| p.display().to_string())
            .collect::<Vec<_>>(),
    }))
}

async fn scan_result(
    State(state): State<Arc<InstanceState>>,
) -> Result<Json<ScanResult>, AppError> {
    Ok(Json(state.entries()?))
}

// ========== Column schema ==========

#[derive(Deserialize)]
struct NameForm {
    name: String,
}

#[derive(Deserialize)]
struct AnnotationAddForm {
    column_id: String,
    label: String,
}

#[derive(Deserialize)]
struct ColumnIdForm {
    column_id: String,
}

async fn category_columns(
    State(state): State<Arc<InstanceState>>,
) -> Result<Json<Value>, AppError> {
    Ok(Json(json!({
        "category_columns": state.category_columns()?
    })))
}

async fn add_category_column(
    State(state): State<Arc<InstanceState>>,
    Form(form): Form<NameForm>,
) -> Result<Json<Value>, AppError> {
    state.add_category_column(&form.name)?;
    Ok(Json(json!({ "ok": true })))
}

async fn remove_category_column(
    State(state): State<Arc<InstanceState>>,
    Form(form): Form<NameForm>,
) -> Result<Json<Value>, AppError> {
    state.remove_category_column(&form.name)?;
    Ok(Json(json!({ "ok": true })))
}

async fn annotation_columns(
    State(state): State<Arc<InstanceState>>,
) -> Result<Json<Value>, AppError> {
    Ok(Json(json!({
        "annotation_columns": state.annotation_columns()?
    })))
}

async fn add_annotation_column(
    State(state): State<Arc<InstanceState>>,
    Form(form): Form<AnnotationAddForm>,
) -> Result<Json<Value>, AppError> {
    let added = state.add_annotation_column(&form.column_id, &form.label)?;
    Ok(Json(json!({ "ok": added })))
}

async fn remove_annotation_column(
    State(state): State<Arc<InstanceState>>,
    Form(form): Form<ColumnIdForm>,
) -> Result<Json<Value>, AppError> {
    state.remove_annotation_column(&form.column_id)?;
    Ok(Json(json!({ "ok": true })))
}

// ========== Sidecar metadata ==========

#[derive(Deserialize)]
struct PathForm {
    path: String,
}

#[derive(Deserialize)]
struct PathValueForm {
    path: String,
    value: String,
}

#[derive(Deserialize)]
struct AnnotationValueForm {
    path: String,
    column_id: String,
    value: String,
}

async fn update_name(
    State(state): State<Arc<InstanceState>>,
    Form(form): Form<PathValueForm>,
) -> Json<Value> {
    let ok = state.update_name(&form.path, &form.value);
    Json(json!({ "ok": ok }))
}

async fn update_annotation(
    State(state): State<Arc<InstanceState>>,
    Form(form): Form<AnnotationValueForm>,
) -> Json<Value> {
    let ok = state.update_annotation(&form.path, &form.column_id, &form.value);
    Json(json!({ "ok": ok }))
}

async fn update_thumbnail(
    State(state): State<Arc<InstanceState>>,
    Form(form): Form<PathValueForm>,
) -> Json<Value> {
    let ok = state.update_thumbnail(&form.path, Some(&form.value));
    Json(json!({ "ok": ok }))
}

async fn delete_thumbnail(
    State(state): State<Arc<InstanceState>>,
    Form(form): Form<PathForm>,
) -> Json<Value> {
    let ok = state.update_thumbnail(&form.path, None);
    Json(json!({ "ok": ok }))
}

// ========== Downloads ==========

#[derive(Deserialize)]
struct FileQuery {
    path: String,
}

/// Raw bytes of a content file. Unknown or escaping paths are 404;
/// the transport never reads outside the instance tree.
async fn download_file(
    State(state): State<Arc<InstanceState>>,
    Query(query): Query<FileQuery>,
) -> Response {
    let path = match state.instance().resolve(&query.path) {
        Some(path) => path,
        None => return StatusCode::NOT_FOUND.into_response(),
    };

    match tokio::fs::read(&path).await {
        Ok(bytes) => {
            let file_name = query.path.rsplit('/').next().unwrap_or("download");
            let headers = [(
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", file_name),
            )];
            (headers, bytes).into_response()
        }
        Err(_) => StatusCode::NOT_FOUND.into_response(),
    }
}
