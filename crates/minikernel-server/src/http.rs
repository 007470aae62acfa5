//! HTTP REST handlers

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use axum::Json;
use axum::extract::{Path, Query, State};
use indexmap::IndexMap;
use log::{debug, info, warn};
use serde_json::Value as JsonValue;

use crate::core::KernelCore;
use crate::error::AppError;
use crate::state::{ErrorResponse, ParseQuery};

fn first_line(body: &str) -> &str {
    body.lines().next().unwrap_or(body)
}

fn failed(route: &str, start: Instant, err: AppError) -> AppError {
    warn!("{route} failed in {:.2?}: {} ({})", start.elapsed(), err, err.kind());
    err
}

/// Liveness check
#[utoipa::path(
    get,
    path = "/",
    responses((status = 200, description = "Service is up", body = String, content_type = "text/plain"))
)]
pub async fn alive() -> &'static str {
    debug!("GET /");
    minikernel::liveness()
}

/// Run a program against the workspace
#[utoipa::path(
    post,
    path = "/exec",
    request_body(content = String, content_type = "text/plain", description = "Program text"),
    responses(
        (status = 200, description = "Program ran to completion"),
        (status = 400, description = "Syntax error or runtime fault", body = ErrorResponse)
    )
)]
pub async fn exec(State(core): State<Arc<KernelCore>>, body: String) -> Result<(), AppError> {
    let start = Instant::now();
    info!("POST /exec: {}", first_line(&body));
    debug!("Full program: {}", body);

    core.execute(body)
        .await
        .map_err(|e| failed("exec", start, e))?;
    info!("exec succeeded in {:.2?}", start.elapsed());
    Ok(())
}

/// Evaluate one expression and return its JSON form
#[utoipa::path(
    post,
    path = "/eval",
    request_body(content = String, content_type = "text/plain", description = "Expression text"),
    responses(
        (status = 200, description = "JSON form of the result", body = Object),
        (status = 400, description = "Syntax error, runtime fault or unserializable result", body = ErrorResponse),
        (status = 404, description = "Unknown name", body = ErrorResponse)
    )
)]
pub async fn eval(
    State(core): State<Arc<KernelCore>>,
    body: String,
) -> Result<Json<JsonValue>, AppError> {
    let start = Instant::now();
    info!("POST /eval: {}", first_line(&body));
    debug!("Full expression: {}", body);

    let value = core
        .evaluate(body)
        .await
        .map_err(|e| failed("eval", start, e))?;
    info!("eval succeeded in {:.2?}", start.elapsed());
    Ok(Json(value))
}

/// Workspace names with the type name of each value
#[utoipa::path(
    get,
    path = "/locals",
    responses((status = 200, description = "Name to type name", body = Object))
)]
pub async fn locals(State(core): State<Arc<KernelCore>>) -> Json<BTreeMap<String, String>> {
    info!("GET /locals");
    let names = core.list_names().await;
    debug!("{} name(s) bound", names.len());
    Json(names)
}

/// Column types of a DataFrame, read from its first row
#[utoipa::path(
    get,
    path = "/getcols/{df}",
    params(("df" = String, Path, description = "Workspace name of the DataFrame")),
    responses(
        (status = 200, description = "Column name to type name", body = Object),
        (status = 400, description = "Not a DataFrame, or no rows", body = ErrorResponse),
        (status = 404, description = "Unknown name", body = ErrorResponse)
    )
)]
pub async fn getcols(
    State(core): State<Arc<KernelCore>>,
    Path(df): Path<String>,
) -> Result<Json<IndexMap<String, String>>, AppError> {
    let start = Instant::now();
    info!("GET /getcols/{df}");

    let columns = core
        .describe_columns(&df)
        .await
        .map_err(|e| failed("getcols", start, e))?;
    debug!("{df}: {:?}", columns);
    Ok(Json(columns))
}

/// Encode the syntax tree of `code`
#[utoipa::path(
    get,
    path = "/parse",
    params(ParseQuery),
    responses(
        (status = 200, description = "Structural record of the module", body = Object),
        (status = 400, description = "Syntax error or missing code", body = ErrorResponse),
        (status = 422, description = "Tree holds a value the encoder rejects", body = ErrorResponse)
    )
)]
pub async fn parse_query(
    State(core): State<Arc<KernelCore>>,
    Query(query): Query<ParseQuery>,
) -> Result<Json<JsonValue>, AppError> {
    let start = Instant::now();
    let Some(code) = query.code else {
        return Err(failed("parse", start, AppError::MissingCode));
    };
    parse_code(&core, code, start).await
}

/// Encode the syntax tree of the request body
#[utoipa::path(
    post,
    path = "/parse",
    request_body(content = String, content_type = "text/plain", description = "Program text"),
    responses(
        (status = 200, description = "Structural record of the module", body = Object),
        (status = 400, description = "Syntax error", body = ErrorResponse),
        (status = 422, description = "Tree holds a value the encoder rejects", body = ErrorResponse)
    )
)]
pub async fn parse_body(
    State(core): State<Arc<KernelCore>>,
    body: String,
) -> Result<Json<JsonValue>, AppError> {
    parse_code(&core, body, Instant::now()).await
}

async fn parse_code(core: &KernelCore, code: String, start: Instant) -> Result<Json<JsonValue>, AppError> {
    info!("parse: {}", first_line(&code));
    debug!("Full program: {}", code);

    let record = core
        .parse(code)
        .await
        .map_err(|e| failed("parse", start, e))?;
    info!("parse succeeded in {:.2?}", start.elapsed());
    Ok(Json(record))
}
