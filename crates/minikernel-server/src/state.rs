//! API types shared by handlers and the OpenAPI document

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

#[derive(Serialize, Deserialize, ToSchema, Debug)]
pub struct ErrorResponse {
    /// Error taxonomy entry, e.g. `SyntaxError` or `NameNotFound`
    pub kind: String,
    pub error: String,
}

/// Query string of `GET /parse`.
#[derive(Deserialize, IntoParams, Debug)]
#[into_params(parameter_in = Query)]
pub struct ParseQuery {
    /// Program text to parse
    pub code: Option<String>,
}
