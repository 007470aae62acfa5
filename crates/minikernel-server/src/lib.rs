//! minikernel server - HTTP surface over a minikernel workspace
//!
//! Exposes code execution, expression evaluation, workspace listing, column
//! inspection and syntax-tree encoding as REST endpoints, with an OpenAPI
//! document and Swagger UI.
//!
//! # Example
//!
//! ```ignore
//! use minikernel_server::{KernelCore, build_router_with_docs};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() {
//!     let core = Arc::new(KernelCore::new());
//!     core.preload(std::path::Path::new("data/people.csv")).await.unwrap();
//!
//!     let router = build_router_with_docs(core);
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:7101").await.unwrap();
//!     axum::serve(listener, router).await.unwrap();
//! }
//! ```

pub mod core;
pub mod error;
pub mod http;
pub mod state;

// Re-exports for convenience
pub use core::KernelCore;
pub use error::AppError;
pub use state::ErrorResponse;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use utoipa::OpenApi;

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        http::alive,
        http::exec,
        http::eval,
        http::locals,
        http::getcols,
        http::parse_query,
        http::parse_body,
    ),
    components(schemas(state::ErrorResponse))
)]
struct ApiDoc;

pub fn openapi_spec() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}

/// Build the axum router with all endpoints
pub fn build_router(core: Arc<KernelCore>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(http::alive))
        .route("/exec", post(http::exec))
        .route("/eval", post(http::eval))
        .route("/locals", get(http::locals))
        .route("/getcols/{df}", get(http::getcols))
        .route("/parse", get(http::parse_query).post(http::parse_body))
        .layer(cors)
        .with_state(core)
}

/// Build the router with OpenAPI documentation endpoint
pub fn build_router_with_docs(core: Arc<KernelCore>) -> Router {
    use utoipa_swagger_ui::SwaggerUi;

    build_router(core).merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", openapi_spec()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_lists_every_route() {
        let spec = openapi_spec();
        for path in ["/", "/exec", "/eval", "/locals", "/getcols/{df}", "/parse"] {
            assert!(spec.paths.paths.contains_key(path), "missing {path}");
        }
    }
}
