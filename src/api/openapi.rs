//! OpenAPI documentation and schema generation
//!
//! The OpenAPI document is generated at compile time with utoipa.

use utoipa::OpenApi;

/// OpenAPI documentation for the trackfetch REST API
///
/// The document is served at:
/// - `/api/v1/openapi.json` - JSON format OpenAPI specification
/// - `/swagger-ui` - Interactive Swagger UI documentation
#[derive(OpenApi)]
#[openapi(
    info(
        title = "trackfetch REST API",
        version = "0.1.0",
        description = "Queue track downloads, poll active jobs and browse the downloaded library",
        license(
            name = "MIT OR Apache-2.0"
        )
    ),
    servers(
        (url = "http://localhost:8000/api/v1", description = "Local development server")
    ),
    paths(
        // Downloads
        crate::api::routes::queue_download,
        crate::api::routes::queue_all_pending,
        crate::api::routes::list_jobs,
        crate::api::routes::job_stream,
        crate::api::routes::list_records,

        // System
        crate::api::routes::health_check,
        crate::api::routes::openapi_spec,
        crate::api::routes::event_stream,
    ),
    components(schemas(
        // Core types from types.rs
        crate::types::DownloadRequest,
        crate::types::QueueOutcome,
        crate::types::SubmissionStatus,
        crate::types::JobStatus,
        crate::types::JobView,
        crate::types::Stage,
        crate::types::SkipReason,
        crate::types::Event,

        // API request/response types from routes
        crate::api::routes::QueueAllResponse,
        crate::api::routes::RecordInfo,
        crate::api::routes::RecordsPage,

        // Error types from error.rs
        crate::error::ApiError,
        crate::error::ErrorDetail,
    )),
    tags(
        (name = "downloads", description = "Submit tracks, poll active jobs, list downloaded records"),
        (name = "system", description = "System endpoints - Health checks, OpenAPI spec, events"),
    )
)]
pub struct ApiDoc;
