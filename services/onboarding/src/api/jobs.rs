//! Provisioning job polling.
use crate::api::error::{ApiError, api_not_found};
use crate::app::AppState;
use crate::provision::job::JobRecord;
use axum::Json;
use axum::extract::{Path, State};
use uuid::Uuid;

#[utoipa::path(
    get,
    path = "/v1/provision/jobs/{job_id}",
    tag = "jobs",
    params(
        ("job_id" = Uuid, Path, description = "Job identifier returned at provision time")
    ),
    responses(
        (status = 200, description = "Job status", body = JobRecord),
        (status = 404, description = "Unknown job", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn get_job(
    Path(job_id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<Json<JobRecord>, ApiError> {
    match state.jobs.job(&job_id) {
        Some(record) => Ok(Json(record)),
        None => Err(api_not_found("job not found")),
    }
}
