use axum::extract::Extension;
use axum::http::header;
use axum::response::{IntoResponse, Response};

use crate::error::ApiError;
use crate::policy::Principal;
use crate::services::report_service::ReportService;

fn csv_response(filename: &str, body: String) -> Response {
    (
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", filename),
            ),
        ],
        body,
    )
        .into_response()
}

/// GET /api/reports/export/tasks - all tasks, admin only
pub async fn export_tasks(
    Extension(principal): Extension<Principal>,
) -> Result<Response, ApiError> {
    let service = ReportService::new().await?;
    let csv = service.export_tasks(&principal).await?;
    Ok(csv_response("tasks_report.csv", csv))
}

/// GET /api/reports/export/user - the caller's assigned tasks
pub async fn export_user_tasks(
    Extension(principal): Extension<Principal>,
) -> Result<Response, ApiError> {
    let service = ReportService::new().await?;
    let csv = service.export_user_tasks(&principal).await?;
    Ok(csv_response("user_tasks_report.csv", csv))
}
