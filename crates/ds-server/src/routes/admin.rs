//! Admin route handlers.

use axum::extract::State;
use axum::Json;

use crate::context::AppContext;
use crate::error::AppError;

/// GET /api/admin/tools
#[utoipa::path(
    get,
    path = "/api/admin/tools",
    responses(
        (status = 200, description = "List external tool availability", body = Vec<ds_av::ToolInfo>)
    )
)]
pub async fn tools(State(ctx): State<AppContext>) -> Result<Json<Vec<ds_av::ToolInfo>>, AppError> {
    // Version detection runs the tools synchronously.
    let tools = ctx.tools.clone();
    let infos = tokio::task::spawn_blocking(move || tools.check_all())
        .await
        .map_err(|e| ds_core::Error::Internal(format!("tool check task failed: {e}")))?;
    Ok(Json(infos))
}
