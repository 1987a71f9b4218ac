use actix_web::{get, web};
use orbit_api_schema::workspace::list::ListWorkspacesResponse;

use crate::{error::ApiError, gates::WorkspaceContext, state::ApiState};

#[get("/workspace")]
pub async fn workspace_list(
    state: web::Data<ApiState>,
    ctx: WorkspaceContext,
) -> Result<web::Json<ListWorkspacesResponse>, ApiError> {
    let res = web::block(move || state.workspace_service().list_workspaces(&ctx))
        .await
        .map_err(|_| ApiError::Internal)??;
    Ok(web::Json(res))
}
