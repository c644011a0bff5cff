//! HTTP routes for book copies.

use axum::{
    extract::{rejection::FormRejection, Path, State},
    routing::get,
    Form, Router,
};

use catalog_http::error::AppError;

use super::models::InstanceId;
use super::validate::InstanceForm;
use super::views::Outcome;
use super::workflow::{InstanceWorkflow, WorkflowError};

impl From<WorkflowError> for AppError {
    fn from(error: WorkflowError) -> Self {
        match error {
            WorkflowError::NotFound { id } => {
                tracing::debug!(instance_id = %id, "book copy not found");
                AppError::not_found("Book copy not found")
            }
            WorkflowError::Store(e) => AppError::Internal(anyhow::Error::new(e)),
        }
    }
}

type HandlerResult = Result<Outcome, AppError>;

/// Routes served by the instances module, bound to its workflow.
pub fn router(workflow: InstanceWorkflow) -> Router {
    Router::new()
        .route("/instances", get(list))
        .route("/instances/create", get(create_form).post(create))
        .route("/instances/{id}", get(detail))
        .route("/instances/{id}/update", get(update_form).post(update))
        .route("/instances/{id}/delete", get(delete_form).post(delete))
        .with_state(workflow)
}

fn submitted(form: Result<Form<InstanceForm>, FormRejection>) -> Result<InstanceForm, AppError> {
    form.map(|Form(form)| form)
        .map_err(|rejection| AppError::bad_request(rejection.body_text()))
}

async fn list(State(workflow): State<InstanceWorkflow>) -> HandlerResult {
    Ok(workflow.list().await?)
}

async fn detail(State(workflow): State<InstanceWorkflow>, Path(id): Path<String>) -> HandlerResult {
    Ok(workflow.detail(&InstanceId::new(id)).await?)
}

async fn create_form(State(workflow): State<InstanceWorkflow>) -> HandlerResult {
    Ok(workflow.create_form().await?)
}

async fn create(
    State(workflow): State<InstanceWorkflow>,
    form: Result<Form<InstanceForm>, FormRejection>,
) -> HandlerResult {
    let form = submitted(form)?;
    Ok(workflow.create(&form).await?)
}

async fn update_form(
    State(workflow): State<InstanceWorkflow>,
    Path(id): Path<String>,
) -> HandlerResult {
    Ok(workflow.update_form(&InstanceId::new(id)).await?)
}

async fn update(
    State(workflow): State<InstanceWorkflow>,
    Path(id): Path<String>,
    form: Result<Form<InstanceForm>, FormRejection>,
) -> HandlerResult {
    let form = submitted(form)?;
    Ok(workflow.update(&InstanceId::new(id), &form).await?)
}

async fn delete_form(
    State(workflow): State<InstanceWorkflow>,
    Path(id): Path<String>,
) -> HandlerResult {
    Ok(workflow.delete_form(&InstanceId::new(id)).await?)
}

async fn delete(State(workflow): State<InstanceWorkflow>, Path(id): Path<String>) -> HandlerResult {
    Ok(workflow.delete(&InstanceId::new(id)).await?)
}
