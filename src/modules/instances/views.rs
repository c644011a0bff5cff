//! What the workflow hands to the render and redirect boundaries.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    Json,
};
use serde::Serialize;

use super::models::{BookTitle, InstanceDraft, InstanceStatus, PopulatedInstance};
use super::validate::FieldError;

pub const LIST_TITLE: &str = "Book Instance List";
pub const CREATE_TITLE: &str = "Create BookInstance";
pub const DELETE_TITLE: &str = "Delete BookInstance";

/// Data for the creation and update forms.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FormView {
    pub title: String,
    pub book_list: Vec<BookTitle>,
    pub status_list: [InstanceStatus; 4],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selected_book: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bookinstance: Option<InstanceDraft>,
    pub errors: Vec<FieldError>,
}

impl FormView {
    pub fn new(title: impl Into<String>, book_list: Vec<BookTitle>) -> Self {
        Self {
            title: title.into(),
            book_list,
            status_list: InstanceStatus::ALL,
            selected_book: None,
            bookinstance: None,
            errors: Vec::new(),
        }
    }

    /// Pre-fill the form, selecting the draft's book.
    pub fn with_draft(mut self, draft: InstanceDraft) -> Self {
        self.selected_book = Some(draft.book.clone()).filter(|book| !book.is_empty());
        self.bookinstance = Some(draft);
        self
    }

    pub fn with_errors(mut self, errors: Vec<FieldError>) -> Self {
        self.errors = errors;
        self
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

/// A named view and its payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "view", rename_all = "snake_case")]
pub enum View {
    InstanceList {
        title: String,
        bookinstance_list: Vec<PopulatedInstance>,
    },
    InstanceDetail {
        title: String,
        bookinstance: PopulatedInstance,
    },
    InstanceForm(FormView),
    InstanceDelete {
        title: String,
        instance: PopulatedInstance,
    },
}

impl View {
    pub fn name(&self) -> &'static str {
        match self {
            View::InstanceList { .. } => "instance_list",
            View::InstanceDetail { .. } => "instance_detail",
            View::InstanceForm(_) => "instance_form",
            View::InstanceDelete { .. } => "instance_delete",
        }
    }

    pub fn title(&self) -> &str {
        match self {
            View::InstanceList { title, .. }
            | View::InstanceDetail { title, .. }
            | View::InstanceDelete { title, .. } => title,
            View::InstanceForm(form) => &form.title,
        }
    }
}

impl IntoResponse for View {
    fn into_response(self) -> Response {
        let status = match &self {
            View::InstanceForm(form) if form.has_errors() => StatusCode::UNPROCESSABLE_ENTITY,
            _ => StatusCode::OK,
        };
        (status, Json(self)).into_response()
    }
}

/// Terminal result of a workflow operation that did not fail.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Render(View),
    Redirect(String),
}

impl Outcome {
    pub fn redirect(location: impl Into<String>) -> Self {
        Outcome::Redirect(location.into())
    }

    pub fn view(&self) -> Option<&View> {
        match self {
            Outcome::Render(view) => Some(view),
            Outcome::Redirect(_) => None,
        }
    }

    pub fn location(&self) -> Option<&str> {
        match self {
            Outcome::Redirect(location) => Some(location),
            Outcome::Render(_) => None,
        }
    }
}

impl From<View> for Outcome {
    fn from(view: View) -> Self {
        Outcome::Render(view)
    }
}

impl IntoResponse for Outcome {
    fn into_response(self) -> Response {
        match self {
            Outcome::Render(view) => view.into_response(),
            Outcome::Redirect(location) => Redirect::to(&location).into_response(),
        }
    }
}
