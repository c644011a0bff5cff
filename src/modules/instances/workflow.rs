//! Create, read, update and delete flows for book copies.
//!
//! Each operation ends in exactly one of: a rendered view, a redirect, or a
//! [`WorkflowError`]. Validation failures are not errors; they render the
//! form again with the submitted values and field messages.
//!
//! Missing records are handled differently per operation. `detail` fails
//! with [`WorkflowError::NotFound`]; the update and delete flows redirect to
//! the list instead.

use std::sync::Arc;

use catalog_db::StoreError;
use thiserror::Error;

use super::models::{InstanceDraft, InstanceId};
use super::repository::{BookLookup, InstanceRepository};
use super::validate::{validate, InstanceForm};
use super::views::{FormView, Outcome, View, CREATE_TITLE, DELETE_TITLE, LIST_TITLE};

pub const LIST_LOCATION: &str = "/instances";

#[derive(Error, Debug)]
pub enum WorkflowError {
    #[error("book copy '{id}' not found")]
    NotFound { id: InstanceId },

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type WorkflowResult = Result<Outcome, WorkflowError>;

fn update_title(id: &InstanceId) -> String {
    format!("Update BookInstance: {}", id)
}

/// Orchestrates validation and persistence of book copies.
#[derive(Clone)]
pub struct InstanceWorkflow {
    instances: Arc<dyn InstanceRepository>,
    books: Arc<dyn BookLookup>,
}

impl InstanceWorkflow {
    pub fn new(instances: Arc<dyn InstanceRepository>, books: Arc<dyn BookLookup>) -> Self {
        Self { instances, books }
    }

    pub async fn list(&self) -> WorkflowResult {
        let instances = self.instances.list_all().await?;
        Ok(View::InstanceList {
            title: LIST_TITLE.to_string(),
            bookinstance_list: instances,
        }
        .into())
    }

    pub async fn detail(&self, id: &InstanceId) -> WorkflowResult {
        let instance = self
            .instances
            .find_by_id(id)
            .await?
            .ok_or_else(|| WorkflowError::NotFound { id: id.clone() })?;

        Ok(View::InstanceDetail {
            title: format!("Copy: {}", instance.book_title()),
            bookinstance: instance,
        }
        .into())
    }

    /// Empty creation form.
    pub async fn create_form(&self) -> WorkflowResult {
        let books = self.books.list_book_titles().await?;
        Ok(View::InstanceForm(FormView::new(CREATE_TITLE, books)).into())
    }

    pub async fn create(&self, form: &InstanceForm) -> WorkflowResult {
        // The selection list is needed on both branches.
        let books = self.books.list_book_titles().await?;

        match validate(form, None).into_result() {
            Err((draft, errors)) => {
                tracing::info!(errors = errors.len(), "book copy creation rejected");
                Ok(View::InstanceForm(
                    FormView::new(CREATE_TITLE, books)
                        .with_draft(draft)
                        .with_errors(errors),
                )
                .into())
            }
            Ok(instance) => {
                let stored = self.instances.insert(instance).await?;
                Ok(Outcome::redirect(stored.url()))
            }
        }
    }

    /// Update form pre-filled from the stored copy.
    pub async fn update_form(&self, id: &InstanceId) -> WorkflowResult {
        let (instance, books) = tokio::try_join!(
            self.instances.find_by_id(id),
            self.books.list_book_titles()
        )?;

        let Some(instance) = instance else {
            return Ok(Outcome::redirect(LIST_LOCATION));
        };

        Ok(View::InstanceForm(
            FormView::new(update_title(id), books)
                .with_draft(InstanceDraft::from(&instance.instance)),
        )
        .into())
    }

    /// Replace every field of the copy `id` with the submission.
    pub async fn update(&self, id: &InstanceId, form: &InstanceForm) -> WorkflowResult {
        match validate(form, Some(id)).into_result() {
            Err((draft, errors)) => {
                tracing::info!(instance_id = %id, errors = errors.len(), "book copy update rejected");
                let books = self.books.list_book_titles().await?;
                Ok(View::InstanceForm(
                    FormView::new(update_title(id), books)
                        .with_draft(draft)
                        .with_errors(errors),
                )
                .into())
            }
            Ok(instance) => match self.instances.replace(id, instance).await? {
                Some(replaced) => Ok(Outcome::redirect(replaced.url())),
                None => {
                    tracing::info!(instance_id = %id, "book copy vanished before update");
                    Ok(Outcome::redirect(LIST_LOCATION))
                }
            },
        }
    }

    /// Confirmation page for removing a copy.
    pub async fn delete_form(&self, id: &InstanceId) -> WorkflowResult {
        match self.instances.find_by_id(id).await? {
            Some(instance) => Ok(View::InstanceDelete {
                title: DELETE_TITLE.to_string(),
                instance,
            }
            .into()),
            None => Ok(Outcome::redirect(LIST_LOCATION)),
        }
    }

    pub async fn delete(&self, id: &InstanceId) -> WorkflowResult {
        if self.instances.find_by_id(id).await?.is_some() {
            self.instances.delete_by_id(id).await?;
        }
        Ok(Outcome::redirect(LIST_LOCATION))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::instances::models::{
        instance_url, BookId, BookInstance, BookTitle, InstanceStatus, NewInstance,
        PopulatedInstance,
    };
    use crate::modules::instances::store::{sample_books, SurrealCatalogStore};
    use crate::modules::instances::validate::{BOOK_REQUIRED, IMPRINT_REQUIRED, INVALID_DATE, INVALID_STATUS};
    use async_trait::async_trait;
    use catalog_db::Database;
    use chrono::NaiveDate;
    use std::sync::atomic::{AtomicUsize, Ordering};

    async fn seeded() -> (Database, SurrealCatalogStore, InstanceWorkflow) {
        let db = Database::in_memory().await.unwrap();
        let store = SurrealCatalogStore::new(&db);
        store.seed_books(sample_books()).await.unwrap();
        let shared = Arc::new(store.clone());
        let workflow = InstanceWorkflow::new(shared.clone(), shared);
        (db, store, workflow)
    }

    fn submission(book: &str, imprint: &str, status: &str, due_back: &str) -> InstanceForm {
        InstanceForm {
            book: book.to_string(),
            imprint: imprint.to_string(),
            status: status.to_string(),
            due_back: due_back.to_string(),
        }
    }

    fn form_view(outcome: &Outcome) -> &FormView {
        match outcome.view() {
            Some(View::InstanceForm(form)) => form,
            other => panic!("expected form view, got {:?}", other),
        }
    }

    fn error_messages(form: &FormView) -> Vec<&'static str> {
        form.errors.iter().map(|e| e.message).collect()
    }

    async fn insert(store: &SurrealCatalogStore, book: &str, status: InstanceStatus) -> BookInstance {
        store
            .insert(NewInstance {
                book: BookId::new(book),
                imprint: "Penguin".to_string(),
                status,
                due_back: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            })
            .await
            .unwrap()
    }

    /// Repository whose every call fails, counting writes attempted.
    #[derive(Default)]
    struct FailingStore {
        writes: AtomicUsize,
    }

    fn outage() -> StoreError {
        StoreError::Unavailable("connection refused".to_string())
    }

    #[async_trait]
    impl InstanceRepository for FailingStore {
        async fn list_all(&self) -> Result<Vec<PopulatedInstance>, StoreError> {
            Err(outage())
        }

        async fn find_by_id(&self, _id: &InstanceId) -> Result<Option<PopulatedInstance>, StoreError> {
            Err(outage())
        }

        async fn insert(&self, _instance: NewInstance) -> Result<BookInstance, StoreError> {
            self.writes.fetch_add(1, Ordering::SeqCst);
            Err(outage())
        }

        async fn replace(
            &self,
            _id: &InstanceId,
            _instance: NewInstance,
        ) -> Result<Option<BookInstance>, StoreError> {
            self.writes.fetch_add(1, Ordering::SeqCst);
            Err(outage())
        }

        async fn delete_by_id(&self, _id: &InstanceId) -> Result<(), StoreError> {
            self.writes.fetch_add(1, Ordering::SeqCst);
            Err(outage())
        }
    }

    struct FixedBooks;

    #[async_trait]
    impl BookLookup for FixedBooks {
        async fn list_book_titles(&self) -> Result<Vec<BookTitle>, StoreError> {
            Ok(vec![BookTitle {
                id: BookId::new("book-1"),
                title: "The Rust Programming Language".to_string(),
            }])
        }
    }

    /// Book lookup that is always down.
    struct UnreachableBooks;

    #[async_trait]
    impl BookLookup for UnreachableBooks {
        async fn list_book_titles(&self) -> Result<Vec<BookTitle>, StoreError> {
            Err(outage())
        }
    }

    #[tokio::test]
    async fn create_with_empty_book_rerenders_without_persisting() {
        let (_db, store, workflow) = seeded().await;

        let outcome = workflow
            .create(&submission("", "Penguin", "Available", "2024-01-01"))
            .await
            .unwrap();

        let form = form_view(&outcome);
        assert_eq!(error_messages(form), vec![BOOK_REQUIRED]);
        assert_eq!(form.title, "Create BookInstance");
        assert_eq!(form.book_list.len(), 4);
        assert_eq!(form.bookinstance.as_ref().unwrap().imprint, "Penguin");
        assert!(store.list_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn create_with_bad_date_or_imprint_rerenders() {
        let (_db, store, workflow) = seeded().await;

        let outcome = workflow
            .create(&submission("book-1", "  ", "Available", "2024-02-31"))
            .await
            .unwrap();
        assert_eq!(
            error_messages(form_view(&outcome)),
            vec![IMPRINT_REQUIRED, INVALID_DATE]
        );
        assert_eq!(form_view(&outcome).selected_book.as_deref(), Some("book-1"));
        assert!(store.list_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn create_with_unknown_status_rerenders() {
        let (_db, store, workflow) = seeded().await;

        let outcome = workflow
            .create(&submission("book-1", "Penguin", "Stolen", "2024-01-01"))
            .await
            .unwrap();
        assert_eq!(error_messages(form_view(&outcome)), vec![INVALID_STATUS]);
        assert!(store.list_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn create_persists_normalized_fields_and_redirects_to_detail() {
        let (_db, store, workflow) = seeded().await;

        let outcome = workflow
            .create(&submission("book-2", " Penguin ", "Loaned", "2025-06-01"))
            .await
            .unwrap();

        let stored = store.list_all().await.unwrap();
        assert_eq!(stored.len(), 1);
        let record = &stored[0].instance;
        assert_eq!(record.book, BookId::new("book-2"));
        assert_eq!(record.imprint, "Penguin");
        assert_eq!(record.status, InstanceStatus::Loaned);
        assert_eq!(record.due_back, NaiveDate::from_ymd_opt(2025, 6, 1).unwrap());
        assert_eq!(outcome, Outcome::Redirect(format!("/instances/{}", record.id)));
    }

    #[tokio::test]
    async fn create_store_fault_is_fatal() {
        let failing = Arc::new(FailingStore::default());
        let workflow = InstanceWorkflow::new(failing.clone(), Arc::new(FixedBooks));

        let err = workflow
            .create(&submission("book-1", "Penguin", "Available", "2024-01-01"))
            .await
            .unwrap_err();
        assert!(matches!(err, WorkflowError::Store(StoreError::Unavailable(_))));
        assert_eq!(failing.writes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn invalid_create_never_reaches_the_store() {
        let failing = Arc::new(FailingStore::default());
        let workflow = InstanceWorkflow::new(failing.clone(), Arc::new(FixedBooks));

        let outcome = workflow
            .create(&submission("", "", "Available", "2024-01-01"))
            .await
            .unwrap();
        assert_eq!(error_messages(form_view(&outcome)).len(), 2);
        assert_eq!(failing.writes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn create_form_offers_books_and_statuses() {
        let (_db, _store, workflow) = seeded().await;

        let outcome = workflow.create_form().await.unwrap();
        let form = form_view(&outcome);
        assert_eq!(form.title, "Create BookInstance");
        assert_eq!(form.status_list, InstanceStatus::ALL);
        assert!(form.bookinstance.is_none());
        assert!(!form.has_errors());
    }

    #[tokio::test]
    async fn list_renders_populated_instances() {
        let (_db, store, workflow) = seeded().await;
        insert(&store, "book-1", InstanceStatus::Available).await;
        insert(&store, "book-3", InstanceStatus::Maintenance).await;

        let outcome = workflow.list().await.unwrap();
        match outcome.view() {
            Some(View::InstanceList {
                title,
                bookinstance_list,
            }) => {
                assert_eq!(title, "Book Instance List");
                assert_eq!(bookinstance_list.len(), 2);
                let mut titles: Vec<_> = bookinstance_list.iter().map(|p| p.book_title()).collect();
                titles.sort();
                assert_eq!(titles, vec!["Rust for Rustaceans", "The Rust Programming Language"]);
            }
            other => panic!("expected list view, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn list_store_fault_is_fatal() {
        let workflow = InstanceWorkflow::new(Arc::new(FailingStore::default()), Arc::new(FixedBooks));
        assert!(matches!(
            workflow.list().await.unwrap_err(),
            WorkflowError::Store(_)
        ));
    }

    #[tokio::test]
    async fn detail_titles_page_with_book() {
        let (_db, store, workflow) = seeded().await;
        let stored = insert(&store, "book-4", InstanceStatus::Reserved).await;

        let outcome = workflow.detail(&stored.id).await.unwrap();
        let view = outcome.view().unwrap();
        assert_eq!(view.name(), "instance_detail");
        assert_eq!(view.title(), "Copy: Rust Atomics and Locks");
    }

    #[tokio::test]
    async fn detail_of_missing_id_is_not_found() {
        let (_db, _store, workflow) = seeded().await;

        let err = workflow.detail(&InstanceId::new("nope")).await.unwrap_err();
        assert!(matches!(err, WorkflowError::NotFound { ref id } if id.as_str() == "nope"));
    }

    #[tokio::test]
    async fn update_form_prefills_stored_fields() {
        let (_db, store, workflow) = seeded().await;
        let stored = insert(&store, "book-2", InstanceStatus::Loaned).await;

        let outcome = workflow.update_form(&stored.id).await.unwrap();
        let form = form_view(&outcome);
        assert_eq!(form.title, format!("Update BookInstance: {}", stored.id));
        assert_eq!(form.selected_book.as_deref(), Some("book-2"));

        let draft = form.bookinstance.as_ref().unwrap();
        assert_eq!(draft.id.as_ref(), Some(&stored.id));
        assert_eq!(draft.status, "Loaned");
        assert_eq!(draft.due_back, "2024-01-01");
    }

    #[tokio::test]
    async fn update_form_for_missing_id_redirects_to_list() {
        let (_db, _store, workflow) = seeded().await;

        let outcome = workflow.update_form(&InstanceId::new("gone")).await.unwrap();
        assert_eq!(outcome.location(), Some(LIST_LOCATION));
    }

    #[tokio::test]
    async fn update_form_aborts_when_either_read_fails() {
        let workflow = InstanceWorkflow::new(Arc::new(FailingStore::default()), Arc::new(FixedBooks));

        let err = workflow.update_form(&InstanceId::new("any")).await.unwrap_err();
        assert!(matches!(err, WorkflowError::Store(_)));
    }

    #[tokio::test]
    async fn update_form_aborts_when_book_lookup_fails() {
        let (_db, store, _) = seeded().await;
        let stored = insert(&store, "book-1", InstanceStatus::Available).await;
        let workflow = InstanceWorkflow::new(Arc::new(store.clone()), Arc::new(UnreachableBooks));

        let err = workflow.update_form(&stored.id).await.unwrap_err();
        assert!(matches!(err, WorkflowError::Store(StoreError::Unavailable(_))));
    }

    #[tokio::test]
    async fn update_form_of_missing_id_still_fails_on_book_lookup() {
        let (_db, store, _) = seeded().await;
        let workflow = InstanceWorkflow::new(Arc::new(store), Arc::new(UnreachableBooks));

        let err = workflow.update_form(&InstanceId::new("gone")).await.unwrap_err();
        assert!(matches!(err, WorkflowError::Store(_)));
    }

    #[tokio::test]
    async fn update_overwrites_every_field() {
        let (_db, store, workflow) = seeded().await;
        let stored = insert(&store, "book-1", InstanceStatus::Available).await;

        let outcome = workflow
            .update(
                &stored.id,
                &submission("book-3", "No Starch", "Reserved", "2026-03-15"),
            )
            .await
            .unwrap();
        assert_eq!(outcome.location(), Some(instance_url(&stored.id).as_str()));

        let found = store.find_by_id(&stored.id).await.unwrap().unwrap();
        assert_eq!(
            found.instance,
            BookInstance {
                id: stored.id.clone(),
                book: BookId::new("book-3"),
                imprint: "No Starch".to_string(),
                status: InstanceStatus::Reserved,
                due_back: NaiveDate::from_ymd_opt(2026, 3, 15).unwrap(),
            }
        );
        assert_eq!(store.list_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn invalid_update_rerenders_and_leaves_record() {
        let (_db, store, workflow) = seeded().await;
        let stored = insert(&store, "book-1", InstanceStatus::Available).await;

        let outcome = workflow
            .update(&stored.id, &submission("book-1", "", "Available", "never"))
            .await
            .unwrap();

        let form = form_view(&outcome);
        assert_eq!(error_messages(form), vec![IMPRINT_REQUIRED, INVALID_DATE]);
        assert_eq!(form.title, format!("Update BookInstance: {}", stored.id));
        assert_eq!(
            form.bookinstance.as_ref().unwrap().id.as_ref(),
            Some(&stored.id)
        );

        let found = store.find_by_id(&stored.id).await.unwrap().unwrap();
        assert_eq!(found.instance, stored);
    }

    #[tokio::test]
    async fn update_of_vanished_record_redirects_to_list() {
        let (_db, store, workflow) = seeded().await;

        let outcome = workflow
            .update(
                &InstanceId::new("vanished"),
                &submission("book-1", "Penguin", "Available", "2024-01-01"),
            )
            .await
            .unwrap();
        assert_eq!(outcome.location(), Some(LIST_LOCATION));
        assert!(store.list_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn update_store_fault_is_fatal() {
        let failing = Arc::new(FailingStore::default());
        let workflow = InstanceWorkflow::new(failing.clone(), Arc::new(FixedBooks));

        let err = workflow
            .update(
                &InstanceId::new("any"),
                &submission("book-1", "Penguin", "Available", "2024-01-01"),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, WorkflowError::Store(_)));
        assert_eq!(failing.writes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn delete_form_shows_instance() {
        let (_db, store, workflow) = seeded().await;
        let stored = insert(&store, "book-1", InstanceStatus::Available).await;

        let outcome = workflow.delete_form(&stored.id).await.unwrap();
        match outcome.view() {
            Some(View::InstanceDelete { title, instance }) => {
                assert_eq!(title, "Delete BookInstance");
                assert_eq!(instance.instance.id, stored.id);
            }
            other => panic!("expected delete view, got {:?}", other),
        }
        assert_eq!(store.list_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn delete_removes_and_redirects() {
        let (_db, store, workflow) = seeded().await;
        let stored = insert(&store, "book-1", InstanceStatus::Available).await;
        let kept = insert(&store, "book-2", InstanceStatus::Available).await;

        let outcome = workflow.delete(&stored.id).await.unwrap();
        assert_eq!(outcome.location(), Some(LIST_LOCATION));

        let remaining: Vec<_> = store
            .list_all()
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.instance.id)
            .collect();
        assert_eq!(remaining, vec![kept.id]);
    }

    #[tokio::test]
    async fn delete_of_missing_id_is_idempotent() {
        let (_db, store, workflow) = seeded().await;
        let kept = insert(&store, "book-1", InstanceStatus::Available).await;

        for _ in 0..2 {
            let outcome = workflow.delete(&InstanceId::new("absent")).await.unwrap();
            assert_eq!(outcome.location(), Some(LIST_LOCATION));
        }
        assert_eq!(delete_form_location(&workflow).await, Some(LIST_LOCATION.to_string()));
        assert_eq!(store.list_all().await.unwrap()[0].instance, kept);
    }

    async fn delete_form_location(workflow: &InstanceWorkflow) -> Option<String> {
        workflow
            .delete_form(&InstanceId::new("absent"))
            .await
            .unwrap()
            .location()
            .map(str::to_string)
    }

    #[tokio::test]
    async fn delete_store_fault_is_fatal() {
        let workflow = InstanceWorkflow::new(Arc::new(FailingStore::default()), Arc::new(FixedBooks));
        assert!(matches!(
            workflow.delete(&InstanceId::new("any")).await.unwrap_err(),
            WorkflowError::Store(_)
        ));
    }

    #[tokio::test]
    async fn closed_database_fails_create_form() {
        let (db, _store, workflow) = seeded().await;
        db.close();

        assert!(matches!(
            workflow.create_form().await.unwrap_err(),
            WorkflowError::Store(StoreError::Unavailable(_))
        ));
    }
}
