use std::collections::HashMap;

use async_trait::async_trait;
use catalog_db::{Collection, Database, StoreError};

use super::models::{
    Book, BookId, BookInstance, BookTitle, InstanceId, NewInstance, PopulatedInstance,
};
use super::repository::{BookLookup, InstanceRepository};

const BOOKS: &str = "books";
const INSTANCES: &str = "book_instances";

/// Repository and book lookup backed by the catalog database.
#[derive(Clone)]
pub struct SurrealCatalogStore {
    books: Collection<Book>,
    instances: Collection<BookInstance>,
}

impl SurrealCatalogStore {
    pub fn new(db: &Database) -> Self {
        Self {
            books: db.collection(BOOKS),
            instances: db.collection(INSTANCES),
        }
    }

    /// Load reference books. Existing books with the same id are overwritten.
    pub async fn seed_books(&self, books: impl IntoIterator<Item = Book>) -> Result<usize, StoreError> {
        let mut count = 0;
        for book in books {
            let id = book.id.to_string();
            self.books.put(id, book).await?;
            count += 1;
        }
        Ok(count)
    }

    async fn ensure_book_exists(&self, book: &BookId) -> Result<(), StoreError> {
        if self.books.contains(book.as_str()).await? {
            Ok(())
        } else {
            Err(StoreError::Constraint {
                collection: INSTANCES,
                message: format!("referenced book '{}' does not exist", book),
            })
        }
    }

    async fn populate(&self, instance: BookInstance) -> Result<PopulatedInstance, StoreError> {
        let book = self.books.get(instance.book.as_str()).await?;
        Ok(PopulatedInstance::new(instance, book))
    }
}

#[async_trait]
impl InstanceRepository for SurrealCatalogStore {
    async fn list_all(&self) -> Result<Vec<PopulatedInstance>, StoreError> {
        let books: HashMap<BookId, Book> = self
            .books
            .all()
            .await?
            .into_iter()
            .map(|book| (book.id.clone(), book))
            .collect();

        let instances = self.instances.all().await?;
        Ok(instances
            .into_iter()
            .map(|instance| {
                let book = books.get(&instance.book).cloned();
                PopulatedInstance::new(instance, book)
            })
            .collect())
    }

    async fn find_by_id(&self, id: &InstanceId) -> Result<Option<PopulatedInstance>, StoreError> {
        match self.instances.get(id.as_str()).await? {
            Some(instance) => Ok(Some(self.populate(instance).await?)),
            None => Ok(None),
        }
    }

    async fn insert(&self, instance: NewInstance) -> Result<BookInstance, StoreError> {
        self.ensure_book_exists(&instance.book).await?;

        let stored = self
            .instances
            .insert(|id| instance.with_id(InstanceId::new(id)))
            .await?;
        tracing::info!(instance_id = %stored.id, book = %stored.book, "book copy inserted");
        Ok(stored)
    }

    async fn replace(
        &self,
        id: &InstanceId,
        instance: NewInstance,
    ) -> Result<Option<BookInstance>, StoreError> {
        self.ensure_book_exists(&instance.book).await?;

        let replaced = self
            .instances
            .replace(id.as_str(), instance.with_id(id.clone()))
            .await?;
        if replaced.is_some() {
            tracing::info!(instance_id = %id, "book copy replaced");
        }
        Ok(replaced)
    }

    async fn delete_by_id(&self, id: &InstanceId) -> Result<(), StoreError> {
        if self.instances.remove(id.as_str()).await?.is_some() {
            tracing::info!(instance_id = %id, "book copy deleted");
        }
        Ok(())
    }
}

#[async_trait]
impl BookLookup for SurrealCatalogStore {
    async fn list_book_titles(&self) -> Result<Vec<BookTitle>, StoreError> {
        let mut titles: Vec<BookTitle> = self.books.all().await?.iter().map(BookTitle::from).collect();
        titles.sort_by(|a, b| a.title.cmp(&b.title));
        Ok(titles)
    }
}

/// Reference books loaded when `database.seed_books` is enabled.
pub fn sample_books() -> Vec<Book> {
    [
        ("book-1", "The Rust Programming Language", "Steve Klabnik", "9781718503106"),
        ("book-2", "Programming Rust", "Jim Blandy", "9781492052593"),
        ("book-3", "Rust for Rustaceans", "Jon Gjengset", "9781718501850"),
        ("book-4", "Rust Atomics and Locks", "Mara Bos", "9781098119447"),
    ]
    .into_iter()
    .map(|(id, title, author, isbn)| Book {
        id: BookId::new(id),
        title: title.to_string(),
        author: author.to_string(),
        isbn: isbn.to_string(),
    })
    .collect()
}
