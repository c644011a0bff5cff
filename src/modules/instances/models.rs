use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Store-assigned identifier of a book copy.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InstanceId(String);

impl InstanceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Reference to a cataloged book.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BookId(String);

impl BookId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BookId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A cataloged book. Read here, never written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Book {
    pub id: BookId,
    pub title: String,
    pub author: String,
    pub isbn: String,
}

/// Entry of the selectable book list offered by the instance forms.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookTitle {
    pub id: BookId,
    pub title: String,
}

impl From<&Book> for BookTitle {
    fn from(book: &Book) -> Self {
        Self {
            id: book.id.clone(),
            title: book.title.clone(),
        }
    }
}

/// Availability of a physical copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InstanceStatus {
    Maintenance,
    Available,
    Loaned,
    Reserved,
}

impl InstanceStatus {
    pub const ALL: [InstanceStatus; 4] = [
        InstanceStatus::Maintenance,
        InstanceStatus::Available,
        InstanceStatus::Loaned,
        InstanceStatus::Reserved,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            InstanceStatus::Maintenance => "Maintenance",
            InstanceStatus::Available => "Available",
            InstanceStatus::Loaned => "Loaned",
            InstanceStatus::Reserved => "Reserved",
        }
    }
}

impl fmt::Display for InstanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a status string is outside the fixed value set.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown status '{0}'")]
pub struct UnknownStatus(pub String);

impl FromStr for InstanceStatus {
    type Err = UnknownStatus;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        InstanceStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == value)
            .ok_or_else(|| UnknownStatus(value.to_string()))
    }
}

/// Validated field set of a copy that has not been given an identity yet.
/// Both insert and full replace take one of these.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewInstance {
    pub book: BookId,
    pub imprint: String,
    pub status: InstanceStatus,
    pub due_back: NaiveDate,
}

impl NewInstance {
    pub fn with_id(self, id: InstanceId) -> BookInstance {
        BookInstance {
            id,
            book: self.book,
            imprint: self.imprint,
            status: self.status,
            due_back: self.due_back,
        }
    }
}

/// A persisted copy of a book.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookInstance {
    pub id: InstanceId,
    pub book: BookId,
    pub imprint: String,
    pub status: InstanceStatus,
    pub due_back: NaiveDate,
}

impl BookInstance {
    /// Location of the copy's detail page.
    pub fn url(&self) -> String {
        instance_url(&self.id)
    }
}

pub fn instance_url(id: &InstanceId) -> String {
    format!("/instances/{}", id)
}

/// A copy with its referenced book resolved. `book` is `None` when the
/// reference points at a book that no longer exists.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PopulatedInstance {
    #[serde(flatten)]
    pub instance: BookInstance,
    #[serde(rename = "book_detail")]
    pub book: Option<Book>,
    pub url: String,
}

impl PopulatedInstance {
    pub fn new(instance: BookInstance, book: Option<Book>) -> Self {
        let url = instance.url();
        Self {
            instance,
            book,
            url,
        }
    }

    pub fn book_title(&self) -> &str {
        self.book
            .as_ref()
            .map(|book| book.title.as_str())
            .unwrap_or("(unknown book)")
    }
}

/// Transient copy built from submitted fields to echo them back into a form.
/// Every field holds the normalized (trimmed, escaped) submission, valid or not.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct InstanceDraft {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<InstanceId>,
    pub book: String,
    pub imprint: String,
    pub status: String,
    pub due_back: String,
}

impl From<&BookInstance> for InstanceDraft {
    fn from(instance: &BookInstance) -> Self {
        Self {
            id: Some(instance.id.clone()),
            book: instance.book.to_string(),
            imprint: instance.imprint.clone(),
            status: instance.status.to_string(),
            due_back: instance.due_back.format("%Y-%m-%d").to_string(),
        }
    }
}
