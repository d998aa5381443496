/// Book records
///
/// Plain CRUD keyed by UUID, behind [`BookRepository`].

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{AppError, ValidationError};
use crate::validators::is_valid_text;

const MAX_TEXT_LENGTH: usize = 255;
const MAX_LANGUAGE_LENGTH: usize = 50;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Book {
    pub uid: Uuid,
    pub title: String,
    pub author: String,
    pub publisher: String,
    pub published_date: NaiveDate,
    pub page_count: i32,
    pub language: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BookCreate {
    pub title: String,
    pub author: String,
    pub publisher: String,
    pub published_date: NaiveDate,
    pub page_count: i32,
    pub language: String,
}

/// Partial update; absent fields are left unchanged
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BookUpdate {
    pub title: Option<String>,
    pub author: Option<String>,
    pub publisher: Option<String>,
    pub published_date: Option<NaiveDate>,
    pub page_count: Option<i32>,
    pub language: Option<String>,
}

fn validate_page_count(page_count: i32) -> Result<i32, ValidationError> {
    if page_count < 0 {
        return Err(ValidationError::Negative("page_count".to_string()));
    }
    Ok(page_count)
}

impl BookCreate {
    pub fn validate(self) -> Result<Self, ValidationError> {
        Ok(Self {
            title: is_valid_text("title", &self.title, MAX_TEXT_LENGTH)?,
            author: is_valid_text("author", &self.author, MAX_TEXT_LENGTH)?,
            publisher: is_valid_text("publisher", &self.publisher, MAX_TEXT_LENGTH)?,
            published_date: self.published_date,
            page_count: validate_page_count(self.page_count)?,
            language: is_valid_text("language", &self.language, MAX_LANGUAGE_LENGTH)?,
        })
    }
}

impl BookUpdate {
    pub fn validate(self) -> Result<Self, ValidationError> {
        Ok(Self {
            title: self.title.map(|v| is_valid_text("title", &v, MAX_TEXT_LENGTH)).transpose()?,
            author: self.author.map(|v| is_valid_text("author", &v, MAX_TEXT_LENGTH)).transpose()?,
            publisher: self
                .publisher
                .map(|v| is_valid_text("publisher", &v, MAX_TEXT_LENGTH))
                .transpose()?,
            published_date: self.published_date,
            page_count: self.page_count.map(validate_page_count).transpose()?,
            language: self
                .language
                .map(|v| is_valid_text("language", &v, MAX_LANGUAGE_LENGTH))
                .transpose()?,
        })
    }
}

#[async_trait]
pub trait BookRepository: Send + Sync {
    /// Newest first
    async fn list(&self) -> Result<Vec<Book>, AppError>;

    async fn get(&self, uid: Uuid) -> Result<Option<Book>, AppError>;

    async fn create(&self, book: BookCreate) -> Result<Book, AppError>;

    async fn update(&self, uid: Uuid, changes: BookUpdate) -> Result<Option<Book>, AppError>;

    /// `false` when no book had that id
    async fn delete(&self, uid: Uuid) -> Result<bool, AppError>;
}

const BOOK_COLUMNS: &str =
    "uid, title, author, publisher, published_date, page_count, language, created_at, updated_at";

pub struct PgBookRepository {
    pool: PgPool,
}

impl PgBookRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BookRepository for PgBookRepository {
    async fn list(&self) -> Result<Vec<Book>, AppError> {
        let books = sqlx::query_as::<_, Book>(&format!(
            "SELECT {} FROM books ORDER BY created_at DESC",
            BOOK_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(books)
    }

    async fn get(&self, uid: Uuid) -> Result<Option<Book>, AppError> {
        let book = sqlx::query_as::<_, Book>(&format!("SELECT {} FROM books WHERE uid = $1", BOOK_COLUMNS))
            .bind(uid)
            .fetch_optional(&self.pool)
            .await?;
        Ok(book)
    }

    async fn create(&self, book: BookCreate) -> Result<Book, AppError> {
        let now = Utc::now();
        let created = sqlx::query_as::<_, Book>(&format!(
            r#"
            INSERT INTO books
                (uid, title, author, publisher, published_date, page_count, language, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $8)
            RETURNING {}
            "#,
            BOOK_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(&book.title)
        .bind(&book.author)
        .bind(&book.publisher)
        .bind(book.published_date)
        .bind(book.page_count)
        .bind(&book.language)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;
        Ok(created)
    }

    async fn update(&self, uid: Uuid, changes: BookUpdate) -> Result<Option<Book>, AppError> {
        let updated = sqlx::query_as::<_, Book>(&format!(
            r#"
            UPDATE books SET
                title = COALESCE($2, title),
                author = COALESCE($3, author),
                publisher = COALESCE($4, publisher),
                published_date = COALESCE($5, published_date),
                page_count = COALESCE($6, page_count),
                language = COALESCE($7, language),
                updated_at = $8
            WHERE uid = $1
            RETURNING {}
            "#,
            BOOK_COLUMNS
        ))
        .bind(uid)
        .bind(changes.title)
        .bind(changes.author)
        .bind(changes.publisher)
        .bind(changes.published_date)
        .bind(changes.page_count)
        .bind(changes.language)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await?;
        Ok(updated)
    }

    async fn delete(&self, uid: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM books WHERE uid = $1")
            .bind(uid)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[derive(Default)]
pub struct InMemoryBookRepository {
    books: RwLock<HashMap<Uuid, Book>>,
}

impl InMemoryBookRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BookRepository for InMemoryBookRepository {
    async fn list(&self) -> Result<Vec<Book>, AppError> {
        let mut books: Vec<Book> = self.books.read().await.values().cloned().collect();
        books.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(books)
    }

    async fn get(&self, uid: Uuid) -> Result<Option<Book>, AppError> {
        Ok(self.books.read().await.get(&uid).cloned())
    }

    async fn create(&self, book: BookCreate) -> Result<Book, AppError> {
        let now = Utc::now();
        let created = Book {
            uid: Uuid::new_v4(),
            title: book.title,
            author: book.author,
            publisher: book.publisher,
            published_date: book.published_date,
            page_count: book.page_count,
            language: book.language,
            created_at: now,
            updated_at: now,
        };
        self.books.write().await.insert(created.uid, created.clone());
        Ok(created)
    }

    async fn update(&self, uid: Uuid, changes: BookUpdate) -> Result<Option<Book>, AppError> {
        let mut books = self.books.write().await;
        let Some(book) = books.get_mut(&uid) else {
            return Ok(None);
        };

        if let Some(title) = changes.title {
            book.title = title;
        }
        if let Some(author) = changes.author {
            book.author = author;
        }
        if let Some(publisher) = changes.publisher {
            book.publisher = publisher;
        }
        if let Some(published_date) = changes.published_date {
            book.published_date = published_date;
        }
        if let Some(page_count) = changes.page_count {
            book.page_count = page_count;
        }
        if let Some(language) = changes.language {
            book.language = language;
        }
        book.updated_at = Utc::now();

        Ok(Some(book.clone()))
    }

    async fn delete(&self, uid: Uuid) -> Result<bool, AppError> {
        Ok(self.books.write().await.remove(&uid).is_some())
    }
}
