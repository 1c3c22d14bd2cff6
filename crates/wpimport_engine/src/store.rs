use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, FixedOffset, Utc};
use rusqlite::{params, Connection, OptionalExtension};

pub type UserId = i64;
pub type CategoryId = i64;
pub type ArticleId = i64;
pub type AttachmentId = i64;

const SCHEMA_SQL: &str = "
CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    username TEXT NOT NULL UNIQUE
);
CREATE TABLE IF NOT EXISTS categories (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE
);
CREATE TABLE IF NOT EXISTS articles (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    title TEXT NOT NULL UNIQUE,
    slug TEXT NOT NULL,
    content TEXT NOT NULL,
    category_id INTEGER NOT NULL REFERENCES categories(id),
    author_id INTEGER NOT NULL REFERENCES users(id),
    posted_at TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS tags (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE
);
CREATE TABLE IF NOT EXISTS article_tags (
    article_id INTEGER NOT NULL REFERENCES articles(id) ON DELETE CASCADE,
    tag_id INTEGER NOT NULL REFERENCES tags(id) ON DELETE CASCADE,
    PRIMARY KEY (article_id, tag_id)
);
CREATE TABLE IF NOT EXISTS attachments (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    file TEXT NOT NULL,
    url TEXT NOT NULL,
    uploaded TEXT NOT NULL
);
";

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("failed to prepare database location: {0}")]
    Io(#[from] std::io::Error),
    #[error("author account {0:?} does not exist")]
    AuthorNotFound(String),
}

#[derive(Debug, Clone)]
pub struct NewArticle<'a> {
    pub title: &'a str,
    pub slug: &'a str,
    pub content: &'a str,
    pub category: CategoryId,
    pub author: UserId,
    pub posted_at: DateTime<FixedOffset>,
}

#[derive(Debug, Clone)]
pub struct NewAttachment<'a> {
    pub name: &'a str,
    pub file: &'a str,
    pub url: &'a str,
    pub uploaded: DateTime<Utc>,
}

/// An article read back with its relations resolved to names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredArticle {
    pub id: ArticleId,
    pub title: String,
    pub slug: String,
    pub content: String,
    pub category: String,
    pub author: String,
    pub posted_at: String,
    pub tags: BTreeSet<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredAttachment {
    pub id: AttachmentId,
    pub name: String,
    pub file: String,
    pub url: String,
}

/// Destination of an import. Category and tag creation is get-or-create;
/// nothing here wraps several writes in a transaction.
pub trait ContentStore {
    fn article_exists(&self, title: &str) -> Result<bool, StoreError>;
    fn find_user(&self, username: &str) -> Result<UserId, StoreError>;
    fn get_or_create_category(&self, name: &str) -> Result<CategoryId, StoreError>;
    fn create_article(&self, article: &NewArticle<'_>) -> Result<ArticleId, StoreError>;
    fn add_tags(&self, article: ArticleId, tags: &BTreeSet<String>) -> Result<(), StoreError>;
    fn create_attachment(&self, attachment: &NewAttachment<'_>) -> Result<AttachmentId, StoreError>;
}

pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open (or create) the database file and make sure the schema exists.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        conn.busy_timeout(Duration::from_secs(5))?;
        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.execute_batch(SCHEMA_SQL)?;
        Ok(Self { conn })
    }

    /// Accounts are managed outside the importer; this exists for setup scripts and tests.
    pub fn create_user(&self, username: &str) -> Result<UserId, StoreError> {
        self.conn
            .execute("INSERT INTO users (username) VALUES (?1)", [username])?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn article_count(&self) -> Result<usize, StoreError> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM articles", [], |row| row.get(0))?;
        Ok(usize::try_from(count).unwrap_or_default())
    }

    pub fn article(&self, title: &str) -> Result<Option<StoredArticle>, StoreError> {
        let article = self
            .conn
            .query_row(
                "SELECT a.id, a.title, a.slug, a.content, c.name, u.username, a.posted_at
                 FROM articles a
                 JOIN categories c ON c.id = a.category_id
                 JOIN users u ON u.id = a.author_id
                 WHERE a.title = ?1",
                [title],
                |row| {
                    Ok(StoredArticle {
                        id: row.get(0)?,
                        title: row.get(1)?,
                        slug: row.get(2)?,
                        content: row.get(3)?,
                        category: row.get(4)?,
                        author: row.get(5)?,
                        posted_at: row.get(6)?,
                        tags: BTreeSet::new(),
                    })
                },
            )
            .optional()?;

        let Some(mut article) = article else {
            return Ok(None);
        };
        let mut statement = self.conn.prepare(
            "SELECT t.name FROM tags t
             JOIN article_tags j ON j.tag_id = t.id
             WHERE j.article_id = ?1",
        )?;
        let rows = statement.query_map([article.id], |row| row.get::<_, String>(0))?;
        for row in rows {
            article.tags.insert(row?);
        }
        Ok(Some(article))
    }

    pub fn category_names(&self) -> Result<Vec<String>, StoreError> {
        let mut statement = self
            .conn
            .prepare("SELECT name FROM categories ORDER BY name ASC")?;
        let rows = statement.query_map([], |row| row.get::<_, String>(0))?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    pub fn attachments(&self) -> Result<Vec<StoredAttachment>, StoreError> {
        let mut statement = self
            .conn
            .prepare("SELECT id, name, file, url FROM attachments ORDER BY id ASC")?;
        let rows = statement.query_map([], |row| {
            Ok(StoredAttachment {
                id: row.get(0)?,
                name: row.get(1)?,
                file: row.get(2)?,
                url: row.get(3)?,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    fn get_or_create_named(&self, table: &str, name: &str) -> Result<i64, StoreError> {
        self.conn.execute(
            &format!("INSERT INTO {table} (name) VALUES (?1) ON CONFLICT(name) DO NOTHING"),
            [name],
        )?;
        let id = self.conn.query_row(
            &format!("SELECT id FROM {table} WHERE name = ?1"),
            [name],
            |row| row.get(0),
        )?;
        Ok(id)
    }
}

impl ContentStore for SqliteStore {
    fn article_exists(&self, title: &str) -> Result<bool, StoreError> {
        let exists: i64 = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM articles WHERE title = ?1)",
            [title],
            |row| row.get(0),
        )?;
        Ok(exists == 1)
    }

    fn find_user(&self, username: &str) -> Result<UserId, StoreError> {
        self.conn
            .query_row(
                "SELECT id FROM users WHERE username = ?1",
                [username],
                |row| row.get(0),
            )
            .optional()?
            .ok_or_else(|| StoreError::AuthorNotFound(username.to_string()))
    }

    fn get_or_create_category(&self, name: &str) -> Result<CategoryId, StoreError> {
        self.get_or_create_named("categories", name)
    }

    fn create_article(&self, article: &NewArticle<'_>) -> Result<ArticleId, StoreError> {
        self.conn.execute(
            "INSERT INTO articles (title, slug, content, category_id, author_id, posted_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                article.title,
                article.slug,
                article.content,
                article.category,
                article.author,
                article.posted_at.to_rfc3339(),
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn add_tags(&self, article: ArticleId, tags: &BTreeSet<String>) -> Result<(), StoreError> {
        for tag in tags {
            let tag_id = self.get_or_create_named("tags", tag)?;
            self.conn.execute(
                "INSERT OR IGNORE INTO article_tags (article_id, tag_id) VALUES (?1, ?2)",
                params![article, tag_id],
            )?;
        }
        Ok(())
    }

    fn create_attachment(&self, attachment: &NewAttachment<'_>) -> Result<AttachmentId, StoreError> {
        self.conn.execute(
            "INSERT INTO attachments (name, file, url, uploaded) VALUES (?1, ?2, ?3, ?4)",
            params![
                attachment.name,
                attachment.file,
                attachment.url,
                attachment.uploaded.to_rfc3339(),
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }
}
