//! SQLite persistence for user accounts and chat sessions.
//!
//! Queries run on the blocking thread pool through [`Store::run`]; the
//! handlers only ever see the async methods.

use std::path::Path;

use chrono::{SecondsFormat, Utc};
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, Connection, ErrorCode, OptionalExtension};
use serde::Serialize;
use thiserror::Error;

use lexai_core::{ChatRole, ChatTurn};

/// Errors from the account and session store.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Failed to get connection: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Email already registered")]
    EmailTaken,

    #[error("Database task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS users (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        email TEXT NOT NULL UNIQUE,
        password_hash TEXT NOT NULL,
        full_name TEXT NOT NULL,
        created_at TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS chat_sessions (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id INTEGER NOT NULL,
        title TEXT NOT NULL,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
    )",
    "CREATE TABLE IF NOT EXISTS chat_messages (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        session_id INTEGER NOT NULL,
        role TEXT NOT NULL,
        content TEXT NOT NULL,
        created_at TEXT NOT NULL,
        FOREIGN KEY (session_id) REFERENCES chat_sessions(id) ON DELETE CASCADE
    )",
    "CREATE INDEX IF NOT EXISTS idx_chat_sessions_user ON chat_sessions(user_id)",
    "CREATE INDEX IF NOT EXISTS idx_chat_messages_session ON chat_messages(session_id)",
];

/// A registered user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub full_name: String,
}

/// A user together with the stored password hash.
#[derive(Debug, Clone)]
pub struct UserCredentials {
    pub user: User,
    pub password_hash: String,
}

/// A chat session as listed to its owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatSessionSummary {
    pub id: i64,
    pub title: String,
    pub created_at: String,
    pub updated_at: String,
    pub message_count: i64,
}

/// One persisted chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoredMessage {
    pub role: String,
    pub content: String,
    pub created_at: String,
}

impl From<&StoredMessage> for ChatTurn {
    fn from(message: &StoredMessage) -> Self {
        ChatTurn {
            role: ChatRole::from(message.role.as_str()),
            content: message.content.clone(),
        }
    }
}

/// Fixed-width UTC timestamps, so text order is time order.
fn now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn init_connection(conn: &mut Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch("PRAGMA foreign_keys = ON; PRAGMA busy_timeout = 5000;")
}

/// Pooled SQLite store. Cloning shares the pool.
#[derive(Clone)]
pub struct Store {
    pool: Pool<SqliteConnectionManager>,
}

impl Store {
    /// Open (creating if needed) the database file at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let manager = SqliteConnectionManager::file(path).with_init(init_connection);
        Self::with_pool(Pool::new(manager)?)
    }

    /// A private in-memory database. One connection, so every query sees
    /// the same data.
    pub fn in_memory() -> Result<Self, StoreError> {
        let manager = SqliteConnectionManager::memory().with_init(init_connection);
        Self::with_pool(Pool::builder().max_size(1).build(manager)?)
    }

    fn with_pool(pool: Pool<SqliteConnectionManager>) -> Result<Self, StoreError> {
        let conn = pool.get()?;
        for statement in SCHEMA {
            conn.execute(statement, [])?;
        }
        Ok(Self { pool })
    }

    async fn run<T, F>(&self, query: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> Result<T, StoreError> + Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = pool.get()?;
            query(&mut *conn)
        })
        .await?
    }

    pub async fn create_user(
        &self,
        email: String,
        password_hash: String,
        full_name: String,
    ) -> Result<User, StoreError> {
        self.run(move |conn| {
            let inserted = conn.execute(
                "INSERT INTO users (email, password_hash, full_name, created_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![email, password_hash, full_name, now()],
            );
            match inserted {
                Ok(_) => Ok(User {
                    id: conn.last_insert_rowid(),
                    email,
                    full_name,
                }),
                Err(rusqlite::Error::SqliteFailure(e, _))
                    if e.code == ErrorCode::ConstraintViolation =>
                {
                    Err(StoreError::EmailTaken)
                }
                Err(e) => Err(e.into()),
            }
        })
        .await
    }

    pub async fn user_by_email(&self, email: String) -> Result<Option<UserCredentials>, StoreError> {
        self.run(move |conn| {
            let found = conn
                .query_row(
                    "SELECT id, email, full_name, password_hash FROM users WHERE email = ?1",
                    params![email],
                    |row| {
                        Ok(UserCredentials {
                            user: User {
                                id: row.get(0)?,
                                email: row.get(1)?,
                                full_name: row.get(2)?,
                            },
                            password_hash: row.get(3)?,
                        })
                    },
                )
                .optional()?;
            Ok(found)
        })
        .await
    }

    pub async fn user_by_id(&self, id: i64) -> Result<Option<User>, StoreError> {
        self.run(move |conn| {
            let found = conn
                .query_row(
                    "SELECT id, email, full_name FROM users WHERE id = ?1",
                    params![id],
                    |row| {
                        Ok(User {
                            id: row.get(0)?,
                            email: row.get(1)?,
                            full_name: row.get(2)?,
                        })
                    },
                )
                .optional()?;
            Ok(found)
        })
        .await
    }

    pub async fn create_session(
        &self,
        user_id: i64,
        title: String,
    ) -> Result<ChatSessionSummary, StoreError> {
        self.run(move |conn| {
            let created_at = now();
            conn.execute(
                "INSERT INTO chat_sessions (user_id, title, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?3)",
                params![user_id, title, created_at],
            )?;
            Ok(ChatSessionSummary {
                id: conn.last_insert_rowid(),
                title,
                updated_at: created_at.clone(),
                created_at,
                message_count: 0,
            })
        })
        .await
    }

    /// Sessions owned by `user_id`, most recently active first.
    pub async fn sessions_for(&self, user_id: i64) -> Result<Vec<ChatSessionSummary>, StoreError> {
        self.run(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT s.id, s.title, s.created_at, s.updated_at,
                        (SELECT COUNT(*) FROM chat_messages m WHERE m.session_id = s.id)
                 FROM chat_sessions s WHERE s.user_id = ?1
                 ORDER BY s.updated_at DESC, s.id DESC",
            )?;
            let sessions = stmt
                .query_map(params![user_id], session_from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(sessions)
        })
        .await
    }

    /// A session, only if `user_id` owns it.
    pub async fn session(
        &self,
        user_id: i64,
        session_id: i64,
    ) -> Result<Option<ChatSessionSummary>, StoreError> {
        self.run(move |conn| {
            let found = conn
                .query_row(
                    "SELECT s.id, s.title, s.created_at, s.updated_at,
                            (SELECT COUNT(*) FROM chat_messages m WHERE m.session_id = s.id)
                     FROM chat_sessions s WHERE s.id = ?1 AND s.user_id = ?2",
                    params![session_id, user_id],
                    session_from_row,
                )
                .optional()?;
            Ok(found)
        })
        .await
    }

    /// Messages of a session, oldest first.
    pub async fn messages(&self, session_id: i64) -> Result<Vec<StoredMessage>, StoreError> {
        self.run(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT role, content, created_at FROM chat_messages
                 WHERE session_id = ?1 ORDER BY created_at ASC, id ASC",
            )?;
            let messages = stmt
                .query_map(params![session_id], |row| {
                    Ok(StoredMessage {
                        role: row.get(0)?,
                        content: row.get(1)?,
                        created_at: row.get(2)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(messages)
        })
        .await
    }

    /// Append a user message and the model's reply, and mark the session active.
    pub async fn append_exchange(
        &self,
        session_id: i64,
        message: String,
        reply: String,
    ) -> Result<(), StoreError> {
        self.run(move |conn| {
            let tx = conn.transaction()?;
            let asked_at = now();
            tx.execute(
                "INSERT INTO chat_messages (session_id, role, content, created_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![session_id, ChatRole::User.as_str(), message, asked_at],
            )?;
            let answered_at = now();
            tx.execute(
                "INSERT INTO chat_messages (session_id, role, content, created_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![session_id, ChatRole::Model.as_str(), reply, answered_at],
            )?;
            tx.execute(
                "UPDATE chat_sessions SET updated_at = ?1 WHERE id = ?2",
                params![answered_at, session_id],
            )?;
            tx.commit()?;
            Ok(())
        })
        .await
    }

    /// Delete a session and its messages. False when `user_id` owns no such session.
    pub async fn delete_session(&self, user_id: i64, session_id: i64) -> Result<bool, StoreError> {
        self.run(move |conn| {
            let tx = conn.transaction()?;
            let deleted = tx.execute(
                "DELETE FROM chat_sessions WHERE id = ?1 AND user_id = ?2",
                params![session_id, user_id],
            )?;
            if deleted > 0 {
                tx.execute(
                    "DELETE FROM chat_messages WHERE session_id = ?1",
                    params![session_id],
                )?;
            }
            tx.commit()?;
            Ok(deleted > 0)
        })
        .await
    }
}

fn session_from_row(row: &rusqlite::Row<'_>) -> Result<ChatSessionSummary, rusqlite::Error> {
    Ok(ChatSessionSummary {
        id: row.get(0)?,
        title: row.get(1)?,
        created_at: row.get(2)?,
        updated_at: row.get(3)?,
        message_count: row.get(4)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn store_with_user() -> (Store, User) {
        let store = Store::in_memory().unwrap();
        let user = store
            .create_user(
                "dana@example.com".to_string(),
                "hash".to_string(),
                "Dana Reyes".to_string(),
            )
            .await
            .unwrap();
        (store, user)
    }

    #[tokio::test]
    async fn test_user_lookup() {
        let (store, user) = store_with_user().await;

        let by_email = store
            .user_by_email("dana@example.com".to_string())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(by_email.user, user);
        assert_eq!(by_email.password_hash, "hash");

        assert_eq!(store.user_by_id(user.id).await.unwrap(), Some(user));
        assert!(store.user_by_id(999).await.unwrap().is_none());
        assert!(store
            .user_by_email("nobody@example.com".to_string())
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_duplicate_email_rejected() {
        let (store, _) = store_with_user().await;
        let result = store
            .create_user(
                "dana@example.com".to_string(),
                "other".to_string(),
                "Someone Else".to_string(),
            )
            .await;
        assert!(matches!(result, Err(StoreError::EmailTaken)));
    }

    #[tokio::test]
    async fn test_exchange_is_stored_in_order() {
        let (store, user) = store_with_user().await;
        let session = store
            .create_session(user.id, "Lease review".to_string())
            .await
            .unwrap();
        assert_eq!(session.message_count, 0);
        assert_eq!(session.created_at, session.updated_at);
        tokio::time::sleep(std::time::Duration::from_millis(2)).await;

        store
            .append_exchange(
                session.id,
                "What is clause 4?".to_string(),
                "A non-compete.".to_string(),
            )
            .await
            .unwrap();
        store
            .append_exchange(
                session.id,
                "Is it enforceable?".to_string(),
                "Probably not.".to_string(),
            )
            .await
            .unwrap();

        let messages = store.messages(session.id).await.unwrap();
        let contents: Vec<(&str, &str)> = messages
            .iter()
            .map(|m| (m.role.as_str(), m.content.as_str()))
            .collect();
        assert_eq!(
            contents,
            vec![
                ("user", "What is clause 4?"),
                ("model", "A non-compete."),
                ("user", "Is it enforceable?"),
                ("model", "Probably not."),
            ]
        );

        let listed = store.session(user.id, session.id).await.unwrap().unwrap();
        assert_eq!(listed.message_count, 4);
        assert!(listed.updated_at > listed.created_at);

        let turns: Vec<ChatTurn> = messages.iter().map(ChatTurn::from).collect();
        assert_eq!(turns[1], ChatTurn::model("A non-compete."));
    }

    #[tokio::test]
    async fn test_sessions_listed_most_recent_first() {
        let (store, user) = store_with_user().await;
        let first = store.create_session(user.id, "First".to_string()).await.unwrap();
        let second = store.create_session(user.id, "Second".to_string()).await.unwrap();

        let ids: Vec<i64> = store
            .sessions_for(user.id)
            .await
            .unwrap()
            .iter()
            .map(|s| s.id)
            .collect();
        assert_eq!(ids, vec![second.id, first.id]);

        tokio::time::sleep(std::time::Duration::from_millis(2)).await;
        store
            .append_exchange(first.id, "q".to_string(), "a".to_string())
            .await
            .unwrap();
        let ids: Vec<i64> = store
            .sessions_for(user.id)
            .await
            .unwrap()
            .iter()
            .map(|s| s.id)
            .collect();
        assert_eq!(ids, vec![first.id, second.id]);
    }

    #[tokio::test]
    async fn test_sessions_are_private_to_owner() {
        let (store, owner) = store_with_user().await;
        let other = store
            .create_user("sam@example.com".to_string(), "h".to_string(), "Sam".to_string())
            .await
            .unwrap();
        let session = store.create_session(owner.id, "Mine".to_string()).await.unwrap();

        assert!(store.session(other.id, session.id).await.unwrap().is_none());
        assert!(store.sessions_for(other.id).await.unwrap().is_empty());
        assert!(!store.delete_session(other.id, session.id).await.unwrap());
        assert!(store.session(owner.id, session.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_delete_removes_messages() {
        let (store, user) = store_with_user().await;
        let session = store.create_session(user.id, "Gone".to_string()).await.unwrap();
        store
            .append_exchange(session.id, "q".to_string(), "a".to_string())
            .await
            .unwrap();

        assert!(store.delete_session(user.id, session.id).await.unwrap());
        assert!(store.session(user.id, session.id).await.unwrap().is_none());
        assert!(store.messages(session.id).await.unwrap().is_empty());
        assert!(!store.delete_session(user.id, session.id).await.unwrap());
    }
}
