pub mod models;
pub mod repositories;

use crate::config::RefugePaths;
use anyhow::{anyhow, Result};
use rusqlite::Connection;
use std::sync::{Arc, Mutex};

pub(crate) const MIGRATIONS: &str = r#"
    PRAGMA journal_mode = WAL;
    PRAGMA foreign_keys = ON;

    CREATE TABLE IF NOT EXISTS users (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL,
        username TEXT NOT NULL UNIQUE,
        email TEXT NOT NULL UNIQUE,
        password_hash TEXT NOT NULL,
        profile_image_url TEXT,
        bio TEXT,
        created_at TEXT NOT NULL
    );

    -- One row per direction; both rows are written in the same transaction
    -- so membership stays symmetric.
    CREATE TABLE IF NOT EXISTS connections (
        user_id TEXT NOT NULL,
        peer_id TEXT NOT NULL,
        created_at TEXT NOT NULL,
        PRIMARY KEY (user_id, peer_id),
        FOREIGN KEY (user_id) REFERENCES users(id),
        FOREIGN KEY (peer_id) REFERENCES users(id)
    );

    CREATE TABLE IF NOT EXISTS connection_requests (
        id TEXT PRIMARY KEY,
        sender_id TEXT NOT NULL,
        receiver_id TEXT NOT NULL,
        status TEXT NOT NULL DEFAULT 'pending'
            CHECK (status IN ('pending', 'accepted', 'rejected')),
        created_at TEXT NOT NULL,
        FOREIGN KEY (sender_id) REFERENCES users(id),
        FOREIGN KEY (receiver_id) REFERENCES users(id)
    );

    -- At most one pending request per unordered user pair, either direction.
    CREATE UNIQUE INDEX IF NOT EXISTS idx_requests_pending_pair
        ON connection_requests (MIN(sender_id, receiver_id), MAX(sender_id, receiver_id))
        WHERE status = 'pending';

    CREATE INDEX IF NOT EXISTS idx_requests_receiver
        ON connection_requests(receiver_id, status);

    -- parent_id NULL marks a root post; comments reference their parent.
    -- The cascade covers the whole subtree, not just direct children.
    CREATE TABLE IF NOT EXISTS posts (
        id TEXT PRIMARY KEY,
        author_id TEXT NOT NULL,
        content TEXT NOT NULL,
        image_url TEXT,
        parent_id TEXT,
        created_at TEXT NOT NULL,
        FOREIGN KEY (author_id) REFERENCES users(id),
        FOREIGN KEY (parent_id) REFERENCES posts(id) ON DELETE CASCADE
    );

    CREATE INDEX IF NOT EXISTS idx_posts_parent ON posts(parent_id);
    CREATE INDEX IF NOT EXISTS idx_posts_author ON posts(author_id);

    -- The primary key makes up/down mutually exclusive per voter.
    CREATE TABLE IF NOT EXISTS post_votes (
        post_id TEXT NOT NULL,
        voter_id TEXT NOT NULL,
        vote TEXT NOT NULL CHECK (vote IN ('up', 'down')),
        created_at TEXT NOT NULL,
        PRIMARY KEY (post_id, voter_id),
        FOREIGN KEY (post_id) REFERENCES posts(id) ON DELETE CASCADE,
        FOREIGN KEY (voter_id) REFERENCES users(id)
    );

    CREATE TABLE IF NOT EXISTS notifications (
        id TEXT PRIMARY KEY,
        receiver_id TEXT NOT NULL,
        sender_id TEXT NOT NULL,
        kind TEXT NOT NULL
            CHECK (kind IN ('upvote', 'downvote', 'comment', 'connection_accepted')),
        related_post_id TEXT,
        seen INTEGER NOT NULL DEFAULT 0,
        created_at TEXT NOT NULL,
        FOREIGN KEY (receiver_id) REFERENCES users(id),
        FOREIGN KEY (sender_id) REFERENCES users(id),
        FOREIGN KEY (related_post_id) REFERENCES posts(id) ON DELETE CASCADE
    );

    CREATE INDEX IF NOT EXISTS idx_notifications_receiver
        ON notifications(receiver_id);
"#;

#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    pub fn connect(paths: &RefugePaths) -> Result<Self> {
        if let Some(parent) = paths.db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(&paths.db_path)?;
        Ok(Self::from_connection(conn))
    }

    pub fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
        }
    }

    pub fn ensure_migrations(&self) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute_batch(MIGRATIONS)?;
            Ok(())
        })
    }

    /// Runs `f` against the repository facade while holding the connection
    /// lock. The error type only needs to absorb `anyhow::Error` so services
    /// can surface their own domain errors from inside the closure.
    pub fn with_repositories<T, E, F>(&self, f: F) -> Result<T, E>
    where
        E: From<anyhow::Error>,
        F: FnOnce(repositories::SqliteRepositories<'_>) -> Result<T, E>,
    {
        self.with_conn(|conn| {
            let repos = repositories::SqliteRepositories::new(conn);
            f(repos)
        })
    }

    fn with_conn<T, E, F>(&self, f: F) -> Result<T, E>
    where
        E: From<anyhow::Error>,
        F: FnOnce(&Connection) -> Result<T, E>,
    {
        let guard = self
            .conn
            .lock()
            .map_err(|_| E::from(anyhow!("database mutex poisoned")))?;
        f(&guard)
    }
}
