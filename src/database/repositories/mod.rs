mod connection_requests;
mod connections;
mod notifications;
mod posts;
mod users;
mod votes;

use super::models::{
    ConnectionRequestRecord, NotificationKind, NotificationRecord, PostRecord, RequestStatus,
    UserRecord, VoteKind,
};
use anyhow::Result;
use rusqlite::Connection;

pub trait UserRepository {
    fn create(&self, record: &UserRecord) -> Result<()>;
    fn get(&self, id: &str) -> Result<Option<UserRecord>>;
    fn get_by_username(&self, username: &str) -> Result<Option<UserRecord>>;
    fn get_by_email(&self, email: &str) -> Result<Option<UserRecord>>;
    fn update_profile(&self, id: &str, patch: &ProfilePatch) -> Result<()>;
    /// Users that are neither `user_id` nor already connected to it.
    fn suggestions_for(&self, user_id: &str, limit: usize) -> Result<Vec<UserRecord>>;
}

/// Allow-listed profile fields; anything absent is left untouched.
#[derive(Debug, Clone, Default)]
pub struct ProfilePatch {
    pub name: Option<String>,
    pub username: Option<String>,
    pub bio: Option<String>,
    pub profile_image_url: Option<String>,
}

impl ProfilePatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.username.is_none()
            && self.bio.is_none()
            && self.profile_image_url.is_none()
    }
}

pub trait ConnectionRepository {
    /// Adds both adjacency rows in one transaction. Idempotent.
    fn link(&self, a: &str, b: &str, created_at: &str) -> Result<()>;
    /// Removes both adjacency rows. Idempotent, no existence check.
    fn unlink(&self, a: &str, b: &str) -> Result<()>;
    fn are_connected(&self, a: &str, b: &str) -> Result<bool>;
    fn list_for(&self, user_id: &str) -> Result<Vec<String>>;
}

pub trait ConnectionRequestRepository {
    fn create(&self, record: &ConnectionRequestRecord) -> Result<()>;
    fn get(&self, id: &str) -> Result<Option<ConnectionRequestRecord>>;
    /// Pending request between the two users, in either direction.
    fn pending_between(&self, a: &str, b: &str) -> Result<Option<ConnectionRequestRecord>>;
    fn set_status(&self, id: &str, status: RequestStatus) -> Result<()>;
    fn list_pending_for_receiver(&self, receiver_id: &str) -> Result<Vec<ConnectionRequestRecord>>;
}

pub trait PostRepository {
    fn create(&self, record: &PostRecord) -> Result<()>;
    fn get(&self, id: &str) -> Result<Option<PostRecord>>;
    fn list_roots(&self, limit: usize) -> Result<Vec<PostRecord>>;
    fn list_children(&self, parent_id: &str) -> Result<Vec<PostRecord>>;
    fn list_for_author(&self, author_id: &str) -> Result<Vec<PostRecord>>;
    /// Deletes the post; the schema cascades over the whole comment subtree.
    fn delete(&self, id: &str) -> Result<()>;
}

pub trait VoteRepository {
    fn get(&self, post_id: &str, voter_id: &str) -> Result<Option<VoteKind>>;
    fn set(&self, post_id: &str, voter_id: &str, vote: VoteKind, created_at: &str) -> Result<()>;
    fn remove(&self, post_id: &str, voter_id: &str) -> Result<()>;
    fn voters(&self, post_id: &str, vote: VoteKind) -> Result<Vec<String>>;
}

pub trait NotificationRepository {
    fn create(&self, record: &NotificationRecord) -> Result<()>;
    fn exists_open(
        &self,
        kind: NotificationKind,
        sender_id: &str,
        related_post_id: &str,
    ) -> Result<bool>;
    fn delete_matching(
        &self,
        kind: NotificationKind,
        sender_id: &str,
        related_post_id: &str,
    ) -> Result<()>;
    fn list_for_receiver(&self, receiver_id: &str) -> Result<Vec<NotificationRecord>>;
    fn mark_seen(&self, id: &str, receiver_id: &str) -> Result<()>;
    fn delete(&self, id: &str, receiver_id: &str) -> Result<()>;
}

pub struct SqliteRepositories<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteRepositories<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    pub fn users(&self) -> impl UserRepository + '_ {
        users::SqliteUserRepository { conn: self.conn }
    }

    pub fn connections(&self) -> impl ConnectionRepository + '_ {
        connections::SqliteConnectionRepository { conn: self.conn }
    }

    pub fn connection_requests(&self) -> impl ConnectionRequestRepository + '_ {
        connection_requests::SqliteConnectionRequestRepository { conn: self.conn }
    }

    pub fn posts(&self) -> impl PostRepository + '_ {
        posts::SqlitePostRepository { conn: self.conn }
    }

    pub fn votes(&self) -> impl VoteRepository + '_ {
        votes::SqliteVoteRepository { conn: self.conn }
    }

    pub fn notifications(&self) -> impl NotificationRepository + '_ {
        notifications::SqliteNotificationRepository { conn: self.conn }
    }

    pub fn conn(&self) -> &'conn Connection {
        self.conn
    }
}
