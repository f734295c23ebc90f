//! Reading and managing the notification inbox. Emission lives with the
//! actions that cause it (votes, comments, accepted connection requests);
//! this service only lists and mutates what those actions produced.

use crate::accounts::UserSummary;
use crate::database::models::{NotificationKind, NotificationRecord};
use crate::database::repositories::{NotificationRepository, PostRepository, UserRepository};
use crate::database::Database;
use crate::error::{ServiceError, ServiceResult};
use serde::{Deserialize, Serialize};

#[derive(Clone)]
pub struct NotificationService {
    database: Database,
}

impl NotificationService {
    pub fn new(database: Database) -> Self {
        Self { database }
    }

    /// The receiver's inbox, newest first, with senders and related posts
    /// resolved.
    pub fn list(&self, receiver_id: &str) -> ServiceResult<Vec<NotificationView>> {
        self.database.with_repositories(|repos| {
            let records = repos.notifications().list_for_receiver(receiver_id)?;
            let mut views = Vec::with_capacity(records.len());
            for record in records {
                let sender = repos
                    .users()
                    .get(&record.sender_id)?
                    .ok_or_else(|| ServiceError::not_found("notification sender no longer exists"))?;
                let related_post = match &record.related_post_id {
                    // The schema drops notifications with their post, so a
                    // present id always resolves.
                    Some(post_id) => repos.posts().get(post_id)?.map(|post| RelatedPost {
                        id: post.id,
                        content: post.content,
                    }),
                    None => None,
                };
                views.push(NotificationView {
                    id: record.id,
                    kind: record.kind,
                    sender: UserSummary::from_record(sender),
                    related_post,
                    seen: record.seen,
                    created_at: record.created_at,
                });
            }
            Ok(views)
        })
    }

    /// Marks one notification seen. Scoped to the receiver; acting on
    /// someone else's notification silently does nothing.
    pub fn mark_seen(&self, notification_id: &str, receiver_id: &str) -> ServiceResult<()> {
        self.database.with_repositories(|repos| {
            Ok::<_, ServiceError>(repos.notifications().mark_seen(notification_id, receiver_id)?)
        })
    }

    /// Deletes one notification, receiver-scoped and idempotent.
    pub fn delete(&self, notification_id: &str, receiver_id: &str) -> ServiceResult<()> {
        self.database.with_repositories(|repos| {
            Ok::<_, ServiceError>(repos.notifications().delete(notification_id, receiver_id)?)
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationView {
    pub id: String,
    pub kind: NotificationKind,
    pub sender: UserSummary,
    pub related_post: Option<RelatedPost>,
    pub seen: bool,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelatedPost {
    pub id: String,
    pub content: String,
}
