//! The post/comment tree. Posts and comments share one table; a comment is
//! a post whose `parent_id` points at another post.

use crate::accounts::UserSummary;
use crate::database::models::{
    NotificationKind, NotificationRecord, PostRecord, VoteKind,
};
use crate::database::repositories::{
    NotificationRepository, PostRepository, SqliteRepositories, UserRepository, VoteRepository,
};
use crate::database::Database;
use crate::error::{ServiceError, ServiceResult};
use crate::utils::now_utc_iso;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

const DEFAULT_FEED_LIMIT: usize = 50;
const MAX_FEED_LIMIT: usize = 200;

#[derive(Clone)]
pub struct PostService {
    database: Database,
}

impl PostService {
    pub fn new(database: Database) -> Self {
        Self { database }
    }

    pub fn create_post(&self, input: CreatePostInput) -> ServiceResult<PostView> {
        if input.content.trim().is_empty() {
            return Err(ServiceError::validation("post content may not be empty"));
        }
        let record = PostRecord {
            id: Uuid::new_v4().to_string(),
            author_id: input.author_id.clone(),
            content: input.content,
            image_url: input.image_url,
            parent_id: None,
            created_at: now_utc_iso(),
        };
        self.database.with_repositories(|repos| {
            repos.posts().create(&record)?;
            populate(&repos, record)
        })
    }

    /// Creates a comment under `parent_id` and notifies the parent's author
    /// unless they are commenting on their own post.
    pub fn create_comment(
        &self,
        parent_id: &str,
        input: CreatePostInput,
    ) -> ServiceResult<PostView> {
        if input.content.trim().is_empty() {
            return Err(ServiceError::validation("comment content may not be empty"));
        }
        self.database.with_repositories(|repos| {
            let parent = repos
                .posts()
                .get(parent_id)?
                .ok_or_else(|| ServiceError::not_found("post not found"))?;

            let record = PostRecord {
                id: Uuid::new_v4().to_string(),
                author_id: input.author_id.clone(),
                content: input.content,
                image_url: input.image_url,
                parent_id: Some(parent.id.clone()),
                created_at: now_utc_iso(),
            };
            repos.posts().create(&record)?;

            // Every comment notifies; only self-comments are exempt.
            if parent.author_id != record.author_id {
                repos.notifications().create(&NotificationRecord {
                    id: Uuid::new_v4().to_string(),
                    receiver_id: parent.author_id.clone(),
                    sender_id: record.author_id.clone(),
                    kind: NotificationKind::Comment,
                    related_post_id: Some(parent.id.clone()),
                    seen: false,
                    created_at: now_utc_iso(),
                })?;
            }

            populate(&repos, record)
        })
    }

    /// Root posts only, author-populated, newest first.
    pub fn feed(&self, limit: Option<usize>) -> ServiceResult<Vec<PostView>> {
        let limit = limit.unwrap_or(DEFAULT_FEED_LIMIT).min(MAX_FEED_LIMIT);
        self.database.with_repositories(|repos| {
            let records = repos.posts().list_roots(limit)?;
            let mut views = Vec::with_capacity(records.len());
            for record in records {
                views.push(populate(&repos, record)?);
            }
            Ok(views)
        })
    }

    pub fn get_post(&self, post_id: &str) -> ServiceResult<PostDetails> {
        self.database.with_repositories(|repos| {
            let record = repos
                .posts()
                .get(post_id)?
                .ok_or_else(|| ServiceError::not_found("post not found"))?;
            let post = populate(&repos, record)?;
            let comments = children(&repos, post_id)?;
            Ok(PostDetails { post, comments })
        })
    }

    pub fn list_comments(&self, post_id: &str) -> ServiceResult<Vec<PostView>> {
        self.database.with_repositories(|repos| {
            if repos.posts().get(post_id)?.is_none() {
                return Err(ServiceError::not_found("post not found"));
            }
            children(&repos, post_id)
        })
    }

    pub fn list_for_author(&self, author_id: &str) -> ServiceResult<Vec<PostView>> {
        self.database.with_repositories(|repos| {
            let records = repos.posts().list_for_author(author_id)?;
            let mut views = Vec::with_capacity(records.len());
            for record in records {
                views.push(populate(&repos, record)?);
            }
            Ok(views)
        })
    }

    /// Only the author may delete; the whole comment subtree goes with the
    /// post.
    pub fn delete_post(&self, post_id: &str, acting_id: &str) -> ServiceResult<()> {
        self.database.with_repositories(|repos| {
            let record = repos
                .posts()
                .get(post_id)?
                .ok_or_else(|| ServiceError::not_found("post not found"))?;
            if record.author_id != acting_id {
                return Err(ServiceError::forbidden("not authorized"));
            }
            repos.posts().delete(post_id)?;
            tracing::info!(post_id = %post_id, author = %acting_id, "post deleted");
            Ok(())
        })
    }
}

fn populate(repos: &SqliteRepositories<'_>, record: PostRecord) -> ServiceResult<PostView> {
    let author = repos
        .users()
        .get(&record.author_id)?
        .ok_or_else(|| ServiceError::not_found("post author no longer exists"))?;
    let up_votes = repos.votes().voters(&record.id, VoteKind::Up)?;
    let down_votes = repos.votes().voters(&record.id, VoteKind::Down)?;
    Ok(PostView {
        id: record.id,
        author: UserSummary::from_record(author),
        content: record.content,
        image_url: record.image_url,
        parent_id: record.parent_id,
        up_votes,
        down_votes,
        created_at: record.created_at,
    })
}

fn children(repos: &SqliteRepositories<'_>, parent_id: &str) -> ServiceResult<Vec<PostView>> {
    let records = repos.posts().list_children(parent_id)?;
    let mut views = Vec::with_capacity(records.len());
    for record in records {
        views.push(populate(repos, record)?);
    }
    Ok(views)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostView {
    pub id: String,
    pub author: UserSummary,
    pub content: String,
    pub image_url: Option<String>,
    pub parent_id: Option<String>,
    pub up_votes: Vec<String>,
    pub down_votes: Vec<String>,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostDetails {
    pub post: PostView,
    pub comments: Vec<PostView>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreatePostInput {
    #[serde(skip)]
    pub author_id: String,
    pub content: String,
    #[serde(default)]
    pub image_url: Option<String>,
}
