//! The tri-state vote ledger. A voter's relationship to a post is exactly
//! one of upvoted, downvoted, or neutral; repeating an action toggles it
//! back off. Each toggle runs in a single transaction together with its
//! notification side effect.

use crate::database::models::{NotificationKind, NotificationRecord, VoteKind};
use crate::database::repositories::{NotificationRepository, PostRepository, VoteRepository};
use crate::database::Database;
use crate::error::{ServiceError, ServiceResult};
use crate::utils::now_utc_iso;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone)]
pub struct VoteService {
    database: Database,
}

impl VoteService {
    pub fn new(database: Database) -> Self {
        Self { database }
    }

    pub fn toggle(
        &self,
        post_id: &str,
        voter_id: &str,
        action: VoteKind,
    ) -> ServiceResult<VoteOutcome> {
        self.database.with_repositories(|repos| {
            let tx = repos
                .conn()
                .unchecked_transaction()
                .map_err(anyhow::Error::from)?;

            let post = repos
                .posts()
                .get(post_id)?
                .ok_or_else(|| ServiceError::not_found("post not found"))?;

            let current = repos.votes().get(post_id, voter_id)?;
            let resulting = if current == Some(action) {
                repos.votes().remove(post_id, voter_id)?;
                VoteState::Neutral
            } else {
                repos.votes().set(post_id, voter_id, action, &now_utc_iso())?;
                VoteState::from(action)
            };

            // Side effects never target the voter's own post.
            if post.author_id != voter_id {
                match resulting {
                    VoteState::Neutral => {
                        repos.notifications().delete_matching(
                            NotificationKind::from(action),
                            voter_id,
                            post_id,
                        )?;
                    }
                    VoteState::Up | VoteState::Down => {
                        let kind = NotificationKind::from(action);
                        if !repos.notifications().exists_open(kind, voter_id, post_id)? {
                            repos.notifications().create(&NotificationRecord {
                                id: Uuid::new_v4().to_string(),
                                receiver_id: post.author_id.clone(),
                                sender_id: voter_id.to_string(),
                                kind,
                                related_post_id: Some(post_id.to_string()),
                                seen: false,
                                created_at: now_utc_iso(),
                            })?;
                        }
                    }
                }
            }

            let up_votes = repos.votes().voters(post_id, VoteKind::Up)?;
            let down_votes = repos.votes().voters(post_id, VoteKind::Down)?;
            tx.commit().map_err(anyhow::Error::from)?;

            Ok(VoteOutcome {
                status: resulting,
                up_votes,
                down_votes,
            })
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoteState {
    Up,
    Down,
    Neutral,
}

impl From<VoteKind> for VoteState {
    fn from(kind: VoteKind) -> Self {
        match kind {
            VoteKind::Up => Self::Up,
            VoteKind::Down => Self::Down,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoteOutcome {
    pub status: VoteState,
    pub up_votes: Vec<String>,
    pub down_votes: Vec<String>,
}
