use crate::auth;
use crate::database::models::UserRecord;
use crate::database::repositories::{ProfilePatch, UserRepository};
use crate::database::Database;
use crate::error::{ServiceError, ServiceResult};
use crate::utils::now_utc_iso;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use uuid::Uuid;

const SUGGESTION_LIMIT: usize = 3;

fn email_regex() -> &'static Regex {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL.get_or_init(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email regex"))
}

#[derive(Clone)]
pub struct AccountService {
    database: Database,
}

impl AccountService {
    pub fn new(database: Database) -> Self {
        Self { database }
    }

    pub fn signup(&self, input: SignupInput) -> ServiceResult<UserView> {
        let name = input.name.trim();
        let username = input.username.trim();
        let email = input.email.trim();
        if name.is_empty() || username.is_empty() || email.is_empty() || input.password.is_empty()
        {
            return Err(ServiceError::validation("all fields are required"));
        }
        if !email_regex().is_match(email) {
            return Err(ServiceError::validation("invalid email format"));
        }

        let password_hash = auth::hash_password(&input.password)?;
        let record = UserRecord {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            username: username.to_string(),
            email: email.to_string(),
            password_hash,
            profile_image_url: None,
            bio: None,
            created_at: now_utc_iso(),
        };

        self.database.with_repositories(|repos| {
            let users = repos.users();
            if users.get_by_username(&record.username)?.is_some() {
                return Err(ServiceError::conflict("username already exists"));
            }
            if users.get_by_email(&record.email)?.is_some() {
                return Err(ServiceError::conflict("email already exists"));
            }
            users.create(&record)?;
            Ok(())
        })?;

        tracing::info!(username = %record.username, "new identity registered");
        Ok(UserView::from_record(record))
    }

    /// Checks a username/password pair. Unknown usernames and wrong
    /// passwords produce the same error so the response does not leak which
    /// accounts exist.
    pub fn verify_credentials(&self, username: &str, password: &str) -> ServiceResult<UserView> {
        let record: Option<UserRecord> = self
            .database
            .with_repositories(|repos| Ok::<_, ServiceError>(repos.users().get_by_username(username)?))?;
        let Some(record) = record else {
            return Err(ServiceError::validation("invalid credentials"));
        };
        if !auth::verify_password(password, &record.password_hash)? {
            return Err(ServiceError::validation("invalid credentials"));
        }
        Ok(UserView::from_record(record))
    }

    pub fn get(&self, user_id: &str) -> ServiceResult<UserView> {
        self.database.with_repositories(|repos| {
            let record = repos
                .users()
                .get(user_id)?
                .ok_or_else(|| ServiceError::not_found("user not found"))?;
            Ok(UserView::from_record(record))
        })
    }

    pub fn update_profile(&self, user_id: &str, patch: ProfilePatch) -> ServiceResult<UserView> {
        self.database.with_repositories(|repos| {
            let users = repos.users();
            if let Some(username) = &patch.username {
                if let Some(existing) = users.get_by_username(username)? {
                    if existing.id != user_id {
                        return Err(ServiceError::conflict("username already exists"));
                    }
                }
            }
            users.update_profile(user_id, &patch)?;
            let record = users
                .get(user_id)?
                .ok_or_else(|| ServiceError::not_found("user not found"))?;
            Ok(UserView::from_record(record))
        })
    }

    pub fn public_profile(&self, username: &str) -> ServiceResult<UserView> {
        self.database.with_repositories(|repos| {
            let record = repos
                .users()
                .get_by_username(username)?
                .ok_or_else(|| ServiceError::not_found("user not found"))?;
            Ok(UserView::from_record(record))
        })
    }

    /// Up to three identities the caller is not yet connected to.
    pub fn suggestions(&self, user_id: &str) -> ServiceResult<Vec<UserSummary>> {
        self.database.with_repositories(|repos| {
            let users = repos.users().suggestions_for(user_id, SUGGESTION_LIMIT)?;
            Ok(users.into_iter().map(UserSummary::from_record).collect())
        })
    }
}

/// Public shape of a user. Never carries the password hash.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserView {
    pub id: String,
    pub name: String,
    pub username: String,
    pub email: String,
    pub profile_image_url: Option<String>,
    pub bio: Option<String>,
    pub created_at: String,
}

impl UserView {
    pub fn from_record(record: UserRecord) -> Self {
        Self {
            id: record.id,
            name: record.name,
            username: record.username,
            email: record.email,
            profile_image_url: record.profile_image_url,
            bio: record.bio,
            created_at: record.created_at,
        }
    }
}

/// Short form used when embedding an author or sender in another payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserSummary {
    pub id: String,
    pub name: String,
    pub username: String,
    pub profile_image_url: Option<String>,
}

impl UserSummary {
    pub fn from_record(record: UserRecord) -> Self {
        Self {
            id: record.id,
            name: record.name,
            username: record.username,
            profile_image_url: record.profile_image_url,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SignupInput {
    pub name: String,
    pub username: String,
    pub email: String,
    pub password: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    fn setup_service() -> AccountService {
        let conn = Connection::open_in_memory().expect("in-memory db");
        let db = Database::from_connection(conn);
        db.ensure_migrations().expect("migrations");
        AccountService::new(db)
    }

    fn signup(service: &AccountService, username: &str) -> UserView {
        service
            .signup(SignupInput {
                name: username.to_uppercase(),
                username: username.into(),
                email: format!("{username}@example.com"),
                password: "hunter2".into(),
            })
            .expect("signup")
    }

    #[test]
    fn signup_then_login() {
        let service = setup_service();
        let created = signup(&service, "alice");

        let verified = service
            .verify_credentials("alice", "hunter2")
            .expect("valid credentials");
        assert_eq!(verified.id, created.id);

        let err = service.verify_credentials("alice", "wrong").unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
        let err = service.verify_credentials("nobody", "hunter2").unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }

    #[test]
    fn signup_rejects_bad_input() {
        let service = setup_service();
        let err = service
            .signup(SignupInput {
                name: "A".into(),
                username: "a".into(),
                email: "not-an-email".into(),
                password: "pw".into(),
            })
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));

        signup(&service, "alice");
        let err = service
            .signup(SignupInput {
                name: "Other".into(),
                username: "alice".into(),
                email: "fresh@example.com".into(),
                password: "pw".into(),
            })
            .unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));
    }

    #[test]
    fn profile_update_is_allow_listed_merge() {
        let service = setup_service();
        let alice = signup(&service, "alice");

        let updated = service
            .update_profile(
                &alice.id,
                ProfilePatch {
                    bio: Some("systems gardener".into()),
                    ..Default::default()
                },
            )
            .expect("update");
        assert_eq!(updated.bio.as_deref(), Some("systems gardener"));
        assert_eq!(updated.name, "ALICE");
        assert_eq!(updated.username, "alice");
    }

    #[test]
    fn profile_update_rejects_taken_username() {
        let service = setup_service();
        let alice = signup(&service, "alice");
        signup(&service, "bob");

        let err = service
            .update_profile(
                &alice.id,
                ProfilePatch {
                    username: Some("bob".into()),
                    ..Default::default()
                },
            )
            .unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));

        // Re-asserting your own username is fine.
        service
            .update_profile(
                &alice.id,
                ProfilePatch {
                    username: Some("alice".into()),
                    ..Default::default()
                },
            )
            .expect("no-op username update");
    }

    #[test]
    fn suggestions_exclude_self() {
        let service = setup_service();
        let alice = signup(&service, "alice");
        signup(&service, "bob");
        signup(&service, "carol");
        signup(&service, "dave");
        signup(&service, "erin");

        let suggested = service.suggestions(&alice.id).expect("suggestions");
        assert_eq!(suggested.len(), 3);
        assert!(suggested.iter().all(|user| user.id != alice.id));
    }
}
