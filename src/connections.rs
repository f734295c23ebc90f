//! The connection-request state machine: pending requests transition once
//! to accepted or rejected, and acceptance makes the adjacency mutual.

use crate::accounts::UserSummary;
use crate::database::models::{
    ConnectionRequestRecord, NotificationKind, NotificationRecord, RequestStatus,
};
use crate::database::repositories::{
    ConnectionRepository, ConnectionRequestRepository, NotificationRepository, UserRepository,
};
use crate::database::Database;
use crate::error::{ServiceError, ServiceResult};
use crate::utils::now_utc_iso;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone)]
pub struct ConnectionService {
    database: Database,
}

impl ConnectionService {
    pub fn new(database: Database) -> Self {
        Self { database }
    }

    pub fn send_request(&self, sender_id: &str, receiver_id: &str) -> ServiceResult<()> {
        if sender_id == receiver_id {
            return Err(ServiceError::validation(
                "you cannot send a connection request to yourself",
            ));
        }

        self.database.with_repositories(|repos| {
            if repos.users().get(receiver_id)?.is_none() {
                return Err(ServiceError::not_found("user not found"));
            }
            if repos.connections().are_connected(sender_id, receiver_id)? {
                return Err(ServiceError::conflict(
                    "you already have a connection with this user",
                ));
            }
            if repos
                .connection_requests()
                .pending_between(sender_id, receiver_id)?
                .is_some()
            {
                return Err(ServiceError::conflict(
                    "a pending connection request already exists with this user",
                ));
            }

            let record = ConnectionRequestRecord {
                id: Uuid::new_v4().to_string(),
                sender_id: sender_id.to_string(),
                receiver_id: receiver_id.to_string(),
                status: RequestStatus::Pending,
                created_at: now_utc_iso(),
            };
            // The partial unique index backs up the pre-check, so a racing
            // duplicate lands here instead of creating a second pending row.
            repos.connection_requests().create(&record).map_err(|err| {
                if is_constraint_violation(&err) {
                    ServiceError::conflict(
                        "a pending connection request already exists with this user",
                    )
                } else {
                    ServiceError::Internal(err)
                }
            })?;
            Ok(())
        })
    }

    pub fn accept_request(&self, request_id: &str, acting_id: &str) -> ServiceResult<()> {
        self.database.with_repositories(|repos| {
            let request = self.load_pending(&repos, request_id, acting_id, "accept")?;

            repos
                .connection_requests()
                .set_status(request_id, RequestStatus::Accepted)?;
            repos
                .connections()
                .link(&request.sender_id, &request.receiver_id, &now_utc_iso())?;
            repos.notifications().create(&NotificationRecord {
                id: Uuid::new_v4().to_string(),
                receiver_id: request.sender_id.clone(),
                sender_id: acting_id.to_string(),
                kind: NotificationKind::ConnectionAccepted,
                related_post_id: None,
                seen: false,
                created_at: now_utc_iso(),
            })?;

            tracing::info!(
                request_id = %request_id,
                sender = %request.sender_id,
                receiver = %request.receiver_id,
                "connection request accepted"
            );
            Ok(())
        })
    }

    pub fn reject_request(&self, request_id: &str, acting_id: &str) -> ServiceResult<()> {
        self.database.with_repositories(|repos| {
            self.load_pending(&repos, request_id, acting_id, "reject")?;
            repos
                .connection_requests()
                .set_status(request_id, RequestStatus::Rejected)?;
            Ok(())
        })
    }

    /// Removes both directions of the adjacency. Idempotent: removing a
    /// connection that does not exist is a successful no-op.
    pub fn remove_connection(&self, a_id: &str, b_id: &str) -> ServiceResult<()> {
        self.database
            .with_repositories(|repos| Ok::<_, ServiceError>(repos.connections().unlink(a_id, b_id)?))
    }

    pub fn status(&self, my_id: &str, other_id: &str) -> ServiceResult<ConnectionStatus> {
        self.database.with_repositories(|repos| {
            if repos.connections().are_connected(my_id, other_id)? {
                return Ok(ConnectionStatus::connected());
            }
            if let Some(request) = repos
                .connection_requests()
                .pending_between(my_id, other_id)?
            {
                if request.sender_id == my_id {
                    return Ok(ConnectionStatus::pending());
                }
                return Ok(ConnectionStatus::received(request.id));
            }
            Ok(ConnectionStatus::not_connected())
        })
    }

    /// Pending requests addressed to the caller, sender-populated, newest
    /// first.
    pub fn list_incoming(&self, receiver_id: &str) -> ServiceResult<Vec<RequestView>> {
        self.database.with_repositories(|repos| {
            let requests = repos
                .connection_requests()
                .list_pending_for_receiver(receiver_id)?;
            let mut views = Vec::with_capacity(requests.len());
            for request in requests {
                let sender = repos
                    .users()
                    .get(&request.sender_id)?
                    .ok_or_else(|| ServiceError::not_found("request sender no longer exists"))?;
                views.push(RequestView {
                    id: request.id,
                    sender: UserSummary::from_record(sender),
                    created_at: request.created_at,
                });
            }
            Ok(views)
        })
    }

    pub fn list_connections(&self, user_id: &str) -> ServiceResult<Vec<UserSummary>> {
        self.database.with_repositories(|repos| {
            let peer_ids = repos.connections().list_for(user_id)?;
            let mut peers = Vec::with_capacity(peer_ids.len());
            for peer_id in peer_ids {
                if let Some(record) = repos.users().get(&peer_id)? {
                    peers.push(UserSummary::from_record(record));
                }
            }
            Ok(peers)
        })
    }

    fn load_pending(
        &self,
        repos: &crate::database::repositories::SqliteRepositories<'_>,
        request_id: &str,
        acting_id: &str,
        action: &str,
    ) -> ServiceResult<ConnectionRequestRecord> {
        let request = repos
            .connection_requests()
            .get(request_id)?
            .ok_or_else(|| ServiceError::not_found("connection request not found"))?;
        if request.receiver_id != acting_id {
            return Err(ServiceError::forbidden(format!(
                "you are not authorized to {action} this connection request"
            )));
        }
        if request.status != RequestStatus::Pending {
            return Err(ServiceError::validation(
                "connection request is not pending",
            ));
        }
        Ok(request)
    }
}

fn is_constraint_violation(err: &anyhow::Error) -> bool {
    matches!(
        err.downcast_ref::<rusqlite::Error>(),
        Some(rusqlite::Error::SqliteFailure(inner, _))
            if inner.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionStatus {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

impl ConnectionStatus {
    fn connected() -> Self {
        Self {
            status: "connected".into(),
            request_id: None,
        }
    }

    fn pending() -> Self {
        Self {
            status: "pending".into(),
            request_id: None,
        }
    }

    fn received(request_id: String) -> Self {
        Self {
            status: "received".into(),
            request_id: Some(request_id),
        }
    }

    fn not_connected() -> Self {
        Self {
            status: "not_connected".into(),
            request_id: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestView {
    pub id: String,
    pub sender: UserSummary,
    pub created_at: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accounts::{AccountService, SignupInput, UserView};
    use crate::database::repositories::NotificationRepository;
    use rusqlite::Connection;

    fn setup() -> (Database, ConnectionService, AccountService) {
        let conn = Connection::open_in_memory().expect("in-memory db");
        let db = Database::from_connection(conn);
        db.ensure_migrations().expect("migrations");
        (
            db.clone(),
            ConnectionService::new(db.clone()),
            AccountService::new(db),
        )
    }

    fn signup(accounts: &AccountService, username: &str) -> UserView {
        accounts
            .signup(SignupInput {
                name: username.to_uppercase(),
                username: username.into(),
                email: format!("{username}@example.com"),
                password: "hunter2".into(),
            })
            .expect("signup")
    }

    #[test]
    fn request_accept_makes_connection_mutual_and_notifies_sender() {
        let (db, service, accounts) = setup();
        let alice = signup(&accounts, "alice");
        let bob = signup(&accounts, "bob");

        service.send_request(&alice.id, &bob.id).expect("send");

        let status = service.status(&bob.id, &alice.id).expect("status");
        assert_eq!(status.status, "received");
        let request_id = status.request_id.expect("request id");

        service.accept_request(&request_id, &bob.id).expect("accept");

        assert_eq!(service.status(&alice.id, &bob.id).unwrap().status, "connected");
        assert_eq!(service.status(&bob.id, &alice.id).unwrap().status, "connected");

        let notifications: Vec<_> = db
            .with_repositories(|repos| {
                Ok::<_, ServiceError>(repos.notifications().list_for_receiver(&alice.id)?)
            })
            .unwrap();
        assert_eq!(notifications.len(), 1);
        assert_eq!(notifications[0].kind, NotificationKind::ConnectionAccepted);
        assert_eq!(notifications[0].sender_id, bob.id);
    }

    #[test]
    fn self_and_duplicate_requests_are_rejected() {
        let (_db, service, accounts) = setup();
        let alice = signup(&accounts, "alice");
        let bob = signup(&accounts, "bob");

        let err = service.send_request(&alice.id, &alice.id).unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));

        service.send_request(&alice.id, &bob.id).expect("send");
        let err = service.send_request(&alice.id, &bob.id).unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));
        // Also blocked in the reverse direction.
        let err = service.send_request(&bob.id, &alice.id).unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));
    }

    #[test]
    fn request_to_existing_connection_is_rejected() {
        let (_db, service, accounts) = setup();
        let alice = signup(&accounts, "alice");
        let bob = signup(&accounts, "bob");

        service.send_request(&alice.id, &bob.id).expect("send");
        let request_id = service
            .status(&bob.id, &alice.id)
            .unwrap()
            .request_id
            .unwrap();
        service.accept_request(&request_id, &bob.id).expect("accept");

        let err = service.send_request(&alice.id, &bob.id).unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));
    }

    #[test]
    fn accept_guards_actor_and_state() {
        let (_db, service, accounts) = setup();
        let alice = signup(&accounts, "alice");
        let bob = signup(&accounts, "bob");
        let carol = signup(&accounts, "carol");

        service.send_request(&alice.id, &bob.id).expect("send");
        let request_id = service
            .status(&bob.id, &alice.id)
            .unwrap()
            .request_id
            .unwrap();

        let err = service.accept_request(&request_id, &carol.id).unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden(_)));
        let err = service.accept_request("missing", &bob.id).unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));

        service.accept_request(&request_id, &bob.id).expect("accept");
        // Terminal states are immutable.
        let err = service.accept_request(&request_id, &bob.id).unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }

    #[test]
    fn reject_leaves_no_connection_and_no_notification() {
        let (db, service, accounts) = setup();
        let alice = signup(&accounts, "alice");
        let bob = signup(&accounts, "bob");

        service.send_request(&alice.id, &bob.id).expect("send");
        let request_id = service
            .status(&bob.id, &alice.id)
            .unwrap()
            .request_id
            .unwrap();
        service.reject_request(&request_id, &bob.id).expect("reject");

        assert_eq!(service.status(&alice.id, &bob.id).unwrap().status, "not_connected");
        let notifications: Vec<_> = db
            .with_repositories(|repos| {
                Ok::<_, ServiceError>(repos.notifications().list_for_receiver(&alice.id)?)
            })
            .unwrap();
        assert!(notifications.is_empty());
    }

    #[test]
    fn remove_connection_is_idempotent() {
        let (_db, service, accounts) = setup();
        let alice = signup(&accounts, "alice");
        let bob = signup(&accounts, "bob");

        service.send_request(&alice.id, &bob.id).expect("send");
        let request_id = service
            .status(&bob.id, &alice.id)
            .unwrap()
            .request_id
            .unwrap();
        service.accept_request(&request_id, &bob.id).expect("accept");

        service.remove_connection(&alice.id, &bob.id).expect("remove");
        service.remove_connection(&alice.id, &bob.id).expect("remove again");
        assert_eq!(service.status(&alice.id, &bob.id).unwrap().status, "not_connected");
        assert!(service.list_connections(&bob.id).unwrap().is_empty());
    }

    #[test]
    fn incoming_requests_are_sender_populated() {
        let (_db, service, accounts) = setup();
        let alice = signup(&accounts, "alice");
        let bob = signup(&accounts, "bob");
        let carol = signup(&accounts, "carol");

        service.send_request(&alice.id, &carol.id).expect("send");
        service.send_request(&bob.id, &carol.id).expect("send");

        let incoming = service.list_incoming(&carol.id).expect("incoming");
        assert_eq!(incoming.len(), 2);
        let senders: Vec<_> = incoming.iter().map(|r| r.sender.username.as_str()).collect();
        assert!(senders.contains(&"alice"));
        assert!(senders.contains(&"bob"));
    }
}
