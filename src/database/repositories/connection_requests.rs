use crate::database::models::{ConnectionRequestRecord, RequestStatus};
use anyhow::{anyhow, Result};
use rusqlite::{params, Connection, OptionalExtension, Row};

pub(super) struct SqliteConnectionRequestRepository<'conn> {
    pub(super) conn: &'conn Connection,
}

const COLUMNS: &str = "id, sender_id, receiver_id, status, created_at";

struct RawRequest {
    id: String,
    sender_id: String,
    receiver_id: String,
    status: String,
    created_at: String,
}

fn map_row(row: &Row<'_>) -> rusqlite::Result<RawRequest> {
    Ok(RawRequest {
        id: row.get(0)?,
        sender_id: row.get(1)?,
        receiver_id: row.get(2)?,
        status: row.get(3)?,
        created_at: row.get(4)?,
    })
}

fn into_record(raw: RawRequest) -> Result<ConnectionRequestRecord> {
    let status = RequestStatus::parse(&raw.status)
        .ok_or_else(|| anyhow!("unknown request status {:?}", raw.status))?;
    Ok(ConnectionRequestRecord {
        id: raw.id,
        sender_id: raw.sender_id,
        receiver_id: raw.receiver_id,
        status,
        created_at: raw.created_at,
    })
}

impl<'conn> super::ConnectionRequestRepository for SqliteConnectionRequestRepository<'conn> {
    fn create(&self, record: &ConnectionRequestRecord) -> Result<()> {
        self.conn.execute(
            r#"
            INSERT INTO connection_requests (id, sender_id, receiver_id, status, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![
                record.id,
                record.sender_id,
                record.receiver_id,
                record.status.as_str(),
                record.created_at,
            ],
        )?;
        Ok(())
    }

    fn get(&self, id: &str) -> Result<Option<ConnectionRequestRecord>> {
        let raw = self
            .conn
            .query_row(
                &format!("SELECT {COLUMNS} FROM connection_requests WHERE id = ?1"),
                params![id],
                map_row,
            )
            .optional()?;
        raw.map(into_record).transpose()
    }

    fn pending_between(&self, a: &str, b: &str) -> Result<Option<ConnectionRequestRecord>> {
        let raw = self
            .conn
            .query_row(
                &format!(
                    r#"
                    SELECT {COLUMNS} FROM connection_requests
                    WHERE status = 'pending'
                      AND ((sender_id = ?1 AND receiver_id = ?2)
                        OR (sender_id = ?2 AND receiver_id = ?1))
                    "#
                ),
                params![a, b],
                map_row,
            )
            .optional()?;
        raw.map(into_record).transpose()
    }

    fn set_status(&self, id: &str, status: RequestStatus) -> Result<()> {
        self.conn.execute(
            "UPDATE connection_requests SET status = ?2 WHERE id = ?1",
            params![id, status.as_str()],
        )?;
        Ok(())
    }

    fn list_pending_for_receiver(
        &self,
        receiver_id: &str,
    ) -> Result<Vec<ConnectionRequestRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            r#"
            SELECT {COLUMNS} FROM connection_requests
            WHERE receiver_id = ?1 AND status = 'pending'
            ORDER BY datetime(created_at) DESC
            "#
        ))?;
        let rows = stmt.query_map(params![receiver_id], map_row)?;
        let mut requests = Vec::new();
        for row in rows {
            requests.push(into_record(row?)?);
        }
        Ok(requests)
    }
}
