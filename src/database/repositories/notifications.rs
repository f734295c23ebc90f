use crate::database::models::{NotificationKind, NotificationRecord};
use anyhow::{anyhow, Result};
use rusqlite::{params, Connection, Row};

pub(super) struct SqliteNotificationRepository<'conn> {
    pub(super) conn: &'conn Connection,
}

const COLUMNS: &str = "id, receiver_id, sender_id, kind, related_post_id, seen, created_at";

struct RawNotification {
    id: String,
    receiver_id: String,
    sender_id: String,
    kind: String,
    related_post_id: Option<String>,
    seen: bool,
    created_at: String,
}

fn map_row(row: &Row<'_>) -> rusqlite::Result<RawNotification> {
    Ok(RawNotification {
        id: row.get(0)?,
        receiver_id: row.get(1)?,
        sender_id: row.get(2)?,
        kind: row.get(3)?,
        related_post_id: row.get(4)?,
        seen: row.get(5)?,
        created_at: row.get(6)?,
    })
}

fn into_record(raw: RawNotification) -> Result<NotificationRecord> {
    let kind = NotificationKind::parse(&raw.kind)
        .ok_or_else(|| anyhow!("unknown notification kind {:?}", raw.kind))?;
    Ok(NotificationRecord {
        id: raw.id,
        receiver_id: raw.receiver_id,
        sender_id: raw.sender_id,
        kind,
        related_post_id: raw.related_post_id,
        seen: raw.seen,
        created_at: raw.created_at,
    })
}

impl<'conn> super::NotificationRepository for SqliteNotificationRepository<'conn> {
    fn create(&self, record: &NotificationRecord) -> Result<()> {
        self.conn.execute(
            r#"
            INSERT INTO notifications (id, receiver_id, sender_id, kind, related_post_id, seen, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                record.id,
                record.receiver_id,
                record.sender_id,
                record.kind.as_str(),
                record.related_post_id,
                record.seen,
                record.created_at,
            ],
        )?;
        Ok(())
    }

    fn exists_open(
        &self,
        kind: NotificationKind,
        sender_id: &str,
        related_post_id: &str,
    ) -> Result<bool> {
        let count: i64 = self.conn.query_row(
            r#"
            SELECT COUNT(*) FROM notifications
            WHERE kind = ?1 AND sender_id = ?2 AND related_post_id = ?3
            "#,
            params![kind.as_str(), sender_id, related_post_id],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    fn delete_matching(
        &self,
        kind: NotificationKind,
        sender_id: &str,
        related_post_id: &str,
    ) -> Result<()> {
        self.conn.execute(
            r#"
            DELETE FROM notifications
            WHERE kind = ?1 AND sender_id = ?2 AND related_post_id = ?3
            "#,
            params![kind.as_str(), sender_id, related_post_id],
        )?;
        Ok(())
    }

    fn list_for_receiver(&self, receiver_id: &str) -> Result<Vec<NotificationRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            r#"
            SELECT {COLUMNS} FROM notifications
            WHERE receiver_id = ?1
            ORDER BY datetime(created_at) DESC
            "#
        ))?;
        let rows = stmt.query_map(params![receiver_id], map_row)?;
        let mut notifications = Vec::new();
        for row in rows {
            notifications.push(into_record(row?)?);
        }
        Ok(notifications)
    }

    fn mark_seen(&self, id: &str, receiver_id: &str) -> Result<()> {
        self.conn.execute(
            "UPDATE notifications SET seen = 1 WHERE id = ?1 AND receiver_id = ?2",
            params![id, receiver_id],
        )?;
        Ok(())
    }

    fn delete(&self, id: &str, receiver_id: &str) -> Result<()> {
        self.conn.execute(
            "DELETE FROM notifications WHERE id = ?1 AND receiver_id = ?2",
            params![id, receiver_id],
        )?;
        Ok(())
    }
}
