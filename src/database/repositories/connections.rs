use anyhow::Result;
use rusqlite::{params, Connection};

pub(super) struct SqliteConnectionRepository<'conn> {
    pub(super) conn: &'conn Connection,
}

impl<'conn> super::ConnectionRepository for SqliteConnectionRepository<'conn> {
    fn link(&self, a: &str, b: &str, created_at: &str) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        {
            let mut stmt = tx.prepare(
                r#"
                INSERT OR IGNORE INTO connections (user_id, peer_id, created_at)
                VALUES (?1, ?2, ?3)
                "#,
            )?;
            stmt.execute(params![a, b, created_at])?;
            stmt.execute(params![b, a, created_at])?;
        }
        tx.commit()?;
        Ok(())
    }

    fn unlink(&self, a: &str, b: &str) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            r#"
            DELETE FROM connections
            WHERE (user_id = ?1 AND peer_id = ?2) OR (user_id = ?2 AND peer_id = ?1)
            "#,
            params![a, b],
        )?;
        tx.commit()?;
        Ok(())
    }

    fn are_connected(&self, a: &str, b: &str) -> Result<bool> {
        let count: i64 = self.conn.query_row(
            r#"
            SELECT COUNT(*) FROM connections
            WHERE user_id = ?1 AND peer_id = ?2
            "#,
            params![a, b],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    fn list_for(&self, user_id: &str) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT peer_id FROM connections
            WHERE user_id = ?1
            ORDER BY datetime(created_at) DESC
            "#,
        )?;
        let rows = stmt.query_map(params![user_id], |row| row.get::<_, String>(0))?;
        let mut peers = Vec::new();
        for row in rows {
            peers.push(row?);
        }
        Ok(peers)
    }
}
