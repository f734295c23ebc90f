use crate::database::models::VoteKind;
use anyhow::{anyhow, Result};
use rusqlite::{params, Connection, OptionalExtension};

pub(super) struct SqliteVoteRepository<'conn> {
    pub(super) conn: &'conn Connection,
}

impl<'conn> super::VoteRepository for SqliteVoteRepository<'conn> {
    fn get(&self, post_id: &str, voter_id: &str) -> Result<Option<VoteKind>> {
        let raw: Option<String> = self
            .conn
            .query_row(
                "SELECT vote FROM post_votes WHERE post_id = ?1 AND voter_id = ?2",
                params![post_id, voter_id],
                |row| row.get(0),
            )
            .optional()?;
        raw.map(|value| {
            VoteKind::parse(&value).ok_or_else(|| anyhow!("unknown vote kind {value:?}"))
        })
        .transpose()
    }

    fn set(&self, post_id: &str, voter_id: &str, vote: VoteKind, created_at: &str) -> Result<()> {
        self.conn.execute(
            r#"
            INSERT INTO post_votes (post_id, voter_id, vote, created_at)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(post_id, voter_id) DO UPDATE SET
                vote = excluded.vote,
                created_at = excluded.created_at
            "#,
            params![post_id, voter_id, vote.as_str(), created_at],
        )?;
        Ok(())
    }

    fn remove(&self, post_id: &str, voter_id: &str) -> Result<()> {
        self.conn.execute(
            "DELETE FROM post_votes WHERE post_id = ?1 AND voter_id = ?2",
            params![post_id, voter_id],
        )?;
        Ok(())
    }

    fn voters(&self, post_id: &str, vote: VoteKind) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT voter_id FROM post_votes
            WHERE post_id = ?1 AND vote = ?2
            ORDER BY datetime(created_at) ASC
            "#,
        )?;
        let rows = stmt.query_map(params![post_id, vote.as_str()], |row| {
            row.get::<_, String>(0)
        })?;
        let mut voters = Vec::new();
        for row in rows {
            voters.push(row?);
        }
        Ok(voters)
    }
}
