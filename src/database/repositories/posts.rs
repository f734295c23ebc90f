use crate::database::models::PostRecord;
use anyhow::Result;
use rusqlite::{params, Connection, OptionalExtension, Row};

pub(super) struct SqlitePostRepository<'conn> {
    pub(super) conn: &'conn Connection,
}

const COLUMNS: &str = "id, author_id, content, image_url, parent_id, created_at";

fn map_row(row: &Row<'_>) -> rusqlite::Result<PostRecord> {
    Ok(PostRecord {
        id: row.get(0)?,
        author_id: row.get(1)?,
        content: row.get(2)?,
        image_url: row.get(3)?,
        parent_id: row.get(4)?,
        created_at: row.get(5)?,
    })
}

impl<'conn> super::PostRepository for SqlitePostRepository<'conn> {
    fn create(&self, record: &PostRecord) -> Result<()> {
        self.conn.execute(
            r#"
            INSERT INTO posts (id, author_id, content, image_url, parent_id, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                record.id,
                record.author_id,
                record.content,
                record.image_url,
                record.parent_id,
                record.created_at,
            ],
        )?;
        Ok(())
    }

    fn get(&self, id: &str) -> Result<Option<PostRecord>> {
        Ok(self
            .conn
            .query_row(
                &format!("SELECT {COLUMNS} FROM posts WHERE id = ?1"),
                params![id],
                map_row,
            )
            .optional()?)
    }

    fn list_roots(&self, limit: usize) -> Result<Vec<PostRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            r#"
            SELECT {COLUMNS} FROM posts
            WHERE parent_id IS NULL
            ORDER BY datetime(created_at) DESC
            LIMIT ?1
            "#
        ))?;
        let rows = stmt.query_map(params![limit], map_row)?;
        let mut posts = Vec::new();
        for row in rows {
            posts.push(row?);
        }
        Ok(posts)
    }

    fn list_children(&self, parent_id: &str) -> Result<Vec<PostRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            r#"
            SELECT {COLUMNS} FROM posts
            WHERE parent_id = ?1
            ORDER BY datetime(created_at) DESC
            "#
        ))?;
        let rows = stmt.query_map(params![parent_id], map_row)?;
        let mut posts = Vec::new();
        for row in rows {
            posts.push(row?);
        }
        Ok(posts)
    }

    fn list_for_author(&self, author_id: &str) -> Result<Vec<PostRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            r#"
            SELECT {COLUMNS} FROM posts
            WHERE author_id = ?1
            ORDER BY datetime(created_at) DESC
            "#
        ))?;
        let rows = stmt.query_map(params![author_id], map_row)?;
        let mut posts = Vec::new();
        for row in rows {
            posts.push(row?);
        }
        Ok(posts)
    }

    fn delete(&self, id: &str) -> Result<()> {
        self.conn.execute("DELETE FROM posts WHERE id = ?1", params![id])?;
        Ok(())
    }
}
