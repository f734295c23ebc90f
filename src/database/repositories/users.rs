use crate::database::models::UserRecord;
use anyhow::Result;
use rusqlite::{params, Connection, OptionalExtension, Row};

pub(super) struct SqliteUserRepository<'conn> {
    pub(super) conn: &'conn Connection,
}

const COLUMNS: &str =
    "id, name, username, email, password_hash, profile_image_url, bio, created_at";

fn map_row(row: &Row<'_>) -> rusqlite::Result<UserRecord> {
    Ok(UserRecord {
        id: row.get(0)?,
        name: row.get(1)?,
        username: row.get(2)?,
        email: row.get(3)?,
        password_hash: row.get(4)?,
        profile_image_url: row.get(5)?,
        bio: row.get(6)?,
        created_at: row.get(7)?,
    })
}

impl<'conn> super::UserRepository for SqliteUserRepository<'conn> {
    fn create(&self, record: &UserRecord) -> Result<()> {
        self.conn.execute(
            r#"
            INSERT INTO users (id, name, username, email, password_hash, profile_image_url, bio, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
            params![
                record.id,
                record.name,
                record.username,
                record.email,
                record.password_hash,
                record.profile_image_url,
                record.bio,
                record.created_at,
            ],
        )?;
        Ok(())
    }

    fn get(&self, id: &str) -> Result<Option<UserRecord>> {
        Ok(self
            .conn
            .query_row(
                &format!("SELECT {COLUMNS} FROM users WHERE id = ?1"),
                params![id],
                map_row,
            )
            .optional()?)
    }

    fn get_by_username(&self, username: &str) -> Result<Option<UserRecord>> {
        Ok(self
            .conn
            .query_row(
                &format!("SELECT {COLUMNS} FROM users WHERE username = ?1"),
                params![username],
                map_row,
            )
            .optional()?)
    }

    fn get_by_email(&self, email: &str) -> Result<Option<UserRecord>> {
        Ok(self
            .conn
            .query_row(
                &format!("SELECT {COLUMNS} FROM users WHERE email = ?1"),
                params![email],
                map_row,
            )
            .optional()?)
    }

    fn update_profile(&self, id: &str, patch: &super::ProfilePatch) -> Result<()> {
        self.conn.execute(
            r#"
            UPDATE users SET
                name = COALESCE(?2, name),
                username = COALESCE(?3, username),
                bio = COALESCE(?4, bio),
                profile_image_url = COALESCE(?5, profile_image_url)
            WHERE id = ?1
            "#,
            params![
                id,
                patch.name,
                patch.username,
                patch.bio,
                patch.profile_image_url,
            ],
        )?;
        Ok(())
    }

    fn suggestions_for(&self, user_id: &str, limit: usize) -> Result<Vec<UserRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            r#"
            SELECT {COLUMNS}
            FROM users
            WHERE id != ?1
              AND id NOT IN (SELECT peer_id FROM connections WHERE user_id = ?1)
            LIMIT ?2
            "#
        ))?;
        let rows = stmt.query_map(params![user_id, limit], map_row)?;
        let mut users = Vec::new();
        for row in rows {
            users.push(row?);
        }
        Ok(users)
    }
}
