use anyhow::Result;
use rusqlite::Connection;

use crate::Database;
use crate::models::{MessageRow, UserRow};

const MESSAGE_COLUMNS: &str = "m.id, m.user_id, u.username, m.text, m.created_at,
     (SELECT COUNT(*) FROM likes l WHERE l.message_id = m.id)";

impl Database {
    // -- Users --

    pub fn create_user(
        &self,
        id: &str,
        username: &str,
        email: &str,
        password_hash: &str,
        image_url: Option<&str>,
    ) -> Result<()> {
        self.with_conn(|conn| {
            match image_url {
                Some(url) => conn.execute(
                    "INSERT INTO users (id, username, email, password, image_url)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                    (id, username, email, password_hash, url),
                )?,
                None => conn.execute(
                    "INSERT INTO users (id, username, email, password)
                     VALUES (?1, ?2, ?3, ?4)",
                    (id, username, email, password_hash),
                )?,
            };
            Ok(())
        })
    }

    pub fn get_user_by_username(&self, username: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "username", username))
    }

    pub fn get_user_by_id(&self, id: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "id", id))
    }

    pub fn update_user(
        &self,
        id: &str,
        username: &str,
        email: &str,
        image_url: &str,
        header_image_url: &str,
        bio: Option<&str>,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE users
                 SET username = ?2, email = ?3, image_url = ?4,
                     header_image_url = ?5, bio = ?6
                 WHERE id = ?1",
                rusqlite::params![id, username, email, image_url, header_image_url, bio],
            )?;
            Ok(())
        })
    }

    // -- Messages --

    pub fn insert_message(&self, id: &str, user_id: &str, text: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO messages (id, user_id, text) VALUES (?1, ?2, ?3)",
                (id, user_id, text),
            )?;
            Ok(())
        })
    }

    pub fn get_message(&self, id: &str) -> Result<Option<MessageRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {MESSAGE_COLUMNS}
                 FROM messages m
                 JOIN users u ON m.user_id = u.id
                 WHERE m.id = ?1"
            );
            let mut stmt = conn.prepare(&sql)?;
            let row = stmt.query_row([id], message_from_row).optional()?;
            Ok(row)
        })
    }

    /// Delete by id; returns whether a row was actually removed. Likes on
    /// the message go with it, in the same transaction.
    pub fn delete_message(&self, id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let tx = conn.unchecked_transaction()?;
            tx.execute("DELETE FROM likes WHERE message_id = ?1", [id])?;
            let affected = tx.execute("DELETE FROM messages WHERE id = ?1", [id])?;
            tx.commit()?;
            Ok(affected > 0)
        })
    }

    pub fn count_messages(&self) -> Result<u64> {
        self.with_conn(|conn| {
            let count: u64 =
                conn.query_row("SELECT COUNT(*) FROM messages", [], |row| row.get(0))?;
            Ok(count)
        })
    }

    pub fn recent_messages(&self, limit: u32) -> Result<Vec<MessageRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {MESSAGE_COLUMNS}
                 FROM messages m
                 JOIN users u ON m.user_id = u.id
                 ORDER BY m.created_at DESC, m.id
                 LIMIT ?1"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([limit], message_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn messages_for_user(&self, user_id: &str) -> Result<Vec<MessageRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {MESSAGE_COLUMNS}
                 FROM messages m
                 JOIN users u ON m.user_id = u.id
                 WHERE m.user_id = ?1
                 ORDER BY m.created_at DESC, m.id"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([user_id], message_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    // -- Likes --

    /// Toggle a like: removes if present, inserts if not.
    /// Returns true when the like was added, false when removed.
    pub fn toggle_like(&self, id: &str, message_id: &str, user_id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let existing: Option<String> = conn
                .query_row(
                    "SELECT id FROM likes WHERE message_id = ?1 AND user_id = ?2",
                    (message_id, user_id),
                    |row| row.get(0),
                )
                .optional()?;

            if let Some(existing_id) = existing {
                conn.execute("DELETE FROM likes WHERE id = ?1", [&existing_id])?;
                Ok(false)
            } else {
                conn.execute(
                    "INSERT INTO likes (id, message_id, user_id) VALUES (?1, ?2, ?3)",
                    (id, message_id, user_id),
                )?;
                Ok(true)
            }
        })
    }

    // -- Sessions --

    pub fn create_session(&self, id: &str, user_id: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO sessions (id, user_id) VALUES (?1, ?2)",
                (id, user_id),
            )?;
            Ok(())
        })
    }

    /// Resolve a session id to its user, if the session is live and the
    /// user still exists.
    pub fn get_session_user(&self, session_id: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT u.id, u.username, u.email, u.password, u.image_url,
                        u.header_image_url, u.bio, u.created_at
                 FROM sessions s
                 JOIN users u ON s.user_id = u.id
                 WHERE s.id = ?1",
            )?;
            let row = stmt.query_row([session_id], user_from_row).optional()?;
            Ok(row)
        })
    }

    pub fn delete_session(&self, id: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute("DELETE FROM sessions WHERE id = ?1", [id])?;
            Ok(())
        })
    }
}

/// True when an insert or update failed on a UNIQUE constraint — used to
/// turn a duplicate username into a form error instead of a 500.
pub fn is_unique_violation(err: &anyhow::Error) -> bool {
    matches!(
        err.downcast_ref::<rusqlite::Error>(),
        Some(rusqlite::Error::SqliteFailure(e, _))
            if e.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

fn user_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: row.get(0)?,
        username: row.get(1)?,
        email: row.get(2)?,
        password: row.get(3)?,
        image_url: row.get(4)?,
        header_image_url: row.get(5)?,
        bio: row.get(6)?,
        created_at: row.get(7)?,
    })
}

fn message_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<MessageRow> {
    Ok(MessageRow {
        id: row.get(0)?,
        user_id: row.get(1)?,
        username: row.get(2)?,
        text: row.get(3)?,
        created_at: row.get(4)?,
        like_count: row.get(5)?,
    })
}

fn query_user(conn: &Connection, column: &str, value: &str) -> Result<Option<UserRow>> {
    // `column` is a fixed identifier supplied by this module, never user input.
    let sql = format!(
        "SELECT id, username, email, password, image_url, header_image_url, bio, created_at
         FROM users WHERE {column} = ?1"
    );
    let mut stmt = conn.prepare(&sql)?;
    let row = stmt.query_row([value], user_from_row).optional()?;
    Ok(row)
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn db_with_user(username: &str) -> (Database, String) {
        let db = Database::open_in_memory().unwrap();
        let id = Uuid::new_v4().to_string();
        db.create_user(&id, username, "test@test.com", "$argon2id$stub", None)
            .unwrap();
        (db, id)
    }

    #[test]
    fn create_and_find_user_by_username() {
        let (db, id) = db_with_user("testuser");

        let user = db.get_user_by_username("testuser").unwrap().unwrap();
        assert_eq!(user.id, id);
        assert_eq!(user.email, "test@test.com");
        assert_eq!(user.image_url, "/static/images/default-pic.png");
        assert!(db.get_user_by_username("nobody").unwrap().is_none());
    }

    #[test]
    fn duplicate_username_is_a_unique_violation() {
        let (db, _) = db_with_user("testuser");
        let err = db
            .create_user(
                &Uuid::new_v4().to_string(),
                "testuser",
                "other@test.com",
                "$argon2id$stub",
                None,
            )
            .unwrap_err();
        assert!(is_unique_violation(&err));
    }

    #[test]
    fn message_crud_and_count() {
        let (db, user_id) = db_with_user("testuser");
        let message_id = Uuid::new_v4().to_string();

        db.insert_message(&message_id, &user_id, "test_message").unwrap();
        assert_eq!(db.count_messages().unwrap(), 1);

        let message = db.get_message(&message_id).unwrap().unwrap();
        assert_eq!(message.text, "test_message");
        assert_eq!(message.username, "testuser");
        assert_eq!(message.like_count, 0);

        assert!(db.delete_message(&message_id).unwrap());
        assert_eq!(db.count_messages().unwrap(), 0);
        assert!(db.get_message(&message_id).unwrap().is_none());

        // Deleting again reports that nothing was removed.
        assert!(!db.delete_message(&message_id).unwrap());
    }

    #[test]
    fn messages_for_user_excludes_other_owners() {
        let (db, alice) = db_with_user("alice");
        let bob = Uuid::new_v4().to_string();
        db.create_user(&bob, "bob", "bob@test.com", "$argon2id$stub", None)
            .unwrap();

        db.insert_message(&Uuid::new_v4().to_string(), &alice, "from alice").unwrap();
        db.insert_message(&Uuid::new_v4().to_string(), &bob, "from bob").unwrap();

        let messages = db.messages_for_user(&alice).unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].text, "from alice");

        assert_eq!(db.recent_messages(20).unwrap().len(), 2);
    }

    #[test]
    fn like_toggle_flips_state() {
        let (db, user_id) = db_with_user("testuser");
        let message_id = Uuid::new_v4().to_string();
        db.insert_message(&message_id, &user_id, "test_message").unwrap();

        assert!(db.toggle_like(&Uuid::new_v4().to_string(), &message_id, &user_id).unwrap());
        assert_eq!(db.get_message(&message_id).unwrap().unwrap().like_count, 1);

        assert!(!db.toggle_like(&Uuid::new_v4().to_string(), &message_id, &user_id).unwrap());
        assert_eq!(db.get_message(&message_id).unwrap().unwrap().like_count, 0);
    }

    #[test]
    fn deleting_a_message_removes_its_likes() {
        let (db, user_id) = db_with_user("testuser");
        let message_id = Uuid::new_v4().to_string();
        db.insert_message(&message_id, &user_id, "test_message").unwrap();
        db.toggle_like(&Uuid::new_v4().to_string(), &message_id, &user_id).unwrap();

        assert!(db.delete_message(&message_id).unwrap());
        assert_eq!(db.count_messages().unwrap(), 0);

        // The like rows went with the message: a fresh message reusing the
        // same id starts at zero.
        db.insert_message(&message_id, &user_id, "reposted").unwrap();
        assert_eq!(db.get_message(&message_id).unwrap().unwrap().like_count, 0);
    }

    #[test]
    fn session_resolves_to_user_until_deleted() {
        let (db, user_id) = db_with_user("testuser");
        let session_id = Uuid::new_v4().to_string();

        db.create_session(&session_id, &user_id).unwrap();
        let user = db.get_session_user(&session_id).unwrap().unwrap();
        assert_eq!(user.id, user_id);

        db.delete_session(&session_id).unwrap();
        assert!(db.get_session_user(&session_id).unwrap().is_none());
    }

    #[test]
    fn update_user_profile_fields() {
        let (db, id) = db_with_user("testuser");
        db.update_user(
            &id,
            "renamed",
            "new@test.com",
            "/img.png",
            "/header.png",
            Some("A short bio"),
        )
        .unwrap();

        let user = db.get_user_by_id(&id).unwrap().unwrap();
        assert_eq!(user.username, "renamed");
        assert_eq!(user.bio.as_deref(), Some("A short bio"));
        assert!(db.get_user_by_username("testuser").unwrap().is_none());
    }
}
