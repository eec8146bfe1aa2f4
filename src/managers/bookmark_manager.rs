//! Bookmark Manager for Tabshell.
//!
//! Bookmark tree stored in SQLite: folders nest through `parent_id`,
//! bookmarks sit in a folder or at the root. Moves that would put a folder
//! inside its own subtree are rejected and leave the tree untouched.

use std::collections::HashSet;
use std::time::{SystemTime, UNIX_EPOCH};

use rusqlite::{params, Connection, OptionalExtension};
use tracing::debug;
use uuid::Uuid;

use crate::types::bookmark::{Bookmark, BookmarkFolder};
use crate::types::errors::BookmarkError;

/// Trait defining bookmark tree operations.
pub trait BookmarkManagerTrait {
    fn add_bookmark(&mut self, url: &str, title: &str, folder_id: Option<&str>) -> Result<String, BookmarkError>;
    fn remove_bookmark(&mut self, id: &str) -> Result<(), BookmarkError>;
    fn move_bookmark(&mut self, id: &str, folder_id: Option<&str>) -> Result<(), BookmarkError>;
    fn list_bookmarks(&self, folder_id: Option<&str>) -> Result<Vec<Bookmark>, BookmarkError>;
    fn create_folder(&mut self, name: &str, parent_id: Option<&str>) -> Result<String, BookmarkError>;
    fn move_folder(&mut self, id: &str, parent_id: Option<&str>) -> Result<(), BookmarkError>;
    fn list_folders(&self, parent_id: Option<&str>) -> Result<Vec<BookmarkFolder>, BookmarkError>;
    fn get_folder(&self, id: &str) -> Result<BookmarkFolder, BookmarkError>;
    fn delete_folder(&mut self, id: &str) -> Result<(), BookmarkError>;
}

fn db_error(e: rusqlite::Error) -> BookmarkError {
    BookmarkError::DatabaseError(e.to_string())
}

/// Bookmark manager over a borrowed SQLite connection.
pub struct BookmarkManager<'a> {
    conn: &'a Connection,
}

impl<'a> BookmarkManager<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    fn now() -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs() as i64
    }

    /// Next free position among the rows of `table` whose `column` is `parent`.
    fn next_position(&self, table: &str, column: &str, parent: Option<&str>) -> Result<i32, BookmarkError> {
        let sql = match parent {
            Some(_) => format!("SELECT COALESCE(MAX(position), -1) + 1 FROM {table} WHERE {column} = ?1"),
            None => format!("SELECT COALESCE(MAX(position), -1) + 1 FROM {table} WHERE {column} IS NULL"),
        };
        match parent {
            Some(p) => self.conn.query_row(&sql, params![p], |row| row.get(0)),
            None => self.conn.query_row(&sql, [], |row| row.get(0)),
        }
        .map_err(db_error)
    }

    /// `Some(parent)` for an existing folder, `None` when it does not exist.
    fn folder_parent(&self, id: &str) -> Result<Option<Option<String>>, BookmarkError> {
        self.conn
            .query_row(
                "SELECT parent_id FROM bookmark_folders WHERE id = ?1",
                params![id],
                |row| row.get::<_, Option<String>>(0),
            )
            .optional()
            .map_err(db_error)
    }

    fn require_folder(&self, id: &str) -> Result<Option<String>, BookmarkError> {
        self.folder_parent(id)?
            .ok_or_else(|| BookmarkError::FolderNotFound(id.to_string()))
    }

    /// True when `candidate` is `folder` or lies somewhere below it.
    fn is_within(&self, candidate: &str, folder: &str) -> Result<bool, BookmarkError> {
        let mut seen = HashSet::new();
        let mut current = Some(candidate.to_string());
        while let Some(id) = current {
            if id == folder {
                return Ok(true);
            }
            if !seen.insert(id.clone()) {
                break;
            }
            current = self.folder_parent(&id)?.flatten();
        }
        Ok(false)
    }

    fn row_to_bookmark(row: &rusqlite::Row) -> rusqlite::Result<Bookmark> {
        Ok(Bookmark {
            id: row.get(0)?,
            url: row.get(1)?,
            title: row.get(2)?,
            folder_id: row.get(3)?,
            position: row.get(4)?,
            created_at: row.get(5)?,
        })
    }

    fn row_to_folder(row: &rusqlite::Row) -> rusqlite::Result<BookmarkFolder> {
        Ok(BookmarkFolder {
            id: row.get(0)?,
            name: row.get(1)?,
            parent_id: row.get(2)?,
            position: row.get(3)?,
        })
    }
}

impl<'a> BookmarkManagerTrait for BookmarkManager<'a> {
    fn add_bookmark(&mut self, url: &str, title: &str, folder_id: Option<&str>) -> Result<String, BookmarkError> {
        if let Some(fid) = folder_id {
            self.require_folder(fid)?;
        }
        let id = Uuid::new_v4().to_string();
        let position = self.next_position("bookmarks", "folder_id", folder_id)?;
        self.conn
            .execute(
                "INSERT INTO bookmarks (id, url, title, folder_id, position, created_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![id, url, title, folder_id, position, Self::now()],
            )
            .map_err(db_error)?;
        Ok(id)
    }

    fn remove_bookmark(&mut self, id: &str) -> Result<(), BookmarkError> {
        let affected = self
            .conn
            .execute("DELETE FROM bookmarks WHERE id = ?1", params![id])
            .map_err(db_error)?;
        if affected == 0 {
            return Err(BookmarkError::NotFound(id.to_string()));
        }
        Ok(())
    }

    /// Moves a bookmark to the end of `folder_id` (root when `None`).
    fn move_bookmark(&mut self, id: &str, folder_id: Option<&str>) -> Result<(), BookmarkError> {
        if let Some(fid) = folder_id {
            self.require_folder(fid)?;
        }
        let position = self.next_position("bookmarks", "folder_id", folder_id)?;
        let affected = self
            .conn
            .execute(
                "UPDATE bookmarks SET folder_id = ?1, position = ?2 WHERE id = ?3",
                params![folder_id, position, id],
            )
            .map_err(db_error)?;
        if affected == 0 {
            return Err(BookmarkError::NotFound(id.to_string()));
        }
        Ok(())
    }

    fn list_bookmarks(&self, folder_id: Option<&str>) -> Result<Vec<Bookmark>, BookmarkError> {
        let columns = "SELECT id, url, title, folder_id, position, created_at FROM bookmarks";
        let mut stmt = match folder_id {
            Some(_) => self.conn.prepare(&format!("{columns} WHERE folder_id = ?1 ORDER BY position")),
            None => self.conn.prepare(&format!("{columns} WHERE folder_id IS NULL ORDER BY position")),
        }
        .map_err(db_error)?;
        let rows = match folder_id {
            Some(fid) => stmt.query_map(params![fid], Self::row_to_bookmark),
            None => stmt.query_map([], Self::row_to_bookmark),
        }
        .map_err(db_error)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(db_error)
    }

    fn create_folder(&mut self, name: &str, parent_id: Option<&str>) -> Result<String, BookmarkError> {
        if let Some(pid) = parent_id {
            self.require_folder(pid)?;
        }
        let id = Uuid::new_v4().to_string();
        let position = self.next_position("bookmark_folders", "parent_id", parent_id)?;
        self.conn
            .execute(
                "INSERT INTO bookmark_folders (id, name, parent_id, position) VALUES (?1, ?2, ?3, ?4)",
                params![id, name, parent_id, position],
            )
            .map_err(db_error)?;
        Ok(id)
    }

    /// Reparents a folder (to the root when `parent_id` is `None`).
    ///
    /// Fails with `CyclicMove` when `parent_id` is the folder itself or any
    /// of its descendants.
    fn move_folder(&mut self, id: &str, parent_id: Option<&str>) -> Result<(), BookmarkError> {
        self.require_folder(id)?;
        if let Some(target) = parent_id {
            self.require_folder(target)?;
            if self.is_within(target, id)? {
                debug!(folder = id, target, "Rejected folder move into own subtree");
                return Err(BookmarkError::CyclicMove {
                    folder: id.to_string(),
                    target: target.to_string(),
                });
            }
        }
        let position = self.next_position("bookmark_folders", "parent_id", parent_id)?;
        self.conn
            .execute(
                "UPDATE bookmark_folders SET parent_id = ?1, position = ?2 WHERE id = ?3",
                params![parent_id, position, id],
            )
            .map_err(db_error)?;
        Ok(())
    }

    fn list_folders(&self, parent_id: Option<&str>) -> Result<Vec<BookmarkFolder>, BookmarkError> {
        let columns = "SELECT id, name, parent_id, position FROM bookmark_folders";
        let mut stmt = match parent_id {
            Some(_) => self.conn.prepare(&format!("{columns} WHERE parent_id = ?1 ORDER BY position")),
            None => self.conn.prepare(&format!("{columns} WHERE parent_id IS NULL ORDER BY position")),
        }
        .map_err(db_error)?;
        let rows = match parent_id {
            Some(pid) => stmt.query_map(params![pid], Self::row_to_folder),
            None => stmt.query_map([], Self::row_to_folder),
        }
        .map_err(db_error)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(db_error)
    }

    fn get_folder(&self, id: &str) -> Result<BookmarkFolder, BookmarkError> {
        self.conn
            .query_row(
                "SELECT id, name, parent_id, position FROM bookmark_folders WHERE id = ?1",
                params![id],
                Self::row_to_folder,
            )
            .optional()
            .map_err(db_error)?
            .ok_or_else(|| BookmarkError::FolderNotFound(id.to_string()))
    }

    /// Deletes a folder; its bookmarks and child folders move to the root.
    fn delete_folder(&mut self, id: &str) -> Result<(), BookmarkError> {
        self.require_folder(id)?;
        self.conn
            .execute("UPDATE bookmarks SET folder_id = NULL WHERE folder_id = ?1", params![id])
            .map_err(db_error)?;
        self.conn
            .execute(
                "UPDATE bookmark_folders SET parent_id = NULL WHERE parent_id = ?1",
                params![id],
            )
            .map_err(db_error)?;
        self.conn
            .execute("DELETE FROM bookmark_folders WHERE id = ?1", params![id])
            .map_err(db_error)?;
        Ok(())
    }
}
