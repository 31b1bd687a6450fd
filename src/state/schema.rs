/// Column-schema store
///
/// The identity file doubles as a SQLite database, so the column
/// vocabulary travels with the instance it describes. Two tables:
/// `folder_schema` holds the category columns (ordered, unique names)
/// and `annotation_schema` holds the annotation columns (ordered,
/// unique ids with editable labels).

use std::path::{Path, PathBuf};

use rusqlite::{Connection, Result as SqlResult};

use super::data::AnnotationColumn;
use super::StateError;

/// Handle on the schema database inside the identity file.
///
/// Holds only the path: every operation opens its own short-lived
/// connection, so no handle is ever shared across request handlers or
/// kept open between calls.
#[derive(Debug)]
pub struct SchemaStore {
    db_path: PathBuf,
}

impl SchemaStore {
    /// Open the store and make sure both tables exist.
    ///
    /// Anything failing here is fatal: without the schema, the category
    /// and annotation projections are undefined.
    pub fn open(identity_path: &Path) -> Result<Self, StateError> {
        let store = SchemaStore {
            db_path: identity_path.to_path_buf(),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn connect(&self) -> SqlResult<Connection> {
        Connection::open(&self.db_path)
    }

    fn init_schema(&self) -> Result<(), StateError> {
        let conn = self.connect()?;

        // Category columns: ordered slots projected onto folder depth
        conn.execute(
            "CREATE TABLE IF NOT EXISTS folder_schema (
                id      INTEGER PRIMARY KEY AUTOINCREMENT,
                name    TEXT UNIQUE NOT NULL
            )",
            [],
        )?;

        // Annotation columns: stable id plus editable label
        conn.execute(
            "CREATE TABLE IF NOT EXISTS annotation_schema (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                column_id   TEXT UNIQUE NOT NULL,
                label       TEXT NOT NULL
            )",
            [],
        )?;

        Ok(())
    }

    /// Category column names in creation order
    pub fn category_columns(&self) -> Result<Vec<String>, StateError> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare("SELECT name FROM folder_schema ORDER BY id")?;
        let rows = stmt.query_map([], |row| row.get(0))?;

        let mut names = Vec::new();
        for name in rows {
            names.push(name?);
        }
        Ok(names)
    }

    /// Add a category column. Adding a name that already exists is a
    /// silent no-op, not an error.
    pub fn add_category_column(&self, name: &str) -> Result<(), StateError> {
        let conn = self.connect()?;
        conn.execute(
            "INSERT OR IGNORE INTO folder_schema (name) VALUES (?1)",
            [name],
        )?;
        Ok(())
    }

    /// Remove a category column by exact name. No-op if absent.
    pub fn remove_category_column(&self, name: &str) -> Result<(), StateError> {
        let conn = self.connect()?;
        conn.execute("DELETE FROM folder_schema WHERE name = ?1", [name])?;
        Ok(())
    }

    /// Annotation column definitions in creation order
    pub fn annotation_columns(&self) -> Result<Vec<AnnotationColumn>, StateError> {
        let conn = self.connect()?;
        let mut stmt =
            conn.prepare("SELECT column_id, label FROM annotation_schema ORDER BY id")?;
        let rows = stmt.query_map([], |row| {
            Ok(AnnotationColumn {
                id: row.get(0)?,
                label: row.get(1)?,
            })
        })?;

        let mut columns = Vec::new();
        for column in rows {
            columns.push(column?);
        }
        Ok(columns)
    }

    /// Add an annotation column.
    ///
    /// Returns false when the id is already taken, leaving the existing
    /// label untouched. Unlike category columns, the caller needs to
    /// tell a duplicate from a success here. `INSERT OR IGNORE` keeps
    /// the existence check and the insert in one statement, so two
    /// racing adds of the same id still produce exactly one row.
    pub fn add_annotation_column(&self, id: &str, label: &str) -> Result<bool, StateError> {
        let conn = self.connect()?;
        let inserted = conn.execute(
            "INSERT OR IGNORE INTO annotation_schema (column_id, label) VALUES (?1, ?2)",
            [id, label],
        )?;
        Ok(inserted == 1)
    }

    /// Remove an annotation column by id.
    ///
    /// Values already written under this id stay in their sidecars;
    /// they simply stop being projected.
    pub fn remove_annotation_column(&self, id: &str) -> Result<(), StateError> {
        let conn = self.connect()?;
        conn.execute(
            "DELETE FROM annotation_schema WHERE column_id = ?1",
            [id],
        )?;
        Ok(())
    }
}
