use rusqlite::{Connection, OptionalExtension, Transaction};
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};

use super::schema_gen::{generate_create_table, generate_indexes, generate_upsert};
use super::value::Entity;
use crate::config::DEFAULT_BATCH_SIZE;
use crate::error::{PipelineError, Result};
use crate::schema::{DependencyResolver, TableSchema};

/// The SQLite database the pipeline loads into
pub struct Store {
    conn: Connection,
    batch_size: usize,
}

impl Store {
    /// Open (or create) the database file and make sure every table exists
    pub fn open(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| PipelineError::io(parent, e))?;
        }

        let conn = Connection::open(db_path)?;

        // Enable foreign keys and optimize for bulk insert
        conn.execute_batch(
            "PRAGMA foreign_keys = ON;
             PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA cache_size = -64000;",
        )?;

        Self::init(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> Result<Self> {
        let store = Self {
            conn,
            batch_size: DEFAULT_BATCH_SIZE,
        };
        store.ensure_schema()?;
        Ok(store)
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Create missing tables and their foreign key indexes
    pub fn ensure_schema(&self) -> Result<()> {
        let tables = DependencyResolver::new()
            .creation_order()
            .map_err(PipelineError::Schema)?;

        for schema in tables {
            self.conn.execute(&generate_create_table(schema), [])?;
            for index_sql in generate_indexes(schema) {
                self.conn.execute(&index_sql, [])?;
            }
        }

        Ok(())
    }

    /// Drop every table, children first, and create them again empty
    pub fn drop_and_recreate(&self) -> Result<()> {
        let tables = DependencyResolver::new()
            .drop_order()
            .map_err(PipelineError::Schema)?;

        warn!("Dropping {} tables", tables.len());
        for schema in tables {
            self.conn
                .execute(&format!("DROP TABLE IF EXISTS {}", schema.name), [])?;
        }

        self.ensure_schema()
    }

    pub fn row_count(&self, table: &str) -> Result<u64> {
        let sql = format!("SELECT COUNT(*) FROM {table}");
        let count: i64 = self.conn.query_row(&sql, [], |row| row.get(0))?;
        Ok(count as u64)
    }

    pub fn has_rows(&self, table: &str) -> Result<bool> {
        let sql = format!("SELECT 1 FROM {table} LIMIT 1");
        let found: Option<i64> = self
            .conn
            .query_row(&sql, [], |row| row.get(0))
            .optional()?;
        Ok(found.is_some())
    }

    /// Start the transaction one mode writes in
    pub fn begin(&mut self) -> Result<ModeWriter<'_>> {
        Ok(ModeWriter {
            tx: self.conn.transaction()?,
            batch_size: self.batch_size,
        })
    }

    /// Let SQLite refresh its query planner statistics
    pub fn optimize(&self) -> Result<()> {
        self.conn.execute_batch("PRAGMA optimize;")?;
        Ok(())
    }
}

/// Writes of a single mode; nothing is visible until `commit`
pub struct ModeWriter<'a> {
    tx: Transaction<'a>,
    batch_size: usize,
}

impl ModeWriter<'_> {
    pub fn connection(&self) -> &Connection {
        &self.tx
    }

    /// Insert or update a batch of rows keyed by the table's primary key
    pub fn persist<E: Entity>(&self, batch: &[E]) -> Result<u64> {
        let schema = E::table();
        if batch.is_empty() {
            debug!("{}: nothing to write", schema.name);
            return Ok(0);
        }

        let sql = generate_upsert(schema);
        let width = schema.column_names().len();
        let mut count: u64 = 0;

        for chunk in batch.chunks(self.batch_size) {
            insert_batch(&self.tx, &sql, width, chunk)?;
            count += chunk.len() as u64;
            debug!("{}: {}/{} rows", schema.name, count, batch.len());
        }

        info!("{}: {} rows", schema.name, count);
        Ok(count)
    }

    /// Delete every row of a table and of the tables referencing it,
    /// children first
    pub fn clear(&self, schema: &TableSchema) -> Result<usize> {
        let resolver = DependencyResolver::new();
        let mut targets = resolver.dependents(schema.name);
        targets.insert(schema.name);

        let mut total = 0;
        for table in resolver.drop_order().map_err(PipelineError::Schema)? {
            if !targets.contains(table.name) {
                continue;
            }
            let deleted = self.tx.execute(&format!("DELETE FROM {}", table.name), [])?;
            if deleted > 0 {
                warn!("Deleted {} rows from {}", deleted, table.name);
            }
            total += deleted;
        }
        Ok(total)
    }

    pub fn commit(self) -> Result<()> {
        self.tx.commit()?;
        Ok(())
    }
}

/// Insert a batch of rows into the database
fn insert_batch<E: Entity>(tx: &Transaction, sql: &str, width: usize, batch: &[E]) -> Result<()> {
    let mut stmt = tx.prepare_cached(sql)?;

    for row in batch {
        let values = row.values();
        debug_assert_eq!(values.len(), width, "{} row width", E::table().name);
        for (idx, value) in values.iter().enumerate().take(width) {
            value.bind_to(idx + 1, &mut stmt)?;
        }
        stmt.raw_execute()?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::tables::{SYSTEM_CONNECTIONS, UNITS};
    use crate::sql_values;
    use crate::writer::SqlValue;

    struct Unit(i64, &'static str);

    impl Entity for Unit {
        fn table() -> &'static TableSchema {
            &UNITS
        }

        fn values(&self) -> Vec<SqlValue> {
            sql_values![self.0, None::<String>, self.1, self.1]
        }
    }

    struct Link(i64, i64);

    impl Entity for Link {
        fn table() -> &'static TableSchema {
            &SYSTEM_CONNECTIONS
        }

        fn values(&self) -> Vec<SqlValue> {
            sql_values![self.0, self.1]
        }
    }

    #[test]
    fn test_persist_upserts() {
        let mut store = Store::open_in_memory().unwrap().with_batch_size(2);
        let writer = store.begin().unwrap();
        writer
            .persist(&[Unit(1, "m"), Unit(2, "kg"), Unit(3, "s")])
            .unwrap();
        writer.persist(&[Unit(2, "t")]).unwrap();
        writer.commit().unwrap();

        assert_eq!(store.row_count("units").unwrap(), 3);
        let name: String = store
            .connection()
            .query_row("SELECT unit_name FROM units WHERE id = 2", [], |r| r.get(0))
            .unwrap();
        assert_eq!(name, "t");
    }

    #[test]
    fn test_key_only_table_ignores_duplicates() {
        let mut store = Store::open_in_memory().unwrap();
        let writer = store.begin().unwrap();
        writer
            .connection()
            .execute_batch(
                "INSERT INTO regions (id) VALUES (1);
                 INSERT INTO constellations (id, region_id) VALUES (2, 1);
                 INSERT INTO solar_systems (id, constellation_id, region_id)
                 VALUES (3, 2, 1), (4, 2, 1);",
            )
            .unwrap();
        writer.persist(&[Link(3, 4), Link(3, 4)]).unwrap();
        writer.commit().unwrap();

        assert_eq!(store.row_count("system_connections").unwrap(), 1);
    }

    #[test]
    fn test_uncommitted_writes_roll_back() {
        let mut store = Store::open_in_memory().unwrap();
        {
            let writer = store.begin().unwrap();
            writer.persist(&[Unit(1, "m")]).unwrap();
        }
        assert!(!store.has_rows("units").unwrap());
    }

    #[test]
    fn test_drop_and_recreate_empties_tables() {
        let mut store = Store::open_in_memory().unwrap();
        let writer = store.begin().unwrap();
        writer.persist(&[Unit(1, "m")]).unwrap();
        writer.commit().unwrap();

        store.drop_and_recreate().unwrap();
        assert_eq!(store.row_count("units").unwrap(), 0);
    }

    #[test]
    fn test_foreign_keys_enforced() {
        let mut store = Store::open_in_memory().unwrap();
        let writer = store.begin().unwrap();
        assert!(writer.persist(&[Link(10, 11)]).is_err());
    }

    #[test]
    fn test_clear_takes_dependent_rows_along() {
        let mut store = Store::open_in_memory().unwrap();
        let writer = store.begin().unwrap();
        writer
            .connection()
            .execute_batch(
                "INSERT INTO units (id) VALUES (1);
                 INSERT INTO regions (id) VALUES (1);
                 INSERT INTO constellations (id, region_id) VALUES (2, 1);
                 INSERT INTO solar_systems (id, constellation_id, region_id)
                 VALUES (3, 2, 1), (4, 2, 1);",
            )
            .unwrap();
        assert_eq!(writer.clear(&crate::schema::REGIONS).unwrap(), 4);
        writer.commit().unwrap();

        assert!(!store.has_rows("solar_systems").unwrap());
        assert_eq!(store.row_count("units").unwrap(), 1);
    }
}
