use rusqlite::{Connection, ErrorCode, InterruptHandle, Params, Row, Rows};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::aggregate::{GradeRow, RowFault};

pub const GRADES_ALL_SQL: &str = "SELECT mahasiswa.nim, nama, alamat, tanggal_lahir,
        matakuliah.kode_mk, nama_mk, sks, nilai
   FROM mahasiswa
   JOIN perkuliahan ON perkuliahan.nim = mahasiswa.nim
   JOIN matakuliah ON matakuliah.kode_mk = perkuliahan.kode_mk";

pub const GRADES_ONE_SQL: &str = "SELECT mahasiswa.nim, nama, alamat, tanggal_lahir,
        matakuliah.kode_mk, nama_mk, sks, nilai
   FROM mahasiswa
   JOIN perkuliahan ON perkuliahan.nim = mahasiswa.nim
   JOIN matakuliah ON matakuliah.kode_mk = perkuliahan.kode_mk
  WHERE mahasiswa.nim = ?";

pub const INSERT_GRADE_SQL: &str =
    "INSERT INTO perkuliahan (nim, kode_mk, nilai) VALUES (?, ?, ?)";
pub const UPDATE_GRADE_SQL: &str = "UPDATE perkuliahan SET nilai = ? WHERE kode_mk = ? AND nim = ?";
pub const DELETE_GRADE_SQL: &str = "DELETE FROM perkuliahan WHERE kode_mk = ? AND nim = ?";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store call exceeded {0:?}")]
    Timeout(Duration),
    #[error(transparent)]
    Failed(#[from] anyhow::Error),
}

/// Handle to the grades database.
///
/// Holds no connection. Every `execute`/`query` opens its own connection and
/// drops it before returning, so a `Store` is cheap to clone into each request.
#[derive(Debug, Clone)]
pub struct Store {
    path: PathBuf,
    timeout: Duration,
}

impl Store {
    pub fn new(path: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            path: path.into(),
            timeout,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn open(&self) -> anyhow::Result<Connection> {
        let conn = Connection::open(&self.path)?;
        conn.execute("PRAGMA foreign_keys = ON", [])?;
        conn.busy_timeout(self.timeout)?;
        Ok(conn)
    }

    /// Runs one mutating statement with positional parameters and returns the
    /// number of affected rows.
    pub async fn execute<P>(&self, sql: &'static str, params: P) -> Result<usize, StoreError>
    where
        P: Params + Send + 'static,
    {
        self.with_connection(move |conn| Ok(conn.execute(sql, params)?))
            .await
    }

    /// Runs a read statement and hands its row cursor to `consume`.
    ///
    /// `consume` pulls rows lazily; the statement and its connection live only
    /// for the duration of the call.
    pub async fn query<P, T, F>(
        &self,
        sql: &'static str,
        params: P,
        consume: F,
    ) -> Result<T, StoreError>
    where
        P: Params + Send + 'static,
        T: Send + 'static,
        F: FnOnce(&mut Rows<'_>) -> T + Send + 'static,
    {
        self.with_connection(move |conn| {
            let mut stmt = conn.prepare(sql)?;
            let mut rows = stmt.query(params)?;
            Ok(consume(&mut rows))
        })
        .await
    }

    /// Outer bound on a call. Longer than SQLite's busy timeout so lock
    /// contention surfaces as `SQLITE_BUSY` before this fires.
    fn call_bound(&self) -> Duration {
        self.timeout + self.timeout / 2 + Duration::from_millis(50)
    }

    async fn with_connection<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> anyhow::Result<T> + Send + 'static,
    {
        let (handle_tx, handle_rx) = tokio::sync::oneshot::channel();
        let store = self.clone();
        let task = tokio::task::spawn_blocking(move || {
            let conn = store.open()?;
            let _ = handle_tx.send(conn.get_interrupt_handle());
            f(&conn)
        });

        let mut interrupt = InterruptOnDrop(None);
        let bounded = tokio::time::timeout(self.call_bound(), async {
            if let Ok(handle) = handle_rx.await {
                interrupt.0 = Some(handle);
            }
            task.await
        })
        .await;

        match bounded {
            Ok(Ok(out)) => {
                interrupt.disarm();
                out.map_err(|e| self.classify(e))
            }
            Ok(Err(join)) => {
                interrupt.disarm();
                Err(StoreError::Failed(anyhow::anyhow!("store task failed: {join}")))
            }
            Err(_) => Err(StoreError::Timeout(self.timeout)),
        }
    }

    fn classify(&self, err: anyhow::Error) -> StoreError {
        match err.downcast_ref::<rusqlite::Error>() {
            Some(e) if is_lock_timeout(e) => StoreError::Timeout(self.timeout),
            _ => StoreError::Failed(err),
        }
    }
}

/// Busy, locked and interrupted statements all mean the call ran out of time.
pub fn is_lock_timeout(err: &rusqlite::Error) -> bool {
    matches!(
        err.sqlite_error_code(),
        Some(ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked | ErrorCode::OperationInterrupted)
    )
}

/// Interrupts the in-flight statement unless disarmed.
///
/// Dropping the request future before the blocking call finishes (timeout or
/// client disconnect) aborts the statement so the connection gets released.
struct InterruptOnDrop(Option<InterruptHandle>);

impl InterruptOnDrop {
    fn disarm(&mut self) {
        self.0 = None;
    }
}

impl Drop for InterruptOnDrop {
    fn drop(&mut self) {
        if let Some(handle) = self.0.take() {
            handle.interrupt();
        }
    }
}

impl GradeRow {
    pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            nim: row.get(0)?,
            nama: row.get(1)?,
            alamat: row.get(2)?,
            tanggal_lahir: row.get(3)?,
            kode_mk: row.get(4)?,
            nama_mk: row.get(5)?,
            sks: row.get(6)?,
            nilai: row.get(7)?,
        })
    }
}

/// Cursor over the grade join, yielding one decoded row per step.
///
/// Decode failures (bad column values) and cursor failures (the store itself)
/// come out as different `RowFault`s.
pub struct GradeRows<'a, 'stmt> {
    rows: &'a mut Rows<'stmt>,
}

pub fn grade_rows<'a, 'stmt>(rows: &'a mut Rows<'stmt>) -> GradeRows<'a, 'stmt> {
    GradeRows { rows }
}

impl Iterator for GradeRows<'_, '_> {
    type Item = Result<GradeRow, RowFault>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.rows.next() {
            Ok(Some(row)) => {
                Some(GradeRow::from_row(row).map_err(|e| RowFault::Decode(e.to_string())))
            }
            Ok(None) => None,
            Err(e) if is_lock_timeout(&e) => Some(Err(RowFault::Busy(e.to_string()))),
            Err(e) => Some(Err(RowFault::Store(e.to_string()))),
        }
    }
}

pub fn ensure_schema(conn: &Connection) -> anyhow::Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS mahasiswa(
            nim TEXT PRIMARY KEY,
            nama TEXT NOT NULL,
            alamat TEXT NOT NULL,
            tanggal_lahir TEXT NOT NULL
        )",
        [],
    )?;
    conn.execute(
        "CREATE TABLE IF NOT EXISTS matakuliah(
            kode_mk TEXT PRIMARY KEY,
            nama_mk TEXT NOT NULL,
            sks INTEGER NOT NULL
        )",
        [],
    )?;
    // nilai stays nullable: rows written outside this service may lack a grade.
    conn.execute(
        "CREATE TABLE IF NOT EXISTS perkuliahan(
            nim TEXT NOT NULL,
            kode_mk TEXT NOT NULL,
            nilai INTEGER,
            PRIMARY KEY(nim, kode_mk),
            FOREIGN KEY(nim) REFERENCES mahasiswa(nim),
            FOREIGN KEY(kode_mk) REFERENCES matakuliah(kode_mk)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_perkuliahan_kode_mk ON perkuliahan(kode_mk)",
        [],
    )?;
    Ok(())
}
