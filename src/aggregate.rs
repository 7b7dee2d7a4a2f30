use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// One row of the student x enrollment x course join.
#[derive(Debug, Clone, PartialEq)]
pub struct GradeRow {
    pub nim: String,
    pub nama: String,
    pub alamat: String,
    pub tanggal_lahir: String,
    pub kode_mk: String,
    pub nama_mk: String,
    pub sks: i64,
    pub nilai: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentDetails {
    pub nama: String,
    pub alamat: String,
    pub tanggal_lahir: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradeEntry {
    pub kode_mk: String,
    pub nama_mk: String,
    pub sks: i64,
    pub nilai: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentRecord {
    pub details: StudentDetails,
    #[serde(rename = "grade")]
    pub grades: Vec<GradeEntry>,
}

/// Grade view keyed by nim.
pub type StudentGrades = BTreeMap<String, StudentRecord>;

/// What the aggregator does when a row cannot be decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum RowErrorPolicy {
    /// Stop at the bad row and keep what was grouped before it.
    #[default]
    Partial,
    /// Discard everything and report the failure.
    Fail,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowFault {
    /// A column could not be read as the expected type.
    Decode(String),
    /// The cursor itself failed.
    Store(String),
    /// The store stayed locked past the busy timeout, or the call was interrupted.
    Busy(String),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AggregateError {
    #[error("row {index} could not be decoded: {reason}")]
    Decode { index: usize, reason: String },
    #[error("row cursor failed at row {index}: {reason}")]
    Store { index: usize, reason: String },
    #[error("store busy at row {index}: {reason}")]
    Busy { index: usize, reason: String },
}

/// Result of one aggregation pass.
#[derive(Debug, Default)]
pub struct Aggregation {
    pub students: StudentGrades,
    pub rows_read: usize,
    /// Set when a decode failure cut the pass short under `RowErrorPolicy::Partial`.
    pub truncated: Option<AggregateError>,
}

/// Groups flat join rows by nim in one pass.
///
/// The first row of a nim fixes its `details`; every row, the first included,
/// appends one grade entry. Entries keep delivery order.
pub fn aggregate<I>(rows: I, policy: RowErrorPolicy) -> Result<Aggregation, AggregateError>
where
    I: IntoIterator<Item = Result<GradeRow, RowFault>>,
{
    let mut out = Aggregation::default();

    for (index, row) in rows.into_iter().enumerate() {
        let row = match row {
            Ok(v) => v,
            Err(RowFault::Store(reason)) => {
                return Err(AggregateError::Store { index, reason });
            }
            Err(RowFault::Busy(reason)) => {
                return Err(AggregateError::Busy { index, reason });
            }
            Err(RowFault::Decode(reason)) => {
                let e = AggregateError::Decode { index, reason };
                match policy {
                    RowErrorPolicy::Partial => {
                        out.truncated = Some(e);
                        break;
                    }
                    RowErrorPolicy::Fail => return Err(e),
                }
            }
        };

        let record = out
            .students
            .entry(row.nim)
            .or_insert_with(|| StudentRecord {
                details: StudentDetails {
                    nama: row.nama,
                    alamat: row.alamat,
                    tanggal_lahir: row.tanggal_lahir,
                },
                grades: Vec::new(),
            });
        record.grades.push(GradeEntry {
            kode_mk: row.kode_mk,
            nama_mk: row.nama_mk,
            sks: row.sks,
            nilai: row.nilai,
        });
        out.rows_read += 1;
    }

    Ok(out)
}
