//! # nilaid
//!
//! HTTP service over student grades (nilai mahasiswa) kept in SQLite.
//!
//! One endpoint, `/nilaiMahasiswa`, dispatched by method:
//!
//! - `GET [?nim=<id>]` joins mahasiswa, perkuliahan and matakuliah and groups
//!   the rows per student as `{nim: {details, grade: [...]}}`.
//! - `POST {nim, kode_mk, nilai}` inserts an enrollment grade.
//! - `PATCH {nim, kode_mk, nilai}` updates one.
//! - `DELETE {nim, kode_mk}` removes one.
//!
//! Every store call binds its values positionally and opens its own
//! connection, which is released when the call returns.

pub mod aggregate;
pub mod config;
pub mod db;
pub mod http;
pub mod logging;
