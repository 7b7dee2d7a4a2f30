use axum::extract::Query;
use axum::http::Uri;
use serde::Deserialize;

use crate::aggregate::RowErrorPolicy;
use crate::db::Store;
use crate::http::error::ApiError;

#[derive(Debug, Clone)]
pub struct AppState {
    pub store: Store,
    pub on_row_error: RowErrorPolicy,
}

#[derive(Debug, Default)]
pub struct ReadParams {
    pub nim: Option<String>,
}

impl ReadParams {
    /// Reads the first `nim` in the query string; later repeats and other
    /// keys are ignored.
    pub fn from_uri(uri: &Uri) -> Result<Self, ApiError> {
        let Query(pairs) =
            Query::<Vec<(String, String)>>::try_from_uri(uri).map_err(ApiError::BadQuery)?;
        let nim = pairs
            .into_iter()
            .find(|(key, _)| key == "nim")
            .map(|(_, value)| value);
        Ok(Self { nim })
    }

    /// An empty `nim` reads everyone, same as leaving it out.
    pub fn nim(&self) -> Option<&str> {
        self.nim.as_deref().filter(|v| !v.is_empty())
    }
}

/// Body of POST and PATCH.
#[derive(Debug, Clone, Deserialize)]
pub struct EnrollmentWrite {
    pub nim: String,
    pub kode_mk: String,
    pub nilai: i64,
}

/// Body of DELETE.
#[derive(Debug, Clone, Deserialize)]
pub struct EnrollmentKey {
    pub nim: String,
    pub kode_mk: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nim_of(uri: &str) -> Option<String> {
        let uri: Uri = uri.parse().expect("uri");
        ReadParams::from_uri(&uri).expect("read params").nim
    }

    #[test]
    fn first_nim_wins() {
        assert_eq!(nim_of("/nilaiMahasiswa?nim=S1&nim=S2").as_deref(), Some("S1"));
        assert_eq!(nim_of("/nilaiMahasiswa?x=1&nim=S2").as_deref(), Some("S2"));
    }

    #[test]
    fn missing_or_empty_nim_reads_everyone() {
        assert_eq!(ReadParams::default().nim(), None);
        let uri: Uri = "/nilaiMahasiswa?nim=".parse().expect("uri");
        assert_eq!(ReadParams::from_uri(&uri).expect("read params").nim(), None);
        assert_eq!(nim_of("/nilaiMahasiswa"), None);
    }
}
