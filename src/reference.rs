// 🗺️ Reference Data Source - Read-only city/township lookup documents
//
// Two documents, fetched as-is and never written:
//   city.json     -> [ {id, name}, ... ]
//   township.json -> { cityId: [ {id, name}, ... ], ... }
//
// A city id missing from township.json yields an empty township list,
// not an error. Transport failures are `ReferenceError`.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

// ============================================================================
// REFERENCE MODELS
// ============================================================================

/// City entry from city.json
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceCity {
    pub id: String,
    pub name: String,
}

/// Township entry, grouped under a parent city id in township.json
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceTownship {
    pub id: String,
    pub name: String,
}

/// The township.json document shape
pub type TownshipMap = HashMap<String, Vec<ReferenceTownship>>;

// ============================================================================
// ERRORS
// ============================================================================

/// Failure to obtain a reference document.
///
/// Lookup misses are NOT represented here: an id absent from an
/// otherwise-loaded document is handled by the caller (empty list,
/// sentinel label), never as a load error.
#[derive(Debug, Clone)]
pub enum ReferenceError {
    /// Transport-level failure (connection refused, file missing, ...)
    Unreachable(String),

    /// The source answered with a non-success status
    Status(u16),

    /// Document retrieved but not parseable as the expected shape
    Malformed(String),
}

impl std::fmt::Display for ReferenceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReferenceError::Unreachable(msg) => {
                write!(f, "reference data unreachable: {}", msg)
            }
            ReferenceError::Status(code) => {
                write!(f, "reference data request failed with status {}", code)
            }
            ReferenceError::Malformed(msg) => {
                write!(f, "reference data malformed: {}", msg)
            }
        }
    }
}

impl std::error::Error for ReferenceError {}

// ============================================================================
// SOURCE TRAIT
// ============================================================================

/// Read-only access to the two reference documents.
///
/// `load_townships` is scoped to one city: implementations fetch the full
/// township document and index into it, so an unknown city id resolves to
/// an empty list.
#[allow(async_fn_in_trait)]
pub trait ReferenceSource {
    async fn load_cities(&self) -> Result<Vec<ReferenceCity>, ReferenceError>;

    async fn load_townships(
        &self,
        city_id: &str,
    ) -> Result<Vec<ReferenceTownship>, ReferenceError>;
}

// ============================================================================
// FILE SOURCE (CLI mode)
// ============================================================================

/// Reads the reference documents from a local directory.
///
/// Re-reads on every call, matching the fetch-per-action behavior of the
/// remote source.
#[derive(Debug, Clone)]
pub struct FileReferenceSource {
    dir: PathBuf,
}

impl FileReferenceSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        FileReferenceSource { dir: dir.into() }
    }

    fn read_document(&self, name: &str) -> Result<String, ReferenceError> {
        let path = self.dir.join(name);
        std::fs::read_to_string(&path)
            .map_err(|e| ReferenceError::Unreachable(format!("{}: {}", path.display(), e)))
    }
}

impl ReferenceSource for FileReferenceSource {
    async fn load_cities(&self) -> Result<Vec<ReferenceCity>, ReferenceError> {
        let raw = self.read_document("city.json")?;
        serde_json::from_str(&raw).map_err(|e| ReferenceError::Malformed(e.to_string()))
    }

    async fn load_townships(
        &self,
        city_id: &str,
    ) -> Result<Vec<ReferenceTownship>, ReferenceError> {
        let raw = self.read_document("township.json")?;
        let map: TownshipMap =
            serde_json::from_str(&raw).map_err(|e| ReferenceError::Malformed(e.to_string()))?;
        Ok(map.get(city_id).cloned().unwrap_or_default())
    }
}

// ============================================================================
// HTTP SOURCE (server mode)
// ============================================================================

/// Fetches the reference documents over HTTP GET.
///
/// The base URL is injected at construction; the documents live at
/// `{base_url}/city.json` and `{base_url}/township.json`.
#[cfg(feature = "server")]
#[derive(Debug, Clone)]
pub struct HttpReferenceSource {
    client: reqwest::Client,
    base_url: String,
}

#[cfg(feature = "server")]
impl HttpReferenceSource {
    pub fn new(base_url: impl Into<String>) -> Self {
        HttpReferenceSource {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }

    async fn fetch(&self, name: &str) -> Result<reqwest::Response, ReferenceError> {
        let url = format!("{}/{}", self.base_url.trim_end_matches('/'), name);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| ReferenceError::Unreachable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(ReferenceError::Status(response.status().as_u16()));
        }
        Ok(response)
    }
}

#[cfg(feature = "server")]
impl ReferenceSource for HttpReferenceSource {
    async fn load_cities(&self) -> Result<Vec<ReferenceCity>, ReferenceError> {
        self.fetch("city.json")
            .await?
            .json()
            .await
            .map_err(|e| ReferenceError::Malformed(e.to_string()))
    }

    async fn load_townships(
        &self,
        city_id: &str,
    ) -> Result<Vec<ReferenceTownship>, ReferenceError> {
        let map: TownshipMap = self
            .fetch("township.json")
            .await?
            .json()
            .await
            .map_err(|e| ReferenceError::Malformed(e.to_string()))?;
        Ok(map.get(city_id).cloned().unwrap_or_default())
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn write_documents(dir: &std::path::Path) {
        std::fs::write(
            dir.join("city.json"),
            r#"[{"id":"TPE","name":"台北市"},{"id":"KHH","name":"高雄市"}]"#,
        )
        .unwrap();
        std::fs::write(
            dir.join("township.json"),
            r#"{"TPE":[{"id":"100","name":"中正區"},{"id":"110","name":"信義區"}]}"#,
        )
        .unwrap();
    }

    #[tokio::test]
    async fn file_source_loads_cities() {
        let dir = std::env::temp_dir().join("locsel-ref-cities");
        std::fs::create_dir_all(&dir).unwrap();
        write_documents(&dir);

        let source = FileReferenceSource::new(&dir);
        let cities = source.load_cities().await.unwrap();

        assert_eq!(cities.len(), 2);
        assert_eq!(cities[0].id, "TPE");
        assert_eq!(cities[0].name, "台北市");
    }

    #[tokio::test]
    async fn file_source_scopes_townships_to_city() {
        let dir = std::env::temp_dir().join("locsel-ref-townships");
        std::fs::create_dir_all(&dir).unwrap();
        write_documents(&dir);

        let source = FileReferenceSource::new(&dir);
        let townships = source.load_townships("TPE").await.unwrap();

        assert_eq!(townships.len(), 2);
        assert_eq!(townships[1].name, "信義區");
    }

    #[tokio::test]
    async fn unknown_city_yields_empty_list_not_error() {
        let dir = std::env::temp_dir().join("locsel-ref-unknown");
        std::fs::create_dir_all(&dir).unwrap();
        write_documents(&dir);

        let source = FileReferenceSource::new(&dir);
        let townships = source.load_townships("KHH").await.unwrap();

        assert!(townships.is_empty());
    }

    #[tokio::test]
    async fn missing_document_is_unreachable() {
        let dir = std::env::temp_dir().join("locsel-ref-missing");
        std::fs::create_dir_all(&dir).unwrap();
        // No documents written.
        let _ = std::fs::remove_file(dir.join("city.json"));

        let source = FileReferenceSource::new(&dir);
        let err = source.load_cities().await.unwrap_err();

        assert!(matches!(err, ReferenceError::Unreachable(_)));
    }

    #[tokio::test]
    async fn malformed_document_is_reported() {
        let dir = std::env::temp_dir().join("locsel-ref-malformed");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("city.json"), "not json").unwrap();

        let source = FileReferenceSource::new(&dir);
        let err = source.load_cities().await.unwrap_err();

        assert!(matches!(err, ReferenceError::Malformed(_)));
    }
}
