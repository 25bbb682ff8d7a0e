// 🧱 Record Materializer - Resolve id pair into denormalized fields
//
// Names are resolved against the reference documents at write time and
// frozen into the record; reads never re-resolve. A lookup miss is not a
// failure: the record is stamped with a placeholder label and persisted
// anyway (the reference documents are an external, possibly-stale
// dependency and must not block a save).

use crate::reference::{ReferenceError, ReferenceSource};
use serde::{Deserialize, Serialize};

/// Placeholder stamped when a city id is absent from city.json
pub const UNKNOWN_CITY: &str = "未知縣市";

/// Placeholder stamped when a township id is absent from the city's list
pub const UNKNOWN_TOWNSHIP: &str = "未知鄉鎮";

// ============================================================================
// PAYLOAD
// ============================================================================

/// Denormalized record fields, ready for the store.
///
/// The store assigns identity and timestamps on top of this.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationPayload {
    pub city_id: String,
    pub city_name: String,
    pub township_id: String,
    pub township_name: String,
    pub full_address: String,
}

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug)]
pub enum MaterializeError {
    /// A required id was empty; nothing was looked up or written.
    Validation(String),

    /// A reference document could not be loaded.
    Reference(ReferenceError),
}

impl std::fmt::Display for MaterializeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MaterializeError::Validation(msg) => write!(f, "{}", msg),
            MaterializeError::Reference(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for MaterializeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            MaterializeError::Validation(_) => None,
            MaterializeError::Reference(e) => Some(e),
        }
    }
}

// ============================================================================
// MATERIALIZER
// ============================================================================

/// Turns a validated (cityId, townshipId) pair into a `LocationPayload`.
///
/// Create and update share this path unchanged: an update always fully
/// re-resolves both names for its new id pair.
#[derive(Debug, Clone)]
pub struct Materializer<S> {
    source: S,
}

impl<S: ReferenceSource> Materializer<S> {
    pub fn new(source: S) -> Self {
        Materializer { source }
    }

    pub async fn materialize(
        &self,
        city_id: &str,
        township_id: &str,
    ) -> Result<LocationPayload, MaterializeError> {
        if city_id.is_empty() {
            return Err(MaterializeError::Validation(
                "cityId is required".to_string(),
            ));
        }
        if township_id.is_empty() {
            return Err(MaterializeError::Validation(
                "townshipId is required".to_string(),
            ));
        }

        let cities = self
            .source
            .load_cities()
            .await
            .map_err(MaterializeError::Reference)?;
        let city_name = match cities.iter().find(|c| c.id == city_id) {
            Some(city) => city.name.clone(),
            None => {
                eprintln!("city id {} not in reference data, stamping placeholder", city_id);
                UNKNOWN_CITY.to_string()
            }
        };

        let townships = self
            .source
            .load_townships(city_id)
            .await
            .map_err(MaterializeError::Reference)?;
        let township_name = match townships.iter().find(|t| t.id == township_id) {
            Some(township) => township.name.clone(),
            None => {
                eprintln!(
                    "township id {} not under city {}, stamping placeholder",
                    township_id, city_id
                );
                UNKNOWN_TOWNSHIP.to_string()
            }
        };

        // Both names carry at least a placeholder, so this is never empty.
        let full_address = format!("{}{}", city_name, township_name);

        Ok(LocationPayload {
            city_id: city_id.to_string(),
            city_name,
            township_id: township_id.to_string(),
            township_name,
            full_address,
        })
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reference::{ReferenceCity, ReferenceTownship};
    use std::cell::RefCell;
    use std::collections::HashMap;

    struct FixtureSource {
        cities: Vec<ReferenceCity>,
        townships: HashMap<String, Vec<ReferenceTownship>>,
        calls: RefCell<usize>,
    }

    impl FixtureSource {
        fn new() -> Self {
            let mut townships = HashMap::new();
            townships.insert(
                "A".to_string(),
                vec![ReferenceTownship {
                    id: "A1".to_string(),
                    name: "One".to_string(),
                }],
            );
            FixtureSource {
                cities: vec![ReferenceCity {
                    id: "A".to_string(),
                    name: "Alpha".to_string(),
                }],
                townships,
                calls: RefCell::new(0),
            }
        }
    }

    impl ReferenceSource for FixtureSource {
        async fn load_cities(&self) -> Result<Vec<ReferenceCity>, ReferenceError> {
            *self.calls.borrow_mut() += 1;
            Ok(self.cities.clone())
        }

        async fn load_townships(
            &self,
            city_id: &str,
        ) -> Result<Vec<ReferenceTownship>, ReferenceError> {
            *self.calls.borrow_mut() += 1;
            Ok(self.townships.get(city_id).cloned().unwrap_or_default())
        }
    }

    #[tokio::test]
    async fn resolves_both_names_and_concatenates() {
        let materializer = Materializer::new(FixtureSource::new());
        let payload = materializer.materialize("A", "A1").await.unwrap();

        assert_eq!(payload.city_name, "Alpha");
        assert_eq!(payload.township_name, "One");
        assert_eq!(payload.full_address, "AlphaOne");
    }

    #[tokio::test]
    async fn full_address_is_city_plus_township_and_never_empty() {
        let materializer = Materializer::new(FixtureSource::new());

        for (city, township) in [("A", "A1"), ("A", "nope"), ("Z", "Z1")] {
            let payload = materializer.materialize(city, township).await.unwrap();
            assert_eq!(
                payload.full_address,
                format!("{}{}", payload.city_name, payload.township_name)
            );
            assert!(!payload.full_address.is_empty());
        }
    }

    #[tokio::test]
    async fn unknown_city_gets_placeholder_without_failing() {
        let materializer = Materializer::new(FixtureSource::new());
        let payload = materializer.materialize("Z", "Z1").await.unwrap();

        assert_eq!(payload.city_name, UNKNOWN_CITY);
        // No township list exists for "Z", so the township falls back too.
        assert_eq!(payload.township_name, UNKNOWN_TOWNSHIP);
        assert_eq!(
            payload.full_address,
            format!("{}{}", UNKNOWN_CITY, UNKNOWN_TOWNSHIP)
        );
    }

    #[tokio::test]
    async fn unknown_township_under_known_city_gets_placeholder() {
        let materializer = Materializer::new(FixtureSource::new());
        let payload = materializer.materialize("A", "A9").await.unwrap();

        assert_eq!(payload.city_name, "Alpha");
        assert_eq!(payload.township_name, UNKNOWN_TOWNSHIP);
        assert_eq!(payload.full_address, format!("Alpha{}", UNKNOWN_TOWNSHIP));
    }

    #[tokio::test]
    async fn empty_city_id_is_rejected_before_any_lookup() {
        let materializer = Materializer::new(FixtureSource::new());
        let err = materializer.materialize("", "A1").await.unwrap_err();

        assert!(matches!(err, MaterializeError::Validation(_)));
        assert_eq!(*materializer.source.calls.borrow(), 0);
    }

    #[tokio::test]
    async fn empty_township_id_is_rejected_before_any_lookup() {
        let materializer = Materializer::new(FixtureSource::new());
        let err = materializer.materialize("A", "").await.unwrap_err();

        assert!(matches!(err, MaterializeError::Validation(_)));
        assert_eq!(*materializer.source.calls.borrow(), 0);
    }

    #[tokio::test]
    async fn same_pair_materializes_identically() {
        let materializer = Materializer::new(FixtureSource::new());
        let first = materializer.materialize("A", "A1").await.unwrap();
        let second = materializer.materialize("A", "A1").await.unwrap();

        assert_eq!(first, second);
    }
}
