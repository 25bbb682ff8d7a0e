// ⚙️ Selection Reconciler - Cascading city → township selector state
//
// Keeps the (city, township) pair consistent under three triggers:
// initial load, parent city change, and pre-seeding from a saved record.
//
// Core rule: a stored township id is only ever valid for the currently
// stored city id. Every transition re-establishes that before the new
// state is observable.

use crate::reference::{ReferenceCity, ReferenceError, ReferenceSource, ReferenceTownship};

// ============================================================================
// SELECTION
// ============================================================================

/// The transient, in-progress (city, township) pair.
///
/// Empty string means "nothing selected" for either level.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Selection {
    pub city_id: String,
    pub township_id: String,
}

impl Selection {
    /// Submission is allowed only when both levels are selected.
    pub fn is_complete(&self) -> bool {
        !self.city_id.is_empty() && !self.township_id.is_empty()
    }
}

// ============================================================================
// SELECTOR PHASE
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum SelectorPhase {
    /// Reference documents are being loaded
    Loading,

    /// Lists loaded, selection usable
    Ready,

    /// A reference load failed; no partial or stale list is offered.
    /// Recover with `retry()`.
    Failed(String),
}

// ============================================================================
// CITY/TOWNSHIP SELECTOR
// ============================================================================

/// Two-level dependent selector over a `ReferenceSource`.
pub struct CityTownshipSelector<S> {
    source: S,
    phase: SelectorPhase,
    cities: Vec<ReferenceCity>,
    townships: Vec<ReferenceTownship>,
    selection: Selection,
    seed: Selection,
    /// Bumped on every city change and reload; township loads carry the
    /// epoch they were issued under and are discarded if it is no longer
    /// current (a superseded fetch must not overwrite a newer selection).
    epoch: u64,
}

impl<S: ReferenceSource> CityTownshipSelector<S> {
    pub fn new(source: S) -> Self {
        CityTownshipSelector {
            source,
            phase: SelectorPhase::Loading,
            cities: Vec::new(),
            townships: Vec::new(),
            selection: Selection::default(),
            seed: Selection::default(),
            epoch: 0,
        }
    }

    /// Load the city list and, when editing an existing record, the seed
    /// city's township list. The two loads run concurrently and both must
    /// succeed; either failure puts the selector into `Failed`.
    ///
    /// The seed township is installed without a membership check: it came
    /// from a previously persisted record.
    pub async fn initialize(
        &mut self,
        seed_city: Option<&str>,
        seed_township: Option<&str>,
    ) -> Result<(), ReferenceError> {
        self.seed = Selection {
            city_id: seed_city.unwrap_or("").to_string(),
            township_id: seed_township.unwrap_or("").to_string(),
        };
        self.reload().await
    }

    /// Full reload from the stored seeds, recovering from `Failed`.
    pub async fn retry(&mut self) -> Result<(), ReferenceError> {
        self.reload().await
    }

    async fn reload(&mut self) -> Result<(), ReferenceError> {
        self.phase = SelectorPhase::Loading;
        self.epoch += 1;

        let loaded = if self.seed.city_id.is_empty() {
            self.source.load_cities().await.map(|c| (c, Vec::new()))
        } else {
            let (cities, townships) = tokio::join!(
                self.source.load_cities(),
                self.source.load_townships(&self.seed.city_id),
            );
            cities.and_then(|c| townships.map(|t| (c, t)))
        };

        match loaded {
            Ok((cities, townships)) => {
                self.cities = cities;
                self.townships = townships;
                self.selection = self.seed.clone();
                self.phase = SelectorPhase::Ready;
                Ok(())
            }
            Err(e) => {
                self.cities.clear();
                self.townships.clear();
                self.selection = Selection::default();
                self.phase = SelectorPhase::Failed(e.to_string());
                Err(e)
            }
        }
    }

    /// Replace the city selection and refresh the township list for it.
    ///
    /// A township selected under the previous city survives only if it is
    /// also a member of the new city's list; otherwise it is cleared.
    /// Selecting the empty city clears both the list and the township.
    pub async fn set_city(&mut self, city_id: impl Into<String>) -> Result<(), ReferenceError> {
        let city_id = city_id.into();
        self.epoch += 1;
        let epoch = self.epoch;
        self.selection.city_id = city_id.clone();

        if city_id.is_empty() {
            self.townships.clear();
            self.selection.township_id.clear();
            return Ok(());
        }

        let loaded = self.source.load_townships(&city_id).await;
        self.apply_township_load(epoch, loaded)
    }

    /// Install a township-load result issued under `epoch`.
    ///
    /// Late results from a superseded city change are discarded: the list
    /// they carry belongs to a city that is no longer selected.
    fn apply_township_load(
        &mut self,
        epoch: u64,
        loaded: Result<Vec<ReferenceTownship>, ReferenceError>,
    ) -> Result<(), ReferenceError> {
        if epoch != self.epoch {
            return Ok(());
        }

        match loaded {
            Ok(townships) => {
                if !self.selection.township_id.is_empty()
                    && !townships.iter().any(|t| t.id == self.selection.township_id)
                {
                    self.selection.township_id.clear();
                }
                self.townships = townships;
                Ok(())
            }
            Err(e) => {
                self.phase = SelectorPhase::Failed(e.to_string());
                Err(e)
            }
        }
    }

    /// Replace the township selection. No cascade: townships have no
    /// dependents.
    pub fn set_township(&mut self, township_id: impl Into<String>) {
        self.selection.township_id = township_id.into();
    }

    pub fn current_selection(&self) -> &Selection {
        &self.selection
    }

    pub fn phase(&self) -> &SelectorPhase {
        &self.phase
    }

    pub fn is_ready(&self) -> bool {
        self.phase == SelectorPhase::Ready
    }

    /// The city options currently offered.
    pub fn cities(&self) -> &[ReferenceCity] {
        &self.cities
    }

    /// The township options for the currently selected city.
    pub fn townships(&self) -> &[ReferenceTownship] {
        &self.townships
    }
}

// ============================================================================
// TESTS
// ============================================================================
