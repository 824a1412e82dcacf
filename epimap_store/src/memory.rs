//! In-memory stores backing the collaborator contracts.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use chrono::NaiveDate;
use serde::Deserialize;

use epimap_core::sources::{CaseCountTable, PointSource, RegionCatalog};
use epimap_core::{CaseCount, CasePoint, CatalogError, Region};

use crate::error::StoreError;

/// Case points held in memory, in insertion order.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPointStore {
    points: Vec<CasePoint>,
}

impl InMemoryPointStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads points from a JSON array of case points.
    pub fn from_json(json: &str) -> Result<Self, StoreError> {
        let points: Vec<CasePoint> = serde_json::from_str(json)?;
        Ok(Self { points })
    }

    /// Loads points from a JSON fixture file.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        Self::from_json(&fs::read_to_string(path)?)
    }

    /// Appends a point.
    pub fn insert(&mut self, point: CasePoint) {
        self.points.push(point);
    }

    /// All stored points, in insertion order.
    pub fn points(&self) -> &[CasePoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

impl PointSource for InMemoryPointStore {
    fn points_between(&self, start: NaiveDate, end: NaiveDate) -> Vec<CasePoint> {
        self.points
            .iter()
            .filter(|p| p.date >= start && p.date < end)
            .cloned()
            .collect()
    }
}

/// Region reference data keyed by lowercased name.
#[derive(Debug, Clone, Default)]
pub struct InMemoryRegionCatalog {
    regions: HashMap<String, Region>,
}

impl InMemoryRegionCatalog {
    /// Creates an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads a catalog from a JSON array of regions, re-validating each
    /// entry on the way in.
    pub fn from_json(json: &str) -> Result<Self, StoreError> {
        let raw: Vec<Region> = serde_json::from_str(json)?;
        let mut catalog = Self::new();
        for region in raw {
            catalog.insert(Region::new(region.name, region.center, region.radius_m)?);
        }
        Ok(catalog)
    }

    /// Loads a catalog from a JSON fixture file.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        Self::from_json(&fs::read_to_string(path)?)
    }

    /// Inserts a region, replacing any previous entry with the same name.
    pub fn insert(&mut self, region: Region) {
        self.regions.insert(region.name.to_lowercase(), region);
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }
}

impl RegionCatalog for InMemoryRegionCatalog {
    fn lookup(&self, name: &str) -> Result<Region, CatalogError> {
        self.regions
            .get(&name.to_lowercase())
            .cloned()
            .ok_or_else(|| CatalogError::NotFound(name.to_string()))
    }
}

/// One recorded (date, region, count) row.
#[derive(Debug, Clone, Deserialize)]
struct CountRecord {
    date: NaiveDate,
    region: String,
    cases: CaseCount,
}

/// Aggregate case counts in recording order.
///
/// Counts are recorded as strings, `"12"` or the suppressed `"<5"`
/// sentinel, matching the upstream publication format.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCaseCountTable {
    records: Vec<CountRecord>,
}

impl InMemoryCaseCountTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads counts from a JSON array of `{date, region, cases}` rows.
    pub fn from_json(json: &str) -> Result<Self, StoreError> {
        let records: Vec<CountRecord> = serde_json::from_str(json)?;
        Ok(Self { records })
    }

    /// Loads counts from a JSON fixture file.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        Self::from_json(&fs::read_to_string(path)?)
    }

    /// Records a count.
    pub fn insert(&mut self, date: NaiveDate, region: impl Into<String>, cases: CaseCount) {
        self.records.push(CountRecord {
            date,
            region: region.into(),
            cases,
        });
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl CaseCountTable for InMemoryCaseCountTable {
    fn counts_on(&self, date: NaiveDate) -> Vec<(String, CaseCount)> {
        self.records
            .iter()
            .filter(|r| r.date == date)
            .map(|r| (r.region.clone(), r.cases))
            .collect()
    }

    fn count_for(&self, date: NaiveDate, region: &str) -> Option<CaseCount> {
        self.records
            .iter()
            .find(|r| r.date == date && r.region.eq_ignore_ascii_case(region))
            .map(|r| r.cases)
    }
}
