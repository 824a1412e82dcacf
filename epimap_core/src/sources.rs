//! Collaborator contracts the engines consume.
//!
//! The engines are pure batch transformations; everything they read
//! (stored case points, region reference data, aggregate case counts)
//! arrives through these read-only seams, materialized by the caller.

use chrono::NaiveDate;

use crate::error::CatalogError;
use crate::types::{CaseCount, CasePoint, Region};

/// Read-only access to persisted case points.
pub trait PointSource {
    /// Case points with dates in `[start, end)`, in stable order.
    fn points_between(&self, start: NaiveDate, end: NaiveDate) -> Vec<CasePoint>;
}

/// Lookup of static region reference data.
pub trait RegionCatalog {
    /// Resolves a region by name (case-insensitive).
    fn lookup(&self, name: &str) -> Result<Region, CatalogError>;
}

/// Aggregate case counts per (date, region).
pub trait CaseCountTable {
    /// Every (region, count) recorded for `date`, in stable order.
    fn counts_on(&self, date: NaiveDate) -> Vec<(String, CaseCount)>;

    /// The count recorded for one region on `date`, if any.
    fn count_for(&self, date: NaiveDate, region: &str) -> Option<CaseCount>;
}
