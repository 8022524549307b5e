//! Predicate filter engine.
//!
//! A [`FilterSpec`] is a conjunction of independent [`Predicate`]s over
//! [`ImageRecord`] fields. Every predicate is pure, so evaluation order never
//! changes the selection. Text comparisons are case-insensitive.

use crate::error::SwimError;
use crate::types::{ImageRecord, InventoryQuery};
use chrono::{DateTime, Duration, Utc};
use regex::{Regex, RegexBuilder};
use std::mem::discriminant;

/// One field check.
#[derive(Debug, Clone)]
pub enum Predicate {
    /// Family contains this (lowercased) substring.
    FamilyContains(String),
    /// Image type contains this (lowercased) substring.
    TypeContains(String),
    /// Name contains this (lowercased) substring.
    NameContains(String),
    /// Name matches this pattern anywhere.
    NameMatches(Regex),
    /// Version equals this (lowercased) value.
    VersionEquals(String),
    /// Version matches this pattern anywhere.
    VersionMatches(Regex),
    /// Golden flag equals this value.
    Golden(bool),
    /// Created at least this many days ago. Records without a creation
    /// time always pass.
    OlderThanDays(u32),
    /// No device uses the image.
    UnusedOnly,
}

impl Predicate {
    /// Evaluate against one record, with `now` as the age reference.
    pub fn test(&self, record: &ImageRecord, now: DateTime<Utc>) -> bool {
        match self {
            Predicate::FamilyContains(needle) => contains_ci(&record.family, needle),
            Predicate::TypeContains(needle) => contains_ci(&record.image_type, needle),
            Predicate::NameContains(needle) => contains_ci(&record.name, needle),
            Predicate::NameMatches(re) => re.is_match(&record.name),
            Predicate::VersionEquals(v) => record.version.to_lowercase() == *v,
            Predicate::VersionMatches(re) => re.is_match(&record.version),
            Predicate::Golden(want) => record.is_golden == *want,
            Predicate::OlderThanDays(days) => match record.created_at {
                Some(created) => now - created >= Duration::days(i64::from(*days)),
                None => true,
            },
            Predicate::UnusedOnly => record.used_device_count == 0,
        }
    }

    /// Short name for logging.
    pub fn name(&self) -> &'static str {
        match self {
            Predicate::FamilyContains(_) => "family",
            Predicate::TypeContains(_) => "type",
            Predicate::NameContains(_) => "name_contains",
            Predicate::NameMatches(_) => "name_regex",
            Predicate::VersionEquals(_) => "version",
            Predicate::VersionMatches(_) => "version_regex",
            Predicate::Golden(_) => "golden",
            Predicate::OlderThanDays(_) => "older_than_days",
            Predicate::UnusedOnly => "unused_only",
        }
    }
}

fn contains_ci(haystack: &str, lowered_needle: &str) -> bool {
    haystack.to_lowercase().contains(lowered_needle)
}

fn compile(pattern: &str) -> Result<Regex, SwimError> {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .map_err(|e| SwimError::InvalidFilter(format!("bad pattern '{}': {}", pattern, e)))
}

/// Filter settings as supplied by the operator. Empty strings mean unset.
#[derive(Debug, Clone, Default)]
pub struct FilterOptions {
    pub family: Option<String>,
    pub name_contains: Option<String>,
    pub name_regex: Option<String>,
    pub version: Option<String>,
    pub version_regex: Option<String>,
    pub image_type: Option<String>,
    pub golden: Option<bool>,
    pub older_than_days: Option<u32>,
    pub unused_only: bool,
}

impl FilterOptions {
    /// Coarse server-side pre-filter, passed through verbatim.
    pub fn inventory_query(&self) -> InventoryQuery {
        let non_empty = |v: &Option<String>| v.clone().filter(|s| !s.is_empty());
        InventoryQuery {
            family: non_empty(&self.family),
            version: non_empty(&self.version),
        }
    }
}

/// Immutable conjunction of predicates. The empty spec matches everything.
#[derive(Debug, Clone, Default)]
pub struct FilterSpec {
    predicates: Vec<Predicate>,
}

impl FilterSpec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compile operator options, validating both patterns up front.
    pub fn from_options(opts: &FilterOptions) -> Result<Self, SwimError> {
        let mut spec = Self::new();
        if let Some(v) = &opts.family {
            spec = spec.family(v);
        }
        if let Some(v) = &opts.name_contains {
            spec = spec.name_contains(v);
        }
        if let Some(v) = &opts.name_regex {
            spec = spec.name_regex(v)?;
        }
        if let Some(v) = &opts.version {
            spec = spec.version(v);
        }
        if let Some(v) = &opts.version_regex {
            spec = spec.version_regex(v)?;
        }
        if let Some(v) = &opts.image_type {
            spec = spec.image_type(v);
        }
        if let Some(golden) = opts.golden {
            spec = spec.golden(golden);
        }
        if let Some(days) = opts.older_than_days {
            spec = spec.older_than_days(days);
        }
        if opts.unused_only {
            spec = spec.unused_only();
        }
        Ok(spec)
    }

    /// Add a predicate, replacing any existing one of the same kind.
    pub fn with(mut self, predicate: Predicate) -> Self {
        self.predicates
            .retain(|p| discriminant(p) != discriminant(&predicate));
        self.predicates.push(predicate);
        self
    }

    fn with_text(self, value: &str, make: fn(String) -> Predicate) -> Self {
        if value.is_empty() {
            return self;
        }
        self.with(make(value.to_lowercase()))
    }

    pub fn family(self, family: &str) -> Self {
        self.with_text(family, Predicate::FamilyContains)
    }

    pub fn image_type(self, image_type: &str) -> Self {
        self.with_text(image_type, Predicate::TypeContains)
    }

    pub fn name_contains(self, needle: &str) -> Self {
        self.with_text(needle, Predicate::NameContains)
    }

    pub fn version(self, version: &str) -> Self {
        self.with_text(version, Predicate::VersionEquals)
    }

    pub fn name_regex(self, pattern: &str) -> Result<Self, SwimError> {
        if pattern.is_empty() {
            return Ok(self);
        }
        Ok(self.with(Predicate::NameMatches(compile(pattern)?)))
    }

    pub fn version_regex(self, pattern: &str) -> Result<Self, SwimError> {
        if pattern.is_empty() {
            return Ok(self);
        }
        Ok(self.with(Predicate::VersionMatches(compile(pattern)?)))
    }

    pub fn golden(self, golden: bool) -> Self {
        self.with(Predicate::Golden(golden))
    }

    pub fn older_than_days(self, days: u32) -> Self {
        self.with(Predicate::OlderThanDays(days))
    }

    pub fn unused_only(self) -> Self {
        self.with(Predicate::UnusedOnly)
    }

    pub fn predicates(&self) -> &[Predicate] {
        &self.predicates
    }

    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }

    /// Match against the current time.
    pub fn matches(&self, record: &ImageRecord) -> bool {
        self.matches_at(record, Utc::now())
    }

    /// Match with an explicit age reference. Short-circuits on first failure.
    pub fn matches_at(&self, record: &ImageRecord, now: DateTime<Utc>) -> bool {
        self.predicates.iter().all(|p| p.test(record, now))
    }

    /// Keep matching records, preserving inventory order.
    pub fn select(&self, records: Vec<ImageRecord>) -> Vec<ImageRecord> {
        let now = Utc::now();
        records
            .into_iter()
            .filter(|r| self.matches_at(r, now))
            .collect()
    }
}
