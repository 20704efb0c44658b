//! Metadata predicates for nearest-neighbor queries.

use serde::{Deserialize, Serialize};

use super::JobMetadata;
use crate::error::Result;
use crate::taxonomy::{Area, Seniority};

/// Filterable metadata fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterField {
    Area,
    Seniority,
    Location,
}

impl FilterField {
    /// Payload key of the field.
    pub fn key(&self) -> &'static str {
        match self {
            FilterField::Area => "area",
            FilterField::Seniority => "seniority",
            FilterField::Location => "location",
        }
    }
}

/// A predicate over index metadata.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterExpr {
    /// Field equals value.
    Eq { field: FilterField, value: String },
    /// Field contains value as a substring.
    Contains { field: FilterField, value: String },
    /// Every inner predicate holds.
    And(Vec<FilterExpr>),
}

impl FilterExpr {
    pub fn matches(&self, metadata: &JobMetadata) -> bool {
        match self {
            FilterExpr::Eq { field, value } => metadata.field(*field) == value.as_str(),
            FilterExpr::Contains { field, value } => metadata.field(*field).contains(value.as_str()),
            FilterExpr::And(inner) => inner.iter().all(|expr| expr.matches(metadata)),
        }
    }
}

/// Structured filters a caller may apply to a recommendation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchFilters {
    #[serde(default)]
    pub area: Option<Area>,
    #[serde(default)]
    pub seniority: Option<Seniority>,
    /// Substring the job location must contain.
    #[serde(default)]
    pub location: Option<String>,
}

impl SearchFilters {
    /// Parse raw boundary values. Blank values count as absent.
    pub fn parse(
        area: Option<&str>,
        seniority: Option<&str>,
        location: Option<&str>,
    ) -> Result<Self> {
        Ok(Self {
            area: present(area).map(str::parse::<Area>).transpose()?,
            seniority: present(seniority).map(str::parse::<Seniority>).transpose()?,
            location: present(location).map(str::to_string),
        })
    }

    pub fn is_empty(&self) -> bool {
        self.to_expr().is_none()
    }

    /// Compose the predicate: none for zero filters, the bare predicate for
    /// one, a conjunction for two or more.
    pub fn to_expr(&self) -> Option<FilterExpr> {
        let mut clauses = Vec::with_capacity(3);
        if let Some(area) = self.area {
            clauses.push(FilterExpr::Eq {
                field: FilterField::Area,
                value: area.as_str().to_string(),
            });
        }
        if let Some(seniority) = self.seniority {
            clauses.push(FilterExpr::Eq {
                field: FilterField::Seniority,
                value: seniority.as_str().to_string(),
            });
        }
        if let Some(location) = self.location.as_deref().filter(|l| !l.is_empty()) {
            clauses.push(FilterExpr::Contains {
                field: FilterField::Location,
                value: location.to_string(),
            });
        }
        match clauses.len() {
            0 => None,
            1 => clauses.pop(),
            _ => Some(FilterExpr::And(clauses)),
        }
    }
}

fn present(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
