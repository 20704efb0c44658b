//! Categorical job attributes: area taxonomy and seniority levels.
//!
//! Both enums serialize to the lowercase names stored in index metadata and
//! used by exact-match filters. Keyword detection classifies postings that
//! arrive without a category during ingestion.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Functional area of a job posting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Area {
    Engenharia,
    Dados,
    Design,
    Produto,
    Marketing,
    Vendas,
    Rh,
    Financeiro,
    /// Catch-all for postings outside the taxonomy.
    #[default]
    Outros,
}

/// Areas checked in order by [`Area::detect`]; the first hit wins.
const AREA_KEYWORDS: &[(Area, &[&str])] = &[
    (
        Area::Engenharia,
        &[
            "software",
            "backend",
            "frontend",
            "fullstack",
            "devops",
            "sre",
            "platform",
            "infrastructure",
        ],
    ),
    (
        Area::Dados,
        &[
            "data",
            "dados",
            "analytics",
            "bi",
            "machine learning",
            "ml",
            "ai",
            "scientist",
        ],
    ),
    (
        Area::Design,
        &["design", "designer", "ux", "ui", "product designer", "visual"],
    ),
    (
        Area::Produto,
        &["product", "product manager", "pm", "scrum", "agile"],
    ),
    (
        Area::Marketing,
        &["marketing", "growth", "seo", "content", "social media"],
    ),
    (
        Area::Vendas,
        &["sales", "vendas", "account", "comercial", "business development"],
    ),
    (
        Area::Rh,
        &["rh", "hr", "people", "talent", "recruiting", "recruiter"],
    ),
    (
        Area::Financeiro,
        &["finance", "financeiro", "contabil", "accounting", "treasury"],
    ),
];

impl Area {
    /// All taxonomy values, catch-all last.
    pub const ALL: [Area; 9] = [
        Area::Engenharia,
        Area::Dados,
        Area::Design,
        Area::Produto,
        Area::Marketing,
        Area::Vendas,
        Area::Rh,
        Area::Financeiro,
        Area::Outros,
    ];

    /// Stable lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Area::Engenharia => "engenharia",
            Area::Dados => "dados",
            Area::Design => "design",
            Area::Produto => "produto",
            Area::Marketing => "marketing",
            Area::Vendas => "vendas",
            Area::Rh => "rh",
            Area::Financeiro => "financeiro",
            Area::Outros => "outros",
        }
    }

    /// Classify free text into an area by keyword, falling back to [`Area::Outros`].
    pub fn detect(text: &str) -> Area {
        let lower = text.to_lowercase();
        AREA_KEYWORDS
            .iter()
            .find(|(_, keywords)| keywords.iter().any(|kw| contains_word(&lower, kw)))
            .map(|(area, _)| *area)
            .unwrap_or(Area::Outros)
    }
}

impl fmt::Display for Area {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Area {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_lowercase();
        Area::ALL
            .into_iter()
            .find(|area| area.as_str() == needle)
            .ok_or_else(|| Error::Validation(format!("unknown area '{}'", s)))
    }
}

/// Seniority level of a posting or of the level a candidate is looking for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Seniority {
    Junior,
    Mid,
    Senior,
    Lead,
    #[default]
    Unknown,
}

const SENIORITY_KEYWORDS: &[(Seniority, &[&str])] = &[
    (
        Seniority::Junior,
        &[
            "junior",
            "júnior",
            "jr",
            "entry level",
            "trainee",
            "intern",
            "estágio",
            "estagiário",
            "estagiária",
        ],
    ),
    (
        Seniority::Mid,
        &["pleno", "mid", "mid-level", "intermediário", "ii", "iii"],
    ),
    (
        Seniority::Senior,
        &["senior", "sênior", "sr", "especialista", "specialist"],
    ),
    (
        Seniority::Lead,
        &[
            "lead",
            "tech lead",
            "líder",
            "principal",
            "staff",
            "head",
            "director",
            "gerente",
            "manager",
            "arquiteto",
        ],
    ),
];

impl Seniority {
    pub const ALL: [Seniority; 5] = [
        Seniority::Junior,
        Seniority::Mid,
        Seniority::Senior,
        Seniority::Lead,
        Seniority::Unknown,
    ];

    /// Stable lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Seniority::Junior => "junior",
            Seniority::Mid => "mid",
            Seniority::Senior => "senior",
            Seniority::Lead => "lead",
            Seniority::Unknown => "unknown",
        }
    }

    pub fn is_known(&self) -> bool {
        *self != Seniority::Unknown
    }

    /// Classify free text into a level by keyword, falling back to [`Seniority::Unknown`].
    pub fn detect(text: &str) -> Seniority {
        let lower = text.to_lowercase();
        SENIORITY_KEYWORDS
            .iter()
            .find(|(_, keywords)| keywords.iter().any(|kw| contains_word(&lower, kw)))
            .map(|(level, _)| *level)
            .unwrap_or(Seniority::Unknown)
    }
}

impl fmt::Display for Seniority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Seniority {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_lowercase();
        Seniority::ALL
            .into_iter()
            .find(|level| level.as_str() == needle)
            .ok_or_else(|| Error::Validation(format!("unknown seniority '{}'", s)))
    }
}

/// Whole-word (or whole-phrase) containment on already-lowercased text.
fn contains_word(haystack: &str, keyword: &str) -> bool {
    haystack.match_indices(keyword).any(|(start, _)| {
        let end = start + keyword.len();
        let before_ok = haystack[..start]
            .chars()
            .next_back()
            .map_or(true, |c| !c.is_alphanumeric());
        let after_ok = haystack[end..]
            .chars()
            .next()
            .map_or(true, |c| !c.is_alphanumeric());
        before_ok && after_ok
    })
}
