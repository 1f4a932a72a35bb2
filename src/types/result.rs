use crate::types::answer::Answer;
use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FacetScore {
    pub id: String,
    pub name: String,
    pub name_en: String,
    pub raw_score: u32,
    pub items: Vec<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupScore {
    pub id: String,
    pub name: String,
    pub name_en: String,
    pub raw_score: u32,
    /// Number of items in the group.
    pub items: usize,
    /// Number of those items that were answered.
    pub answered: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub t_score: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub percentile: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sten: Option<f64>,
    pub percentage: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level_label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interpretation: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub careers: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub low_label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub high_label: Option<String>,
    pub rank: usize,
    pub is_top: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub facets: Vec<FacetScore>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DichotomyScore {
    pub dichotomy: String,
    pub name: String,
    pub name_en: String,
    pub first_pole: String,
    pub second_pole: String,
    pub first_pole_score: i32,
    pub second_pole_score: i32,
    pub preference: String,
    pub clarity: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clarity_label: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Composite {
    /// Holland code, DISC pattern.
    Code { code: String, members: Vec<String> },
    /// Enneagram primary type with its wing.
    Wing {
        primary: String,
        wing: String,
        code: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        category: Option<String>,
    },
    /// VIA signature strengths in rank order.
    Signature { strengths: Vec<String> },
    /// DIPS top talents in rank order.
    TopTalents { talents: Vec<String> },
    /// MBTI type code with the per-axis breakdown.
    Dichotomies {
        type_code: String,
        dichotomies: Vec<DichotomyScore>,
    },
}

impl Composite {
    /// The short code a report headlines, if the rule produces one.
    pub fn code(&self) -> Option<&str> {
        match self {
            Self::Code { code, .. } | Self::Wing { code, .. } => Some(code),
            Self::Dichotomies { type_code, .. } => Some(type_code),
            Self::Signature { .. } | Self::TopTalents { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategorySummary {
    pub category: String,
    pub groups: Vec<String>,
    pub mean_percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TestResult {
    pub instrument: String,
    pub instrument_name: String,
    pub instrument_name_en: String,
    pub completed_at: DateTime<Utc>,
    pub complete: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub norm_set: Option<String>,
    pub config_sha256: String,
    pub answers: Vec<Answer>,
    pub groups: Vec<GroupScore>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub composite: Option<Composite>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub categories: Vec<CategorySummary>,
}

impl TestResult {
    pub fn group(&self, id: &str) -> Option<&GroupScore> {
        self.groups.iter().find(|group| group.id == id)
    }
}
