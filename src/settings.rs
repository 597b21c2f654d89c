use std::collections::BTreeSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::classify::ClassificationRules;
use crate::error::FundingError;
use crate::models::FundingModel;

pub const DEFAULT_RATE_PER_CREDIT: f64 = 107.0;
pub const DEFAULT_RATE_PER_STUDENT: f64 = 650.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ModelKind {
    CreditBased,
    PerStudent,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FundingEntry {
    pub student_type: String,
    pub model: ModelKind,
    pub rate: f64,
}

impl FundingEntry {
    pub fn funding_model(&self) -> FundingModel {
        match self.model {
            ModelKind::CreditBased => FundingModel::CreditBased {
                rate_per_credit: self.rate,
            },
            ModelKind::PerStudent => FundingModel::PerStudent {
                rate_per_student: self.rate,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub funding: Vec<FundingEntry>,
    pub rules: ClassificationRules,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            funding: vec![
                FundingEntry {
                    student_type: "Part Time".to_string(),
                    model: ModelKind::CreditBased,
                    rate: DEFAULT_RATE_PER_CREDIT,
                },
                FundingEntry {
                    student_type: "Full Time".to_string(),
                    model: ModelKind::PerStudent,
                    rate: DEFAULT_RATE_PER_STUDENT,
                },
            ],
            rules: ClassificationRules::default(),
        }
    }
}

impl Settings {
    /// Load settings from `path`, or the defaults when no file is given.
    pub fn load(path: Option<&Path>) -> Result<Self, FundingError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };

        let contents =
            std::fs::read_to_string(path).map_err(|err| FundingError::io(path, err))?;
        Self::from_toml_str(&contents)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, FundingError> {
        let mut settings: Settings = toml::from_str(contents)?;
        for entry in &mut settings.funding {
            entry.student_type = entry.student_type.trim().to_string();
        }
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), FundingError> {
        let mut seen = BTreeSet::new();
        for entry in &self.funding {
            if !entry.rate.is_finite() || entry.rate < 0.0 {
                return Err(FundingError::InvalidRate(entry.student_type.clone()));
            }
            if !seen.insert(entry.student_type.trim()) {
                return Err(FundingError::DuplicateStudentType(
                    entry.student_type.clone(),
                ));
            }
        }
        Ok(())
    }

    pub fn entry(&self, student_type: &str) -> Option<&FundingEntry> {
        self.funding
            .iter()
            .find(|entry| entry.student_type.trim() == student_type.trim())
    }
}
