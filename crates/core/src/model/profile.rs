use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::test_paper::TestKind;

//
// ─── IDENTITY ──────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentityField {
    Name,
    Class,
}

impl IdentityField {
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            IdentityField::Name => "name",
            IdentityField::Class => "class",
        }
    }
}

/// Missing identity fields block a submission before any I/O happens.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("missing student {}", join_labels(.missing))]
pub struct ValidationError {
    pub missing: Vec<IdentityField>,
}

fn join_labels(fields: &[IdentityField]) -> String {
    fields
        .iter()
        .map(|field| field.label())
        .collect::<Vec<_>>()
        .join(" and ")
}

/// Who is submitting: the name and class typed into the profile form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentIdentity {
    pub name: String,
    pub class: String,
}

impl StudentIdentity {
    #[must_use]
    pub fn new(name: impl Into<String>, class: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            class: class.into(),
        }
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.validate().is_ok()
    }

    /// Trimmed copy of the identity when both fields are present.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` listing every blank field.
    pub fn validate(&self) -> Result<StudentIdentity, ValidationError> {
        let name = self.name.trim();
        let class = self.class.trim();
        let mut missing = Vec::new();
        if name.is_empty() {
            missing.push(IdentityField::Name);
        }
        if class.is_empty() {
            missing.push(IdentityField::Class);
        }
        if !missing.is_empty() {
            return Err(ValidationError { missing });
        }
        Ok(StudentIdentity::new(name, class))
    }
}

//
// ─── PROFILE ───────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ProfileError {
    #[error("target band must be between 1.0 and 9.0 in steps of 0.5")]
    InvalidTargetBand,
}

/// Locally remembered student details.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentProfile {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub class: String,
    #[serde(default)]
    pub target_band: Option<f32>,
    #[serde(default)]
    pub module: TestKind,
}

impl StudentProfile {
    #[must_use]
    pub fn identity(&self) -> StudentIdentity {
        StudentIdentity::new(self.name.clone(), self.class.clone())
    }

    /// Replace name and class, keeping the other preferences.
    pub fn set_identity(&mut self, name: impl Into<String>, class: impl Into<String>) {
        self.name = name.into().trim().to_owned();
        self.class = class.into().trim().to_owned();
    }

    /// # Errors
    ///
    /// Returns `ProfileError::InvalidTargetBand` for bands off the 0.5 grid.
    pub fn set_target_band(&mut self, band: Option<f32>) -> Result<(), ProfileError> {
        if let Some(band) = band {
            let doubled = band * 2.0;
            if !(1.0..=9.0).contains(&band) || (doubled - doubled.round()).abs() > f32::EPSILON {
                return Err(ProfileError::InvalidTargetBand);
            }
        }
        self.target_band = band;
        Ok(())
    }
}
