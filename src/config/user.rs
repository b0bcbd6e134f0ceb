//! Applicant credentials and personal data (`user.toml`)

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{Error, Result};

/// Kind of residence permit applied for
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResidenceType {
    #[default]
    Permanent,
    Temporary,
}

/// Family member applications submitted together with the main one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdditionalApplication {
    Child,
    Spouse,
    Children,
}

/// User configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UserConfig {
    /// Account e-mail
    pub login: String,
    pub password: String,

    pub name: String,
    pub surname: String,
    pub date_of_birth: String,
    pub citizenship: String,
    pub phone: String,
    pub passport: String,

    /// Residence card number, omitted from the form when absent
    pub residence_card: Option<String>,

    pub residence_type: ResidenceType,
    pub additional_applications: Vec<AdditionalApplication>,

    /// Case number, required by the head-of-department form
    pub case_number: Option<String>,
}

impl UserConfig {
    /// Load user configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::config(format!("Failed to read user file {}: {e}", path.display()))
        })?;

        toml::from_str(&content).map_err(|e| {
            Error::config(format!("Failed to parse user file {}: {e}", path.display()))
        })
    }

    /// Check that credentials are present
    pub fn validate(&self) -> Result<()> {
        if self.login.trim().is_empty() || self.password.is_empty() {
            return Err(Error::config("login and password are required"));
        }
        Ok(())
    }

    /// Case number for the head-of-department form
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` when it is missing or blank
    pub fn case_number(&self) -> Result<&str> {
        match self.case_number.as_deref().map(str::trim) {
            Some(number) if !number.is_empty() => Ok(number),
            _ => Err(Error::config(
                "case_number is required for a head of department visit",
            )),
        }
    }

    pub fn is_permanent_residence(&self) -> bool {
        self.residence_type == ResidenceType::Permanent
    }

    /// "Surname Name" as the service expects it
    pub fn full_name(&self) -> String {
        format!("{} {}", self.surname, self.name)
    }
}
