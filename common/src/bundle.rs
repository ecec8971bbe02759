//! Results handed over by the evaluation engine.

use std::{collections::BTreeMap, fs, io, path::Path};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{error::AppError, metrics::Assessments};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultsBundle {
    #[serde(default)]
    pub date_time: Option<DateTime<Utc>>,
    pub version: String,
    pub revision: String,
    #[serde(default)]
    pub csv_path: Option<String>,
    #[serde(default)]
    pub log_paths: Option<Vec<String>>,
    #[serde(default)]
    pub model_logs_path: Option<String>,
    #[serde(default)]
    pub svg_path: Option<String>,
    pub total_score: u64,
    #[serde(default)]
    pub assessment_per_model: BTreeMap<String, Assessments>,
}

impl ResultsBundle {
    pub fn from_path(path: &Path) -> Result<Self, AppError> {
        let contents = fs::read(path).map_err(|err| {
            if err.kind() == io::ErrorKind::NotFound {
                AppError::NotFound(format!("results bundle {}", path.display()))
            } else {
                AppError::Io(err)
            }
        })?;
        let bundle = Self::from_slice(&contents)?;
        debug!(
            path = %path.display(),
            models = bundle.assessment_per_model.len(),
            "Loaded results bundle"
        );
        Ok(bundle)
    }

    pub fn from_slice(contents: &[u8]) -> Result<Self, AppError> {
        let bundle: Self = serde_json::from_slice(contents)?;
        bundle.validate()?;
        Ok(bundle)
    }

    fn validate(&self) -> Result<(), AppError> {
        if self.version.trim().is_empty() {
            return Err(AppError::Validation(
                "results bundle requires a non-empty version".into(),
            ));
        }
        if self.revision.trim().is_empty() {
            return Err(AppError::Validation(
                "results bundle requires a non-empty revision".into(),
            ));
        }
        Ok(())
    }
}
