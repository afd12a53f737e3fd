//! # Configuration
//!
//! Laboratory identity, workflow ids, notification behaviour and id
//! generation settings. Values are layered: built-in defaults, an optional
//! configuration file, then `LIMS__`-prefixed environment variables.

use crate::error::{LimsError, LimsResult};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct LimsConfig {
    pub laboratory: LaboratoryConfig,
    pub workflow: WorkflowConfig,
    pub notification: NotificationConfig,
    pub ids: IdConfig,
}

/// Sender identity used for outgoing notifications
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LaboratoryConfig {
    pub name: String,
    pub email_address: String,
}

impl Default for LaboratoryConfig {
    fn default() -> Self {
        Self {
            name: "Laboratory".to_string(),
            email_address: "lab@localhost".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowConfig {
    pub sample_workflow_id: String,
    pub analysis_workflow_id: String,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            sample_workflow_id: "bika_ar_workflow".to_string(),
            analysis_workflow_id: "bika_analysis_workflow".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationConfig {
    /// Ask the mail transport to bypass its outgoing queue
    pub send_immediately: bool,
    /// Attach the rendered rejection PDF to the email
    pub attach_pdf: bool,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            send_immediately: true,
            attach_pdf: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IdConfig {
    pub temporary_id_prefix: String,
}

impl Default for IdConfig {
    fn default() -> Self {
        Self {
            temporary_id_prefix: "tmp".to_string(),
        }
    }
}

impl LimsConfig {
    /// Defaults overridden by the flat `LIMS_*` environment variables
    pub fn from_env() -> LimsResult<Self> {
        let mut config = Self::default();

        if let Ok(name) = std::env::var("LIMS_LAB_NAME") {
            config.laboratory.name = name;
        }

        if let Ok(email) = std::env::var("LIMS_LAB_EMAIL") {
            config.laboratory.email_address = email;
        }

        if let Ok(immediate) = std::env::var("LIMS_SEND_IMMEDIATELY") {
            config.notification.send_immediately = immediate.parse().map_err(|e| {
                LimsError::Configuration(format!("Invalid send_immediately: {e}"))
            })?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Load defaults, then the optional file, then `LIMS__SECTION__KEY` variables
    pub fn load(path: Option<&Path>) -> LimsResult<Self> {
        let mut builder =
            config::Config::builder().add_source(config::Config::try_from(&Self::default())?);

        if let Some(path) = path {
            debug!(path = %path.display(), "Loading LIMS configuration file");
            builder = builder.add_source(config::File::from(path).required(false));
        }

        builder = builder.add_source(
            config::Environment::with_prefix("LIMS")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let config: Self = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> LimsResult<()> {
        if self.workflow.sample_workflow_id.trim().is_empty() {
            return Err(LimsError::Configuration(
                "workflow.sample_workflow_id must not be empty".to_string(),
            ));
        }
        if self.workflow.analysis_workflow_id.trim().is_empty() {
            return Err(LimsError::Configuration(
                "workflow.analysis_workflow_id must not be empty".to_string(),
            ));
        }
        if self.ids.temporary_id_prefix.is_empty() {
            return Err(LimsError::Configuration(
                "ids.temporary_id_prefix must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}
