//! Saving and restoring the state of a modelling session
use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::simulation::Environment;

pub const WORKSPACE_VERSION: &str = "1.0";
pub const APP_NAME: &str = "MetaFlux-Sim";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WorkspaceMetadata {
    pub created_at: DateTime<Utc>,
    pub app: String,
}

/// Conditions the session was simulated under
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkspaceConfig {
    pub model_id: String,
    pub environment: Environment,
    /// Reaction id to forced minimal flux
    pub overexpression: IndexMap<String, f64>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkspaceState {
    pub config: WorkspaceConfig,
    /// Gene or reaction ids
    pub knockouts: Vec<String>,
    /// Gene id to expression level
    pub omics_data: IndexMap<String, f64>,
    /// Whatever result was on display, stored as is
    pub last_results: Option<Value>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WorkspaceExport {
    pub version: String,
    pub metadata: WorkspaceMetadata,
    pub state: WorkspaceState,
}

impl WorkspaceExport {
    /// Stamp `state` with the current time
    pub fn new(state: WorkspaceState) -> Self {
        WorkspaceExport {
            version: WORKSPACE_VERSION.to_string(),
            metadata: WorkspaceMetadata {
                created_at: Utc::now(),
                app: APP_NAME.to_string(),
            },
            state,
        }
    }

    /// Store a result of any analysis as the last displayed one
    pub fn with_last_results<T: Serialize>(mut self, results: &T) -> Result<Self, WorkspaceError> {
        self.state.last_results = Some(serde_json::to_value(results)?);
        Ok(self)
    }

    pub fn to_json_string(&self) -> Result<String, WorkspaceError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse an export, documents of another version are rejected
    pub fn from_json_str(text: &str) -> Result<Self, WorkspaceError> {
        let export: WorkspaceExport = serde_json::from_str(text)?;
        if export.version != WORKSPACE_VERSION {
            return Err(WorkspaceError::UnsupportedVersion(export.version));
        }
        Ok(export)
    }

    pub fn write_json<P: AsRef<Path>>(&self, path: P) -> Result<(), WorkspaceError> {
        fs::write(path.as_ref(), self.to_json_string()?).map_err(|err| {
            WorkspaceError::Io(format!("{}: {}", path.as_ref().display(), err))
        })?;
        log::info!("Workspace written to {}", path.as_ref().display());
        Ok(())
    }

    pub fn read_json<P: AsRef<Path>>(path: P) -> Result<Self, WorkspaceError> {
        let text = fs::read_to_string(path.as_ref()).map_err(|err| {
            WorkspaceError::Io(format!("{}: {}", path.as_ref().display(), err))
        })?;
        Self::from_json_str(&text)
    }
}

#[derive(Error, Debug)]
pub enum WorkspaceError {
    #[error("Unable to access workspace file: {0}")]
    Io(String),
    #[error("Invalid workspace document: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Unsupported workspace version {0}")]
    UnsupportedVersion(String),
}

#[cfg(test)]
mod tests {
    use std::env;

    use super::*;
    use crate::analysis::solution::ExchangeFlux;

    fn state() -> WorkspaceState {
        let mut omics_data = IndexMap::new();
        omics_data.insert("b_ldh".to_string(), 120.0);
        WorkspaceState {
            config: WorkspaceConfig {
                model_id: "toy_model".to_string(),
                environment: Environment {
                    aerobic: false,
                    ..Default::default()
                },
                overexpression: IndexMap::new(),
            },
            knockouts: vec!["b_pfl".to_string()],
            omics_data,
            last_results: None,
        }
    }

    #[test]
    fn document_layout() {
        let export = WorkspaceExport::new(state())
            .with_last_results(&vec![ExchangeFlux {
                id: "EX_lac__L_e".to_string(),
                value: 20.0,
            }])
            .unwrap();
        let json: Value = serde_json::from_str(&export.to_json_string().unwrap()).unwrap();
        assert_eq!(json["version"], "1.0");
        assert_eq!(json["metadata"]["app"], "MetaFlux-Sim");
        assert!(json["metadata"]["created_at"].is_string());
        assert_eq!(json["state"]["knockouts"][0], "b_pfl");
        assert_eq!(json["state"]["config"]["environment"]["aerobic"], false);
        assert_eq!(json["state"]["omics_data"]["b_ldh"], 120.0);
        assert_eq!(json["state"]["last_results"][0]["id"], "EX_lac__L_e");
    }

    #[test]
    fn parse_back() {
        let export = WorkspaceExport::new(state());
        let parsed = WorkspaceExport::from_json_str(&export.to_json_string().unwrap()).unwrap();
        assert_eq!(parsed, export);

        let partial = r#"{"version": "1.0",
            "metadata": {"created_at": "2024-05-01T12:00:00Z", "app": "MetaFlux-Sim"},
            "state": {"knockouts": ["PFL"]}}"#;
        let parsed = WorkspaceExport::from_json_str(partial).unwrap();
        assert_eq!(parsed.state.knockouts, vec!["PFL".to_string()]);
        assert_eq!(parsed.state.config.environment, Environment::default());
        assert!(parsed.state.last_results.is_none());
    }

    #[test]
    fn rejects_bad_documents() {
        let other = r#"{"version": "2.0",
            "metadata": {"created_at": "2024-05-01T12:00:00Z", "app": "MetaFlux-Sim"},
            "state": {}}"#;
        assert!(matches!(
            WorkspaceExport::from_json_str(other),
            Err(WorkspaceError::UnsupportedVersion(v)) if v == "2.0"
        ));
        assert!(matches!(
            WorkspaceExport::from_json_str("{"),
            Err(WorkspaceError::Json(_))
        ));
        assert!(matches!(
            WorkspaceExport::read_json("does/not/exist.json"),
            Err(WorkspaceError::Io(_))
        ));
    }

    #[test]
    fn file_round_trip() {
        let path = env::temp_dir().join("metaflux_workspace_test.json");
        let export = WorkspaceExport::new(state());
        export.write_json(&path).unwrap();
        assert_eq!(WorkspaceExport::read_json(&path).unwrap(), export);
        let _ = fs::remove_file(&path);
    }
}
