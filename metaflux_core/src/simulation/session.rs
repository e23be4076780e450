//! Per model simulator sessions
//!
//! A simulator mutates its working copy in place, so two requests against the same model must
//! not interleave. The registry hands out one [`Simulator`] per model id behind its own mutex.
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use indexmap::IndexMap;

use crate::simulation::{SimulationError, Simulator};

type Session = Arc<Mutex<Simulator>>;

/// Model id to simulator, models are loaded lazily from `<models_dir>/<id>.json`
pub struct SessionRegistry {
    models_dir: PathBuf,
    sessions: Mutex<IndexMap<String, Session>>,
}

impl SessionRegistry {
    pub fn new(models_dir: &Path) -> Self {
        SessionRegistry {
            models_dir: models_dir.to_path_buf(),
            sessions: Mutex::new(IndexMap::new()),
        }
    }

    /// Register an already built simulator under `model_id`, replacing any previous session
    pub fn insert(&self, model_id: &str, simulator: Simulator) -> Result<(), SimulationError> {
        let mut sessions = self.sessions(model_id)?;
        sessions.insert(model_id.to_string(), Arc::new(Mutex::new(simulator)));
        Ok(())
    }

    /// Ids of the models loaded so far
    pub fn loaded(&self) -> Vec<String> {
        self.sessions
            .lock()
            .map(|sessions| sessions.keys().cloned().collect())
            .unwrap_or_default()
    }

    fn sessions(
        &self,
        model_id: &str,
    ) -> Result<MutexGuard<'_, IndexMap<String, Session>>, SimulationError> {
        self.sessions
            .lock()
            .map_err(|_| SimulationError::PoisonedSession(model_id.to_string()))
    }

    /// The session of `model_id`, loading the model if needed
    ///
    /// The registry lock is not held while a model is read, requests for loaded models go on
    /// meanwhile. When two requests load the same model, the first one inserted wins.
    fn session(&self, model_id: &str) -> Result<Session, SimulationError> {
        if let Some(session) = self.sessions(model_id)?.get(model_id) {
            return Ok(Arc::clone(session));
        }
        if model_id.is_empty() || model_id.contains(['/', '\\']) || model_id.contains("..") {
            return Err(SimulationError::ModelNotFound(model_id.to_string()));
        }
        let path = self.models_dir.join(format!("{}.json", model_id));
        if !path.is_file() {
            return Err(SimulationError::ModelNotFound(model_id.to_string()));
        }
        log::info!("Loading model {} from {}", model_id, path.display());
        let simulator = Simulator::from_json_file(&path)?;
        let mut sessions = self.sessions(model_id)?;
        let session = sessions
            .entry(model_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(simulator)));
        Ok(Arc::clone(session))
    }

    /// Run `f` with exclusive access to the simulator of `model_id`
    ///
    /// The per model lock is held for the whole call and released on every exit path, other
    /// models stay available meanwhile.
    pub fn with_session<T, F>(&self, model_id: &str, f: F) -> Result<T, SimulationError>
    where
        F: FnOnce(&mut Simulator) -> Result<T, SimulationError>,
    {
        let session = self.session(model_id)?;
        let mut simulator = session
            .lock()
            .map_err(|_| SimulationError::PoisonedSession(model_id.to_string()))?;
        f(&mut simulator)
    }
}
