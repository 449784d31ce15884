use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::cache::{CacheKey, ViewCache};
use crate::config::{MissingValuePolicy, SessionConfig};
use crate::data::model::Dataset;
use crate::data::transform::{self, TransformStep};
use crate::error::SessionError;
use crate::store::DatasetStore;
use crate::view::{self, Artifact, ViewRequest};

// ---------------------------------------------------------------------------
// Session – the interaction controller
// ---------------------------------------------------------------------------

/// Lifecycle of one session. `Loading` and `Recomputing` are transient:
/// events run to completion, so outside `handle` the session is always
/// `Idle` (nothing loaded yet) or `Ready`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Loading,
    Recomputing,
    Ready,
}

/// A discrete UI event.
#[derive(Debug, Clone)]
pub enum Event {
    Load(PathBuf),
    AddStep(TransformStep),
    RemoveStep(usize),
    RequestView(ViewRequest),
}

/// One user's interactive session: owns the dataset store, the ordered
/// transform steps, and the view cache. Single-threaded cooperative
/// execution; each event runs to completion before the next is accepted.
/// Errors are recorded as a status message and never corrupt the store
/// or the cache.
pub struct Session {
    config: SessionConfig,
    store: DatasetStore,
    cache: ViewCache,
    /// The dataset as loaded, before any transform; replays start here.
    base: Option<Dataset>,
    steps: Vec<TransformStep>,
    state: SessionState,
    status: Option<String>,
    last_artifact: Option<Arc<Artifact>>,
}

impl Session {
    pub fn new(config: SessionConfig) -> Self {
        let cache = ViewCache::new(config.cache_size_bound);
        Session {
            config,
            store: DatasetStore::new(),
            cache,
            base: None,
            steps: Vec::new(),
            state: SessionState::Idle,
            status: None,
            last_artifact: None,
        }
    }

    /// Dispatch one event. Returns the computed artifact for
    /// [`Event::RequestView`], `None` for the others.
    pub fn handle(&mut self, event: Event) -> Result<Option<Arc<Artifact>>, SessionError> {
        match event {
            Event::Load(path) => self.load(&path).map(|_| None),
            Event::AddStep(step) => self.add_step(step).map(|_| None),
            Event::RemoveStep(index) => self.remove_step(index).map(|_| None),
            Event::RequestView(request) => self.request_view(request).map(Some),
        }
    }

    // -- events --

    /// Load a dataset, resetting the transform list and eagerly dropping
    /// cache entries for superseded versions. On failure the previous
    /// dataset (if any) stays current.
    pub fn load(&mut self, path: &Path) -> Result<(), SessionError> {
        self.state = SessionState::Loading;
        let result = (|| -> Result<(), SessionError> {
            let dataset = self.store.load(path)?.clone();
            self.cache.invalidate_before(dataset.version);
            self.base = Some(dataset);
            self.steps.clear();
            self.last_artifact = None;
            Ok(())
        })();
        self.finish(result)
    }

    /// Append a transform step. The step is validated by applying it to
    /// the current working dataset; a failing step is rejected (not
    /// added) and the dataset stays at its pre-failure version.
    pub fn add_step(&mut self, step: TransformStep) -> Result<(), SessionError> {
        self.state = SessionState::Recomputing;
        let result = (|| -> Result<(), SessionError> {
            let next_index = self.steps.len();
            let working = self.store.current().ok_or(SessionError::NoDataset)?;
            let table =
                transform::apply(working, std::slice::from_ref(&step)).map_err(|mut err| {
                    // Report the step's position in the full list.
                    err.index = next_index;
                    err
                })?;
            self.steps.push(step);
            self.store.commit(table);
            Ok(())
        })();
        self.finish(result)
    }

    /// Remove the step at `index` and replay the remaining steps from the
    /// base dataset. If a remaining step now fails, the steps after the
    /// failure point are dropped and the last good dataset is kept.
    pub fn remove_step(&mut self, index: usize) -> Result<(), SessionError> {
        self.state = SessionState::Recomputing;
        let result = (|| -> Result<(), SessionError> {
            if index >= self.steps.len() {
                return Err(SessionError::NoSuchStep(index));
            }
            let base = self.base.as_ref().ok_or(SessionError::NoDataset)?;
            let removed = self.steps.remove(index);
            log::info!("removed step {index} ({removed}), replaying {} steps", self.steps.len());

            let run = transform::run(base, &self.steps);
            self.steps.truncate(run.applied);
            self.store.commit(run.table);
            match run.error {
                Some(err) => Err(err.into()),
                None => Ok(()),
            }
        })();
        self.finish(result)
    }

    /// Compute (or fetch from cache) the artifact for a view request.
    pub fn request_view(&mut self, request: ViewRequest) -> Result<Arc<Artifact>, SessionError> {
        self.state = SessionState::Recomputing;
        let result = (|| -> Result<Arc<Artifact>, SessionError> {
            let base = self.base.as_ref().ok_or(SessionError::NoDataset)?;
            let working = self.store.current().ok_or(SessionError::NoDataset)?;
            let key = CacheKey {
                dataset_version: base.version,
                steps_hash: transform::steps_hash(&self.steps),
                request: request.clone(),
            };
            let artifact = self
                .cache
                .get_or_compute(key, || view::compute(&working.table, &request))?;
            self.last_artifact = Some(Arc::clone(&artifact));
            Ok(artifact)
        })();
        self.finish(result)
    }

    /// Expand a "clean missing values" intent into the configured step.
    pub fn clean_missing(&mut self, columns: Vec<String>) -> Result<(), SessionError> {
        let step = match self.config.missing_value_policy {
            MissingValuePolicy::Drop => TransformStep::DropMissing { columns },
            MissingValuePolicy::Impute => TransformStep::ImputeMissing { columns },
        };
        self.add_step(step)
    }

    // -- boundary --

    /// Record the outcome of an event: errors become the user-facing
    /// status message, success clears it. The session always returns to
    /// `Ready` (or `Idle` before the first load); no error is fatal.
    fn finish<T>(&mut self, result: Result<T, SessionError>) -> Result<T, SessionError> {
        match &result {
            Ok(_) => self.status = None,
            Err(err) => {
                log::warn!("{err}");
                self.status = Some(err.to_string());
            }
        }
        self.state = if self.store.current().is_some() {
            SessionState::Ready
        } else {
            SessionState::Idle
        };
        result
    }

    // -- accessors for the presentation layer --

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Message describing the last failure, cleared on the next success.
    pub fn status_message(&self) -> Option<&str> {
        self.status.as_deref()
    }

    /// The current working dataset (base dataset with all steps applied).
    pub fn dataset(&self) -> Option<&Dataset> {
        self.store.current()
    }

    pub fn steps(&self) -> &[TransformStep] {
        &self.steps
    }

    /// The artifact from the most recent successful view request.
    pub fn last_artifact(&self) -> Option<&Arc<Artifact>> {
        self.last_artifact.as_ref()
    }
}

impl Default for Session {
    fn default() -> Self {
        Session::new(SessionConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::ColumnType;
    use std::io::Write;

    fn csv_session(content: &str) -> (Session, tempfile::NamedTempFile) {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        let mut session = Session::default();
        session.load(file.path()).unwrap();
        (session, file)
    }

    #[test]
    fn session_starts_idle_and_becomes_ready() {
        let session = Session::default();
        assert_eq!(session.state(), SessionState::Idle);
        assert!(session.dataset().is_none());

        let (session, _file) = csv_session("a\n1\n");
        assert_eq!(session.state(), SessionState::Ready);
        assert_eq!(session.dataset().unwrap().version, 1);
    }

    #[test]
    fn failed_load_keeps_previous_dataset_and_sets_status() {
        let (mut session, _file) = csv_session("a\n1\n");
        let err = session.load(Path::new("missing.xyz")).unwrap_err();
        assert!(matches!(err, SessionError::Load(_)));
        assert!(session.status_message().is_some());
        assert_eq!(session.dataset().unwrap().version, 1);
        assert_eq!(session.state(), SessionState::Ready);
    }

    #[test]
    fn rejected_step_is_not_added() {
        let (mut session, _file) = csv_session("age\n30\nN/A\n");
        let err = session
            .add_step(TransformStep::Cast {
                column: "age".into(),
                target: ColumnType::Integer,
            })
            .unwrap_err();
        assert!(matches!(err, SessionError::Transform(_)));
        assert!(session.steps().is_empty());
        assert_eq!(session.dataset().unwrap().version, 1);
        // Status names the failing step for the user.
        assert!(session.status_message().unwrap().contains("cast"));
    }

    #[test]
    fn remove_step_replays_from_base() {
        let (mut session, _file) = csv_session("age,income\n30,100\n40,\n50,300\n");
        session
            .add_step(TransformStep::DropMissing {
                columns: vec!["income".into()],
            })
            .unwrap();
        assert_eq!(session.dataset().unwrap().table.len(), 2);

        session.remove_step(0).unwrap();
        assert_eq!(session.dataset().unwrap().table.len(), 3);
        assert!(session.steps().is_empty());
        // Replay commits a fresh version, never mutates in place.
        assert_eq!(session.dataset().unwrap().version, 3);
    }

    #[test]
    fn remove_step_out_of_bounds() {
        let (mut session, _file) = csv_session("a\n1\n");
        assert!(matches!(
            session.remove_step(0),
            Err(SessionError::NoSuchStep(0))
        ));
    }

    #[test]
    fn clean_missing_follows_policy() {
        let (mut session, _file) = csv_session("a\n1\n\n");
        session.clean_missing(vec![]).unwrap();
        assert_eq!(
            session.steps(),
            &[TransformStep::DropMissing { columns: vec![] }]
        );

        let mut session = Session::new(SessionConfig {
            missing_value_policy: MissingValuePolicy::Impute,
            ..Default::default()
        });
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        file.write_all(b"a\n1\n\n3\n").unwrap();
        session.load(file.path()).unwrap();
        session.clean_missing(vec![]).unwrap();
        assert_eq!(
            session.steps(),
            &[TransformStep::ImputeMissing { columns: vec![] }]
        );
        assert_eq!(session.dataset().unwrap().table.len(), 3);
    }

    #[test]
    fn view_request_without_dataset_fails() {
        let mut session = Session::default();
        assert!(matches!(
            session.request_view(ViewRequest::MissingReport),
            Err(SessionError::NoDataset)
        ));
        assert_eq!(session.state(), SessionState::Idle);
    }
}
