use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, OnceLock};

use serde::Serialize;
use tracing::{info, warn};

use super::{ResourceLoadError, Resources};

/// Produces the resource bundle; called at most once per [`ResourceStore`].
pub trait ArtifactSource: Send + Sync {
    fn load(&self) -> Result<Resources, ResourceLoadError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceState {
    Uninitialized,
    Loading,
    Ready,
    Failed,
}

const UNINITIALIZED: u8 = 0;
const LOADING: u8 = 1;
const READY: u8 = 2;
const FAILED: u8 = 3;

/// Load-once holder for [`Resources`].
///
/// Concurrent first callers block on the single in-flight load and all observe the same
/// outcome. A failed load, including a panicking source, is terminal for the store.
pub struct ResourceStore<S> {
    source: S,
    state: AtomicU8,
    outcome: OnceLock<Result<Arc<Resources>, ResourceLoadError>>,
}

impl<S> ResourceStore<S>
where
    S: ArtifactSource,
{
    pub fn new(source: S) -> Self {
        Self {
            source,
            state: AtomicU8::new(UNINITIALIZED),
            outcome: OnceLock::new(),
        }
    }

    pub fn state(&self) -> ResourceState {
        match self.state.load(Ordering::Acquire) {
            UNINITIALIZED => ResourceState::Uninitialized,
            LOADING => ResourceState::Loading,
            READY => ResourceState::Ready,
            _ => ResourceState::Failed,
        }
    }

    pub fn load(&self) -> Result<Arc<Resources>, ResourceLoadError> {
        self.outcome
            .get_or_init(|| {
                self.state.store(LOADING, Ordering::Release);
                info!("loading risk artifacts");

                let loaded = panic::catch_unwind(AssertUnwindSafe(|| self.source.load()))
                    .unwrap_or_else(|payload| {
                        Err(ResourceLoadError::Panicked {
                            reason: panic_message(payload.as_ref()),
                        })
                    });

                match loaded {
                    Ok(resources) => {
                        info!(
                            injury_risks = resources.risk_table.injury_len(),
                            cause_risks = resources.risk_table.cause_len(),
                            classifiers = resources.classifiers.is_some(),
                            "risk artifacts ready"
                        );
                        self.state.store(READY, Ordering::Release);
                        Ok(Arc::new(resources))
                    }
                    Err(err) => {
                        warn!(error = %err, "risk artifacts failed to load");
                        self.state.store(FAILED, Ordering::Release);
                        Err(err)
                    }
                }
            })
            .clone()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

impl<S> std::fmt::Debug for ResourceStore<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceStore")
            .field("state", &self.state.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}
