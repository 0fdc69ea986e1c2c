use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, RwLock};

use crate::eval::nnue::Network;
use crate::search::eval::Evaluator;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Idle,
    Loading,
    Ready,
    Error,
}

/// Readiness snapshot handed to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitStatus {
    pub status: Status,
    pub progress: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl InitStatus {
    fn idle() -> Self { Self { status: Status::Idle, progress: 0, error: None } }
}

/// Runtime settings of the learned evaluator backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluatorConfig {
    /// Dense `PIENNUE1` network; `None` keeps the static evaluator.
    pub network: Option<PathBuf>,
    pub output_scale: f32,
    pub threads: usize,
}

impl Default for EvaluatorConfig {
    fn default() -> Self { Self { network: None, output_scale: 1.0, threads: 1 } }
}

/// Owns readiness of the evaluator backend. Move selection never waits on
/// it: until a learned evaluator is installed, callers get `None` and use
/// static evaluation.
pub struct Lifecycle {
    init_lock: Mutex<()>,
    state: Mutex<InitStatus>,
    evaluator: RwLock<Option<Arc<dyn Evaluator>>>,
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self { init_lock: Mutex::new(()), state: Mutex::new(InitStatus::idle()), evaluator: RwLock::new(None) }
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl Lifecycle {
    pub fn new() -> Self { Self::default() }

    pub fn status(&self) -> InitStatus { lock(&self.state).clone() }

    fn set(&self, status: Status, progress: u8, error: Option<String>) {
        *lock(&self.state) = InitStatus { status, progress, error };
    }

    fn set_progress(&self, progress: u8) {
        lock(&self.state).progress = progress.min(100);
    }

    /// Brings the evaluator backend up. Concurrent callers are serialized and
    /// a call on a ready backend returns at once. Always settles to `Ready`
    /// or `Error`.
    pub fn initialize(&self, config: &EvaluatorConfig) -> InitStatus {
        self.initialize_with_progress(config, |_| {})
    }

    /// [`Lifecycle::initialize`] that also reports load progress in percent.
    pub fn initialize_with_progress<F: FnMut(u8)>(&self, config: &EvaluatorConfig, mut progress: F) -> InitStatus {
        let _serial = lock(&self.init_lock);
        if self.status().status == Status::Ready {
            return self.status();
        }
        let Some(path) = config.network.as_ref() else {
            info!("evaluator ready: static");
            self.set(Status::Ready, 100, None);
            return self.status();
        };

        self.set(Status::Loading, 0, None);
        info!("loading network {} (threads hint {})", path.display(), config.threads.max(1));
        let loaded = Network::load_with_progress(path, |p| {
            self.set_progress(p);
            progress(p.min(100));
        })
        .and_then(|net| {
            if net.feature_set().is_none() {
                anyhow::bail!("unsupported network input dimension {}", net.meta.input_dim);
            }
            Ok(net.with_output_scale(config.output_scale))
        });
        match loaded {
            Ok(net) => {
                info!("evaluator ready: nnue {}x{}", net.meta.input_dim, net.meta.hidden_dim);
                *self.evaluator.write().unwrap_or_else(|p| p.into_inner()) = Some(Arc::new(net));
                self.set(Status::Ready, 100, None);
            }
            Err(e) => {
                warn!("network load failed, continuing with static evaluation: {e:#}");
                let progress = self.status().progress;
                self.set(Status::Error, progress, Some(format!("{e:#}")));
            }
        }
        self.status()
    }

    /// Installed learned evaluator, if any.
    pub fn evaluator(&self) -> Option<Arc<dyn Evaluator>> {
        self.evaluator.read().unwrap_or_else(|p| p.into_inner()).clone()
    }

    pub fn dispose(&self) {
        let _serial = lock(&self.init_lock);
        *self.evaluator.write().unwrap_or_else(|p| p.into_inner()) = None;
        self.set(Status::Idle, 0, None);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn static_config_is_ready_immediately() {
        let lc = Lifecycle::new();
        assert_eq!(lc.status(), InitStatus::idle());
        let st = lc.initialize(&EvaluatorConfig::default());
        assert_eq!(st, InitStatus { status: Status::Ready, progress: 100, error: None });
        assert!(lc.evaluator().is_none());
    }

    #[test]
    fn missing_network_is_an_error_state() {
        let lc = Lifecycle::new();
        let cfg = EvaluatorConfig { network: Some("/nonexistent/net.nnue".into()), ..EvaluatorConfig::default() };
        let st = lc.initialize(&cfg);
        assert_eq!(st.status, Status::Error);
        assert!(st.error.is_some());
        assert!(lc.evaluator().is_none());
        lc.dispose();
        lc.dispose();
        assert_eq!(lc.status().status, Status::Idle);
    }

    #[test]
    fn status_serializes_lowercase() {
        let json = serde_json::to_string(&InitStatus { status: Status::Loading, progress: 40, error: None }).unwrap();
        assert_eq!(json, r#"{"status":"loading","progress":40}"#);
    }
}
