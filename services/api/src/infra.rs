use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};
use tracing::debug;
use uuid::Uuid;
use vitamin_insight::analysis::{AnalysisPipeline, AnalysisSession};
use vitamin_insight::config::{AppEnvironment, ScorerKind, SessionConfig};
use vitamin_insight::error::AppError;
use vitamin_insight::report::ReportMode;
use vitamin_insight::scoring::PolicyProfile;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Shared handles for the analysis endpoints.
#[derive(Clone)]
pub(crate) struct AnalysisState {
    pub(crate) pipeline: Arc<AnalysisPipeline>,
    pub(crate) sessions: InMemorySessionStore,
    pub(crate) environment: AppEnvironment,
    pub(crate) timeout: Duration,
}

/// Per-user session state keyed by a random v4 UUID. Each session is only
/// locked for bookkeeping; analyses run without holding the lock.
///
/// Sessions idle for longer than `idle_ttl` are dropped, and creating a
/// session beyond `max_sessions` evicts the least recently used one.
#[derive(Clone)]
pub(crate) struct InMemorySessionStore {
    sessions: Arc<Mutex<HashMap<String, SessionEntry>>>,
    limits: SessionConfig,
}

struct SessionEntry {
    session: AnalysisSession,
    last_seen: Instant,
}

impl Default for InMemorySessionStore {
    fn default() -> Self {
        Self::with_limits(SessionConfig::default())
    }
}

impl InMemorySessionStore {
    pub(crate) fn with_limits(limits: SessionConfig) -> Self {
        Self {
            sessions: Arc::new(Mutex::new(HashMap::new())),
            limits: SessionConfig {
                max_sessions: limits.max_sessions.max(1),
                ..limits
            },
        }
    }

    pub(crate) fn create(&self) -> (String, AnalysisSession) {
        let id = Uuid::new_v4().to_string();
        let session = AnalysisSession::new();
        let now = Instant::now();

        let mut guard = self.sessions.lock().unwrap_or_else(PoisonError::into_inner);
        let idle_ttl = self.limits.idle_ttl;
        guard.retain(|_, entry| now.duration_since(entry.last_seen) < idle_ttl);

        while guard.len() >= self.limits.max_sessions {
            let Some(oldest) = guard
                .iter()
                .min_by_key(|(_, entry)| entry.last_seen)
                .map(|(id, _)| id.clone())
            else {
                break;
            };
            guard.remove(&oldest);
            debug!(session = %oldest, "evicted least recently used session");
        }

        guard.insert(
            id.clone(),
            SessionEntry {
                session: session.clone(),
                last_seen: now,
            },
        );
        (id, session)
    }

    pub(crate) fn with_session<T>(
        &self,
        id: &str,
        action: impl FnOnce(&mut AnalysisSession) -> T,
    ) -> Result<T, AppError> {
        let now = Instant::now();
        let mut guard = self.sessions.lock().unwrap_or_else(PoisonError::into_inner);

        let expired = guard
            .get(id)
            .is_some_and(|entry| now.duration_since(entry.last_seen) >= self.limits.idle_ttl);
        if expired {
            guard.remove(id);
        }

        let entry = guard
            .get_mut(id)
            .ok_or_else(|| AppError::SessionNotFound(id.to_string()))?;
        entry.last_seen = now;
        Ok(action(&mut entry.session))
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

pub(crate) fn parse_mode(raw: &str) -> Result<ReportMode, String> {
    ReportMode::parse(raw).ok_or_else(|| format!("unknown report mode '{raw}' (full, single)"))
}

pub(crate) fn parse_profile(raw: &str) -> Result<PolicyProfile, String> {
    PolicyProfile::parse(raw)
        .ok_or_else(|| format!("unknown policy profile '{raw}' (standard, healthy_biased)"))
}

pub(crate) fn parse_scorer(raw: &str) -> Result<ScorerKind, String> {
    ScorerKind::parse(raw).ok_or_else(|| format!("unknown scorer '{raw}' (demo, model)"))
}
