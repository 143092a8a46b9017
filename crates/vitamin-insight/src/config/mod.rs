use crate::scoring::{PolicyMisconfiguration, PolicyProfile, SamplingRange, ThresholdPolicy};
use crate::visual::{DecodeLimits, DEFAULT_MAX_DIMENSION, DEFAULT_MAX_UPLOAD_BYTES};
use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }

    pub fn is_production(self) -> bool {
        self == Self::Production
    }
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub analysis: AnalysisConfig,
    pub sessions: SessionConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            analysis: AnalysisConfig::from_env()?,
            sessions: SessionConfig::from_env()?,
        })
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Bounds on the per-user sessions the HTTP service keeps in memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    pub max_sessions: usize,
    pub idle_ttl: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_sessions: 1024,
            idle_ttl: Duration::from_secs(30 * 60),
        }
    }
}

impl SessionConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let max_sessions = parse_var::<usize>("APP_MAX_SESSIONS")?.unwrap_or(defaults.max_sessions);
        if max_sessions == 0 {
            return Err(ConfigError::InvalidValue {
                key: "APP_MAX_SESSIONS",
                value: "0".to_string(),
            });
        }
        let idle_ttl = parse_var::<u64>("APP_SESSION_IDLE_SECS")?
            .map(Duration::from_secs)
            .unwrap_or(defaults.idle_ttl);

        Ok(Self {
            max_sessions,
            idle_ttl,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScorerKind {
    #[default]
    Demo,
    Model,
}

impl ScorerKind {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "demo" | "random" => Some(Self::Demo),
            "model" => Some(Self::Model),
            _ => None,
        }
    }
}

/// Scoring, decoding and pacing parameters for one pipeline.
#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    pub profile: PolicyProfile,
    pub policy: ThresholdPolicy,
    pub sampling: SamplingRange,
    pub scorer: ScorerKind,
    pub seed: Option<u64>,
    pub simulated_latency: Duration,
    pub timeout: Duration,
    pub decode_limits: DecodeLimits,
    pub catalog_csv: Option<PathBuf>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self::for_profile(PolicyProfile::Standard)
    }
}

impl AnalysisConfig {
    pub fn for_profile(profile: PolicyProfile) -> Self {
        Self {
            profile,
            policy: profile.policy(),
            sampling: profile.sampling_range(),
            scorer: ScorerKind::Demo,
            seed: None,
            simulated_latency: Duration::ZERO,
            timeout: Duration::from_secs(10),
            decode_limits: DecodeLimits::default(),
            catalog_csv: None,
        }
    }

    /// Resets thresholds and sampling range to the values of `profile`.
    pub fn with_profile(mut self, profile: PolicyProfile) -> Self {
        self.profile = profile;
        self.policy = profile.policy();
        self.sampling = profile.sampling_range();
        self
    }

    fn from_env() -> Result<Self, ConfigError> {
        let profile = match env::var("APP_POLICY") {
            Ok(raw) => {
                PolicyProfile::parse(&raw).ok_or_else(|| ConfigError::UnknownProfile(raw))?
            }
            Err(_) => PolicyProfile::Standard,
        };
        let mut config = Self::for_profile(profile);

        let lower = parse_var::<f64>("APP_LOWER_THRESHOLD")?.unwrap_or(config.policy.lower());
        let upper = parse_var::<f64>("APP_UPPER_THRESHOLD")?.unwrap_or(config.policy.upper());
        config.policy = ThresholdPolicy::new(lower, upper)?;

        let min = parse_var::<f64>("APP_SAMPLE_MIN")?.unwrap_or(config.sampling.min());
        let max = parse_var::<f64>("APP_SAMPLE_MAX")?.unwrap_or(config.sampling.max());
        config.sampling = SamplingRange::new(min, max)?;

        if let Ok(raw) = env::var("APP_SCORER") {
            config.scorer = ScorerKind::parse(&raw).ok_or(ConfigError::UnknownScorer(raw))?;
        }

        config.seed = parse_var::<u64>("APP_SEED")?;
        config.simulated_latency =
            Duration::from_millis(parse_var::<u64>("APP_SIMULATED_LATENCY_MS")?.unwrap_or(0));
        config.timeout =
            Duration::from_millis(parse_var::<u64>("APP_ANALYSIS_TIMEOUT_MS")?.unwrap_or(10_000));
        config.decode_limits = DecodeLimits {
            max_bytes: parse_var::<usize>("APP_MAX_UPLOAD_BYTES")?
                .unwrap_or(DEFAULT_MAX_UPLOAD_BYTES),
            max_dimension: parse_var::<u32>("APP_MAX_IMAGE_DIMENSION")?
                .unwrap_or(DEFAULT_MAX_DIMENSION),
        };
        config.catalog_csv = env::var("APP_CATALOG_CSV")
            .ok()
            .filter(|raw| !raw.trim().is_empty())
            .map(PathBuf::from);

        Ok(config)
    }
}

fn parse_var<T: FromStr>(key: &'static str) -> Result<Option<T>, ConfigError> {
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue { key, value: raw }),
        Err(_) => Ok(None),
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidValue { key: &'static str, value: String },
    UnknownProfile(String),
    UnknownScorer(String),
    Policy(PolicyMisconfiguration),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidValue { key, value } => {
                write!(f, "{key} has an invalid value '{value}'")
            }
            ConfigError::UnknownProfile(value) => write!(
                f,
                "APP_POLICY '{value}' is not one of: standard, healthy_biased"
            ),
            ConfigError::UnknownScorer(value) => {
                write!(f, "APP_SCORER '{value}' is not one of: demo, model")
            }
            ConfigError::Policy(err) => write!(f, "policy misconfiguration: {err}"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::Policy(err) => Some(err),
            ConfigError::InvalidPort
            | ConfigError::InvalidValue { .. }
            | ConfigError::UnknownProfile(_)
            | ConfigError::UnknownScorer(_) => None,
        }
    }
}

impl From<PolicyMisconfiguration> for ConfigError {
    fn from(value: PolicyMisconfiguration) -> Self {
        Self::Policy(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::{Mutex, OnceLock};

    fn env_guard() -> &'static Mutex<()> {
        static GUARD: OnceLock<Mutex<()>> = OnceLock::new();
        GUARD.get_or_init(|| Mutex::new(()))
    }

    fn reset_env() {
        for key in [
            "APP_ENV",
            "APP_HOST",
            "APP_PORT",
            "APP_LOG_LEVEL",
            "APP_POLICY",
            "APP_LOWER_THRESHOLD",
            "APP_UPPER_THRESHOLD",
            "APP_SAMPLE_MIN",
            "APP_SAMPLE_MAX",
            "APP_SCORER",
            "APP_SEED",
            "APP_SIMULATED_LATENCY_MS",
            "APP_ANALYSIS_TIMEOUT_MS",
            "APP_MAX_UPLOAD_BYTES",
            "APP_MAX_IMAGE_DIMENSION",
            "APP_CATALOG_CSV",
            "APP_MAX_SESSIONS",
            "APP_SESSION_IDLE_SECS",
        ] {
            env::remove_var(key);
        }
    }

    #[test]
    fn load_uses_defaults_when_env_missing() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        let config = AppConfig::load().expect("config loads with defaults");
        assert_eq!(config.environment, AppEnvironment::Development);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.telemetry.log_level, "info");
        assert_eq!(config.analysis.profile, PolicyProfile::Standard);
        assert_eq!(config.analysis.policy, ThresholdPolicy::standard());
        assert_eq!(config.analysis.sampling.min(), 0.20);
        assert_eq!(config.analysis.scorer, ScorerKind::Demo);
        assert_eq!(config.analysis.simulated_latency, Duration::ZERO);
        assert!(config.analysis.catalog_csv.is_none());
        assert_eq!(config.sessions, SessionConfig::default());
    }

    #[test]
    fn session_limits_come_from_env() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_MAX_SESSIONS", "8");
        env::set_var("APP_SESSION_IDLE_SECS", "90");
        let config = AppConfig::load().expect("config loads");
        env::set_var("APP_MAX_SESSIONS", "0");
        let err = AppConfig::load().expect_err("zero sessions rejected");
        reset_env();

        assert_eq!(config.sessions.max_sessions, 8);
        assert_eq!(config.sessions.idle_ttl, Duration::from_secs(90));
        assert!(err.to_string().contains("APP_MAX_SESSIONS"));
    }

    #[test]
    fn accepts_localhost_host() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_HOST", "localhost");
        let config = AppConfig::load().expect("config loads");
        let addr = config.server.socket_addr().expect("localhost resolves");
        assert_eq!(addr, SocketAddr::new(IpAddr::from([127, 0, 0, 1]), 3000));
        reset_env();
    }

    #[test]
    fn healthy_profile_with_overrides() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_POLICY", "healthy_biased");
        env::set_var("APP_UPPER_THRESHOLD", "0.9");
        env::set_var("APP_SEED", "17");
        env::set_var("APP_SIMULATED_LATENCY_MS", "2000");
        let config = AppConfig::load().expect("config loads");
        reset_env();

        assert_eq!(config.analysis.profile, PolicyProfile::HealthyBiased);
        assert_eq!(config.analysis.policy.lower(), 0.60);
        assert_eq!(config.analysis.policy.upper(), 0.9);
        assert_eq!(config.analysis.sampling.min(), 0.70);
        assert_eq!(config.analysis.seed, Some(17));
        assert_eq!(config.analysis.simulated_latency, Duration::from_secs(2));
    }

    #[test]
    fn inverted_thresholds_fail_at_load() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_LOWER_THRESHOLD", "0.8");
        env::set_var("APP_UPPER_THRESHOLD", "0.4");
        let err = AppConfig::load().expect_err("inverted thresholds rejected");
        reset_env();

        assert!(matches!(
            err,
            ConfigError::Policy(PolicyMisconfiguration::InvertedThresholds { .. })
        ));
    }

    #[test]
    fn invalid_numbers_name_their_key() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_MAX_UPLOAD_BYTES", "lots");
        let err = AppConfig::load().expect_err("bad number rejected");
        reset_env();

        assert!(err.to_string().contains("APP_MAX_UPLOAD_BYTES"));
    }

    #[test]
    fn unknown_profile_is_rejected() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_POLICY", "pessimistic");
        let err = AppConfig::load().expect_err("unknown profile");
        reset_env();

        assert!(matches!(err, ConfigError::UnknownProfile(value) if value == "pessimistic"));
    }
}
