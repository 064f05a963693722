//! Per-domain health of the AI path.
//!
//! Each validation domain has its own circuit. Consecutive AI failures open
//! it, after which the engine serves the heuristic verdict without calling
//! the agent. Once `recoveryTimeout` has passed one trial call is let
//! through; `successThreshold` trial successes close the circuit again and a
//! trial failure reopens it.
//!
//! Every request the engine answered without AI is also tallied here, so
//! domain discovery can report how often a domain ran on heuristics alone.
//! Retry with backoff lives in [`crate::capability`].

use attest_core::ValidationDomain;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::time::{Duration, Instant};

use crate::config::human_duration;

/// Circuit thresholds, under `circuitBreaker` in the runtime config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CircuitBreakerConfig {
    /// Consecutive AI failures that open a domain's circuit.
    pub failure_threshold: u32,

    /// How long an open circuit skips the agent, e.g. "30s".
    #[serde(with = "human_duration")]
    pub recovery_timeout: Duration,

    /// Trial successes that close a half-open circuit.
    pub success_threshold: u32,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 3,
            recovery_timeout: Duration::from_secs(30),
            success_threshold: 2,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    #[default]
    Closed,
    Open,
    HalfOpen,
}

impl CircuitState {
    pub fn as_str(&self) -> &'static str {
        match self {
            CircuitState::Closed => "closed",
            CircuitState::Open => "open",
            CircuitState::HalfOpen => "half_open",
        }
    }
}

impl fmt::Display for CircuitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether the engine may call a domain's agent right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Call,
    /// A recovery trial; its outcome decides whether the circuit closes.
    Trial,
    Skip { retry_in: Duration },
}

/// What discovery reports about a domain's AI path.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DomainHealth {
    pub state: CircuitState,
    pub consecutive_failures: u32,

    /// Requests answered by the heuristic verdict alone.
    pub fallbacks: u64,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_failure: Option<String>,
}

#[derive(Debug, Default)]
struct DomainCircuit {
    health: DomainHealth,
    opened_at: Option<Instant>,
    trial_successes: u32,
}

impl DomainCircuit {
    fn open(&mut self) {
        self.health.state = CircuitState::Open;
        self.opened_at = Some(Instant::now());
        self.trial_successes = 0;
    }
}

pub struct CircuitBreaker {
    config: CircuitBreakerConfig,
    domains: Mutex<HashMap<ValidationDomain, DomainCircuit>>,
}

impl CircuitBreaker {
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            config,
            domains: Mutex::new(HashMap::new()),
        }
    }

    /// Decide whether to call the agent. An open circuit past its recovery
    /// timeout moves to half-open here.
    pub fn admit(&self, domain: ValidationDomain) -> Admission {
        let mut domains = self.domains.lock();
        let circuit = domains.entry(domain).or_default();

        match circuit.health.state {
            CircuitState::Closed => Admission::Call,
            CircuitState::HalfOpen => Admission::Trial,
            CircuitState::Open => {
                let waited = circuit
                    .opened_at
                    .map_or(self.config.recovery_timeout, |at| at.elapsed());
                if waited >= self.config.recovery_timeout {
                    circuit.health.state = CircuitState::HalfOpen;
                    circuit.trial_successes = 0;
                    tracing::info!(domain = %domain, "AI circuit half-open, sending a trial request");
                    Admission::Trial
                } else {
                    Admission::Skip {
                        retry_in: self.config.recovery_timeout - waited,
                    }
                }
            }
        }
    }

    pub fn record_success(&self, domain: ValidationDomain) {
        let mut domains = self.domains.lock();
        let circuit = domains.entry(domain).or_default();
        circuit.health.consecutive_failures = 0;

        if circuit.health.state == CircuitState::HalfOpen {
            circuit.trial_successes += 1;
            if circuit.trial_successes >= self.config.success_threshold {
                circuit.health.state = CircuitState::Closed;
                circuit.health.last_failure = None;
                circuit.opened_at = None;
                tracing::info!(domain = %domain, "AI circuit closed");
            }
        }
    }

    /// Count an AI failure. `reason` is kept for discovery.
    pub fn record_failure(&self, domain: ValidationDomain, reason: &str) {
        let mut domains = self.domains.lock();
        let circuit = domains.entry(domain).or_default();
        circuit.health.consecutive_failures += 1;
        circuit.health.last_failure = Some(reason.to_string());

        let failures = circuit.health.consecutive_failures;
        let trip = match circuit.health.state {
            CircuitState::HalfOpen => true,
            CircuitState::Closed => failures >= self.config.failure_threshold,
            CircuitState::Open => false,
        };
        if trip {
            circuit.open();
            tracing::warn!(domain = %domain, failures, reason, "AI circuit opened");
        }
    }

    /// Count a request served without AI.
    pub fn record_fallback(&self, domain: ValidationDomain) {
        self.domains.lock().entry(domain).or_default().health.fallbacks += 1;
    }

    pub fn health(&self, domain: ValidationDomain) -> DomainHealth {
        self.domains
            .lock()
            .get(&domain)
            .map(|circuit| circuit.health.clone())
            .unwrap_or_default()
    }
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::new(CircuitBreakerConfig::default())
    }
}

impl fmt::Debug for CircuitBreaker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let open: Vec<ValidationDomain> = self
            .domains
            .lock()
            .iter()
            .filter(|(_, circuit)| circuit.health.state != CircuitState::Closed)
            .map(|(domain, _)| *domain)
            .collect();
        f.debug_struct("CircuitBreaker")
            .field("config", &self.config)
            .field("not_closed", &open)
            .finish()
    }
}
