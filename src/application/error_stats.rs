use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing::warn;

/// Thresholds for the rolling-window error signal. A component without
/// an explicit threshold uses the default.
#[derive(Debug, Clone)]
pub struct ErrorRateConfig {
    pub window: Duration,
    pub default_threshold: usize,
    pub component_thresholds: HashMap<String, usize>,
}

impl Default for ErrorRateConfig {
    fn default() -> Self {
        Self {
            window: Duration::from_secs(60),
            default_threshold: 10,
            component_thresholds: HashMap::new(),
        }
    }
}

impl ErrorRateConfig {
    pub fn with_threshold(mut self, component: &str, threshold: usize) -> Self {
        self.component_thresholds
            .insert(component.to_string(), threshold);
        self
    }

    fn threshold_for(&self, component: &str) -> usize {
        self.component_thresholds
            .get(component)
            .copied()
            .unwrap_or(self.default_threshold)
    }
}

/// Counts errors per logical component over a rolling window and warns
/// when a component crosses its threshold. Pure observability: callers
/// never branch on it.
pub struct ErrorRateTracker {
    config: ErrorRateConfig,
    samples: Mutex<HashMap<String, Vec<Instant>>>,
}

impl ErrorRateTracker {
    pub fn new(config: ErrorRateConfig) -> Self {
        Self {
            config,
            samples: Mutex::new(HashMap::new()),
        }
    }

    pub fn record(&self, component: &str, error: &dyn std::fmt::Display) {
        let now = Instant::now();
        let mut samples = match self.samples.lock() {
            Ok(guard) => guard,
            // A poisoned tracker must never take the engine down with it.
            Err(poisoned) => poisoned.into_inner(),
        };
        let window = self.config.window;
        let entry = samples.entry(component.to_string()).or_default();
        entry.retain(|t| now.duration_since(*t) <= window);
        entry.push(now);

        let count = entry.len();
        let threshold = self.config.threshold_for(component);
        if count == threshold {
            warn!(
                component,
                count,
                threshold,
                window_secs = window.as_secs(),
                "component error rate crossed threshold"
            );
        }
        tracing::debug!(component, %error, "error recorded");
    }

    /// Errors observed for `component` within the current window.
    pub fn count(&self, component: &str) -> usize {
        let now = Instant::now();
        let mut samples = match self.samples.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        match samples.get_mut(component) {
            Some(entry) => {
                entry.retain(|t| now.duration_since(*t) <= self.config.window);
                entry.len()
            }
            None => 0,
        }
    }

    pub fn is_flagged(&self, component: &str) -> bool {
        self.count(component) >= self.config.threshold_for(component)
    }
}

impl Default for ErrorRateTracker {
    fn default() -> Self {
        Self::new(ErrorRateConfig::default())
    }
}
