use std::time::Duration;

use composer_input::SubmitPolicy;
use serde::{Deserialize, Serialize};

/// Every wait and bound the delivery pipeline observes, in milliseconds.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DeliveryTimings {
    pub readiness_timeout_ms: u64,
    pub readiness_poll_ms: u64,
    pub search_max_tries: u32,
    pub search_interval_ms: u64,
    pub pre_submit_delay_ms: u64,
    pub affordance_poll_ms: u64,
    pub affordance_wait_ms: u64,
    pub retry_delay_ms: u64,
    pub fallback_delay_ms: u64,
    pub debounce_window_ms: u64,
}

impl Default for DeliveryTimings {
    fn default() -> Self {
        Self {
            readiness_timeout_ms: 20_000,
            readiness_poll_ms: 250,
            search_max_tries: 40,
            search_interval_ms: 200,
            pre_submit_delay_ms: 150,
            affordance_poll_ms: 200,
            affordance_wait_ms: 2_000,
            retry_delay_ms: 1_200,
            fallback_delay_ms: 1_200,
            debounce_window_ms: 10_000,
        }
    }
}

impl DeliveryTimings {
    pub fn readiness_timeout(&self) -> Duration {
        Duration::from_millis(self.readiness_timeout_ms)
    }

    pub fn readiness_poll(&self) -> Duration {
        Duration::from_millis(self.readiness_poll_ms)
    }

    pub fn search_interval(&self) -> Duration {
        Duration::from_millis(self.search_interval_ms)
    }

    pub fn pre_submit_delay(&self) -> Duration {
        Duration::from_millis(self.pre_submit_delay_ms)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn fallback_delay(&self) -> Duration {
        Duration::from_millis(self.fallback_delay_ms)
    }

    pub fn debounce_window(&self) -> Duration {
        Duration::from_millis(self.debounce_window_ms)
    }

    /// Longest a single automaton run can keep searching.
    pub fn search_window(&self) -> Duration {
        self.search_interval() * self.search_max_tries
    }

    pub fn submit_policy(&self) -> SubmitPolicy {
        SubmitPolicy {
            poll_interval: Duration::from_millis(self.affordance_poll_ms),
            max_wait: Duration::from_millis(self.affordance_wait_ms),
            ..SubmitPolicy::default()
        }
    }

    /// Problems that would make the pipeline spin or never wait.
    pub fn problems(&self) -> Vec<String> {
        let mut problems = Vec::new();
        let positive = [
            ("readiness_timeout_ms", self.readiness_timeout_ms),
            ("readiness_poll_ms", self.readiness_poll_ms),
            ("search_interval_ms", self.search_interval_ms),
            ("affordance_poll_ms", self.affordance_poll_ms),
            ("debounce_window_ms", self.debounce_window_ms),
        ];
        for (name, value) in positive {
            if value == 0 {
                problems.push(format!("timings.{name} must be greater than zero"));
            }
        }
        if self.search_max_tries == 0 {
            problems.push("timings.search_max_tries must be at least 1".to_string());
        }
        if self.readiness_poll_ms > self.readiness_timeout_ms {
            problems.push("timings.readiness_poll_ms exceeds readiness_timeout_ms".to_string());
        }
        problems
    }
}
