use lazy_static::lazy_static;
use prometheus::{core::Collector, IntCounter, IntCounterVec, Opts, Registry};
use tracing::error;

lazy_static! {
    static ref INJECTIONS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("promptcast_injections_total", "Automaton runs by terminal state"),
        &["state"]
    )
    .expect("valid metric definition");
    static ref SESSIONS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("promptcast_sessions_total", "Destination sessions by how they were obtained"),
        &["result"]
    )
    .expect("valid metric definition");
    static ref DELIVERIES_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("promptcast_deliveries_total", "Coordinated deliveries by outcome"),
        &["result"]
    )
    .expect("valid metric definition");
    static ref BRANCHES_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("promptcast_fanout_branches_total", "Fan-out branches by outcome"),
        &["result"]
    )
    .expect("valid metric definition");
    static ref BACKSTOPS_TOTAL: IntCounter = IntCounter::new(
        "promptcast_backstop_attempts_total",
        "Second attempts scheduled after a failed first attempt"
    )
    .expect("valid metric definition");
}

fn register<C>(registry: &Registry, collector: C)
where
    C: Collector + Clone + Send + Sync + 'static,
{
    if let Err(err) = registry.register(Box::new(collector.clone())) {
        if !matches!(err, prometheus::Error::AlreadyReg) {
            error!(?err, "failed to register delivery metric");
        }
    }
}

pub fn register_metrics(registry: &Registry) {
    register(registry, INJECTIONS_TOTAL.clone());
    register(registry, SESSIONS_TOTAL.clone());
    register(registry, DELIVERIES_TOTAL.clone());
    register(registry, BRANCHES_TOTAL.clone());
    register(registry, BACKSTOPS_TOTAL.clone());
}

pub fn record_injection(state: &str) {
    INJECTIONS_TOTAL.with_label_values(&[state]).inc();
}

pub fn record_session(result: &str) {
    SESSIONS_TOTAL.with_label_values(&[result]).inc();
}

pub fn record_delivery(result: &str) {
    DELIVERIES_TOTAL.with_label_values(&[result]).inc();
}

pub fn record_branch(result: &str) {
    BRANCHES_TOTAL.with_label_values(&[result]).inc();
}

pub fn record_backstop() {
    BACKSTOPS_TOTAL.inc();
}
