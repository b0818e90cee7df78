use prometheus::{HistogramOpts, HistogramVec, IntCounterVec, IntGaugeVec, Opts};

lazy_static::lazy_static! {
    pub static ref RECONCILE_TOTAL: IntCounterVec = prometheus::register_int_counter_vec!(
        Opts::new(
            "stream_operator_reconcile_total",
            "Total number of reconciliations"
        ),
        &["result"]
    )
    .unwrap();

    pub static ref RECONCILE_DURATION: HistogramVec = prometheus::register_histogram_vec!(
        HistogramOpts::new(
            "stream_operator_reconcile_duration_seconds",
            "Duration of reconciliations in seconds"
        ),
        &["result"]
    )
    .unwrap();

    pub static ref API_CALLS_TOTAL: IntCounterVec = prometheus::register_int_counter_vec!(
        Opts::new(
            "stream_operator_api_calls_total",
            "Total number of calls to the stream service"
        ),
        &["operation", "outcome"]
    )
    .unwrap();

    pub static ref API_CALL_DURATION: HistogramVec = prometheus::register_histogram_vec!(
        HistogramOpts::new(
            "stream_operator_api_call_duration_seconds",
            "Duration of calls to the stream service in seconds"
        ),
        &["operation"]
    )
    .unwrap();

    pub static ref MUTATIONS_TOTAL: IntCounterVec = prometheus::register_int_counter_vec!(
        Opts::new(
            "stream_operator_mutations_total",
            "Total number of remote mutations applied"
        ),
        &["operation", "namespace"]
    )
    .unwrap();

    pub static ref MANAGED_STREAMS: IntGaugeVec = prometheus::register_int_gauge_vec!(
        Opts::new(
            "stream_operator_managed_streams",
            "Number of managed streams per namespace"
        ),
        &["namespace"]
    )
    .unwrap();
}

pub fn increment_reconcile_total(result: &str) {
    RECONCILE_TOTAL.with_label_values(&[result]).inc();
}

pub fn observe_reconcile_duration(result: &str, duration_secs: f64) {
    RECONCILE_DURATION
        .with_label_values(&[result])
        .observe(duration_secs);
}

pub fn increment_api_calls(operation: &str, outcome: &str) {
    API_CALLS_TOTAL
        .with_label_values(&[operation, outcome])
        .inc();
}

pub fn observe_api_call_duration(operation: &str, duration_secs: f64) {
    API_CALL_DURATION
        .with_label_values(&[operation])
        .observe(duration_secs);
}

pub fn increment_mutations(operation: &str, namespace: &str) {
    MUTATIONS_TOTAL
        .with_label_values(&[operation, namespace])
        .inc();
}

pub fn set_managed_streams(namespace: &str, count: i64) {
    MANAGED_STREAMS.with_label_values(&[namespace]).set(count);
}
