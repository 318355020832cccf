use prometheus::{
    Encoder, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder,
};

#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    pub assignments_total: IntCounterVec,
    pub assignment_latency_seconds: HistogramVec,
    pub unassigned_bookings: IntGauge,
    pub payments_completed_total: IntCounterVec,
    pub earnings_rebuilds_total: IntCounter,
}

impl Metrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let assignments_total = IntCounterVec::new(
            Opts::new("assignments_total", "Total assignment attempts by outcome"),
            &["outcome"],
        )
        .expect("valid assignments_total metric");

        let assignment_latency_seconds = HistogramVec::new(
            prometheus::HistogramOpts::new(
                "assignment_latency_seconds",
                "Latency of assignment processing in seconds",
            ),
            &["outcome"],
        )
        .expect("valid assignment_latency_seconds metric");

        let unassigned_bookings =
            IntGauge::new("unassigned_bookings", "Bookings currently without a cleaner")
                .expect("valid unassigned_bookings metric");

        let payments_completed_total = IntCounterVec::new(
            Opts::new("payments_completed_total", "Completed payments by method"),
            &["method"],
        )
        .expect("valid payments_completed_total metric");

        let earnings_rebuilds_total =
            IntCounter::new("earnings_rebuilds_total", "Earnings summary rebuilds")
                .expect("valid earnings_rebuilds_total metric");

        registry
            .register(Box::new(assignments_total.clone()))
            .expect("register assignments_total");
        registry
            .register(Box::new(assignment_latency_seconds.clone()))
            .expect("register assignment_latency_seconds");
        registry
            .register(Box::new(unassigned_bookings.clone()))
            .expect("register unassigned_bookings");
        registry
            .register(Box::new(payments_completed_total.clone()))
            .expect("register payments_completed_total");
        registry
            .register(Box::new(earnings_rebuilds_total.clone()))
            .expect("register earnings_rebuilds_total");

        Self {
            registry,
            assignments_total,
            assignment_latency_seconds,
            unassigned_bookings,
            payments_completed_total,
            earnings_rebuilds_total,
        }
    }

    pub fn encode(&self) -> Result<String, String> {
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();

        TextEncoder::new()
            .encode(&metric_families, &mut buffer)
            .map_err(|err| format!("failed to encode metrics: {err}"))?;

        String::from_utf8(buffer).map_err(|err| format!("metrics are not valid utf8: {err}"))
    }
}
