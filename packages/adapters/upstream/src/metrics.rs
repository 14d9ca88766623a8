use ::metrics::{
    RegistersMetrics,
    prometheus::{IntCounterVec, Opts, core::Collector},
};

#[derive(Clone)]
pub struct Metrics {
    pub upstream_request_errors: IntCounterVec,
}

impl RegistersMetrics for Metrics {
    fn metrics(&self) -> Vec<Box<dyn Collector>> {
        vec![Box::new(self.upstream_request_errors.clone())]
    }
}

impl Metrics {
    /// `upstream` becomes a constant label so that every client can register
    /// its own counter in the same registry.
    pub fn new(upstream: &str) -> Self {
        let upstream_request_errors = IntCounterVec::new(
            Opts::new(
                "upstream_request_errors",
                "Number of failed requests against an upstream endpoint.",
            )
            .const_label("upstream", upstream),
            &["endpoint"],
        )
        .expect("upstream_request_errors metric to be correctly configured");

        Self {
            upstream_request_errors,
        }
    }
}
