use prometheus_client::{
    encoding::EncodeLabelSet,
    metrics::{counter::Counter, family::Family, gauge::Gauge},
    registry::Registry,
};
use std::sync::Arc;

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct RequestLabels {
    pub route: String,
    pub method: String,
    pub status: String,
}

#[derive(Default, Debug, Clone)]
pub struct HttpMetrics {
    pub requests_total: Family<RequestLabels, Counter>,
}

#[derive(Default, Debug, Clone)]
pub struct Metrics {
    pub registry: Arc<Registry>,
    pub http: HttpMetrics,
    pub users_current: Gauge,
}

impl Metrics {
    pub fn new() -> Self {
        let mut registry = Registry::default();
        let http = HttpMetrics::default();
        let users_current = Gauge::default();

        registry.register(
            "usersvc_http_requests_total",
            "Total HTTP requests handled",
            http.requests_total.clone(),
        );
        registry.register(
            "usersvc_users_current",
            "Users currently stored",
            users_current.clone(),
        );

        Metrics {
            registry: Arc::new(registry),
            http,
            users_current,
        }
    }

    pub fn record_request(&self, route: &str, method: &str, status: u16) {
        self.http
            .requests_total
            .get_or_create(&RequestLabels {
                route: route.to_string(),
                method: method.to_string(),
                status: status.to_string(),
            })
            .inc();
    }
}
