//! Prometheus metrics for the retrieval engine
//!
//! Each [`RetrievalMetrics`] owns its own registry so that independent
//! knowledge bases in one process never share counters.

use prometheus::{Counter, Encoder, Gauge, Histogram, HistogramOpts, Opts, Registry, TextEncoder};

/// Search, ingestion and embedding metrics for one knowledge base
pub struct RetrievalMetrics {
    registry: Registry,

    /// Total number of search requests
    pub search_requests: Counter,
    /// Search request latency in seconds
    pub search_latency: Histogram,
    /// Number of search results returned per request
    pub search_results: Histogram,
    /// Hybrid searches answered from a single surviving sub-search
    pub degraded_searches: Counter,

    /// Documents currently held by the store
    pub documents: Gauge,
    /// Time to ingest one batch in seconds
    pub ingest_latency: Histogram,

    /// Total embedding provider calls
    pub embedding_requests: Counter,
    /// Embedding provider call latency in seconds
    pub embedding_latency: Histogram,
    /// Embedding calls that failed and were retried
    pub embedding_retries: Counter,
}

impl RetrievalMetrics {
    /// Create and register all metrics in a fresh registry
    pub fn new() -> Self {
        let registry = Registry::new();

        let search_requests = Counter::with_opts(Opts::new(
            "docrag_search_requests_total",
            "Total number of search requests",
        ))
        .expect("Failed to create search_requests counter");

        let search_latency = Histogram::with_opts(
            HistogramOpts::new(
                "docrag_search_latency_seconds",
                "Search request latency in seconds",
            )
            .buckets(vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5]),
        )
        .expect("Failed to create search_latency histogram");

        let search_results = Histogram::with_opts(
            HistogramOpts::new(
                "docrag_search_results_count",
                "Number of search results returned per request",
            )
            .buckets(vec![0.0, 1.0, 5.0, 10.0, 20.0, 50.0]),
        )
        .expect("Failed to create search_results histogram");

        let degraded_searches = Counter::with_opts(Opts::new(
            "docrag_degraded_searches_total",
            "Hybrid searches answered from a single sub-search",
        ))
        .expect("Failed to create degraded_searches counter");

        let documents = Gauge::with_opts(Opts::new(
            "docrag_documents_total",
            "Documents currently held by the store",
        ))
        .expect("Failed to create documents gauge");

        let ingest_latency = Histogram::with_opts(
            HistogramOpts::new(
                "docrag_ingest_duration_seconds",
                "Time to ingest one batch in seconds",
            )
            .buckets(vec![0.01, 0.1, 0.5, 1.0, 5.0, 10.0, 30.0, 60.0]),
        )
        .expect("Failed to create ingest_latency histogram");

        let embedding_requests = Counter::with_opts(Opts::new(
            "docrag_embedding_requests_total",
            "Total embedding provider calls",
        ))
        .expect("Failed to create embedding_requests counter");

        let embedding_latency = Histogram::with_opts(
            HistogramOpts::new(
                "docrag_embedding_latency_seconds",
                "Embedding provider call latency in seconds",
            )
            .buckets(vec![0.01, 0.05, 0.1, 0.5, 1.0, 2.0, 5.0]),
        )
        .expect("Failed to create embedding_latency histogram");

        let embedding_retries = Counter::with_opts(Opts::new(
            "docrag_embedding_retries_total",
            "Embedding calls that failed and were retried",
        ))
        .expect("Failed to create embedding_retries counter");

        let metrics = Self {
            registry,
            search_requests,
            search_latency,
            search_results,
            degraded_searches,
            documents,
            ingest_latency,
            embedding_requests,
            embedding_latency,
            embedding_retries,
        };
        metrics.register_all();
        metrics
    }

    fn register_all(&self) {
        // Names are unique within a fresh registry, so registration cannot collide
        let collectors: Vec<Box<dyn prometheus::core::Collector>> = vec![
            Box::new(self.search_requests.clone()),
            Box::new(self.search_latency.clone()),
            Box::new(self.search_results.clone()),
            Box::new(self.degraded_searches.clone()),
            Box::new(self.documents.clone()),
            Box::new(self.ingest_latency.clone()),
            Box::new(self.embedding_requests.clone()),
            Box::new(self.embedding_latency.clone()),
            Box::new(self.embedding_retries.clone()),
        ];
        for collector in collectors {
            self.registry
                .register(collector)
                .expect("Failed to register retrieval metric");
        }
    }

    /// Record a completed search
    pub fn observe_search(&self, elapsed_secs: f64, results: usize) {
        self.search_requests.inc();
        self.search_latency.observe(elapsed_secs);
        self.search_results.observe(results as f64);
    }

    /// The registry holding these metrics, for embedding into an exporter
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Gather all metrics and encode them in Prometheus text format
    ///
    /// Returns an empty string if encoding fails.
    pub fn gather_text(&self) -> String {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();

        if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
            tracing::error!("Failed to encode metrics: {}", e);
            return String::new();
        }

        String::from_utf8(buffer).unwrap_or_else(|e| {
            tracing::error!("Metrics contained invalid UTF-8: {}", e);
            String::new()
        })
    }

    /// Current values in a human-readable form
    pub fn snapshot(&self) -> MetricSnapshot {
        let avg = |h: &Histogram| {
            let count = h.get_sample_count();
            if count == 0 {
                0.0
            } else {
                h.get_sample_sum() / count as f64
            }
        };

        MetricSnapshot {
            search_requests_total: self.search_requests.get(),
            search_latency_avg: avg(&self.search_latency),
            search_results_avg: avg(&self.search_results),
            degraded_searches_total: self.degraded_searches.get(),
            documents: self.documents.get(),
            embedding_requests_total: self.embedding_requests.get(),
            embedding_retries_total: self.embedding_retries.get(),
        }
    }
}

impl Default for RetrievalMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time copy of the metric values
#[derive(Debug, Clone, PartialEq)]
pub struct MetricSnapshot {
    pub search_requests_total: f64,
    pub search_latency_avg: f64,
    pub search_results_avg: f64,
    pub degraded_searches_total: f64,
    pub documents: f64,
    pub embedding_requests_total: f64,
    pub embedding_retries_total: f64,
}
