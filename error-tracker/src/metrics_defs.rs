//! Metrics definitions for the error tracker.

use shared::metrics_defs::{MetricDef, MetricType};

pub const REPORTS_FORWARDED: MetricDef = MetricDef {
    name: "reports.forwarded",
    metric_type: MetricType::Counter,
    description: "Reports written to the log sink. Tagged with rule, severity.",
};

pub const REPORTS_THROTTLED: MetricDef = MetricDef {
    name: "reports.throttled",
    metric_type: MetricType::Counter,
    description: "Reports sampled out. Tagged with rule.",
};

pub const REPORTS_DROPPED: MetricDef = MetricDef {
    name: "reports.dropped",
    metric_type: MetricType::Counter,
    description: "Reports from internal test builds that were discarded",
};

pub const REPORTS_REJECTED: MetricDef = MetricDef {
    name: "reports.rejected",
    metric_type: MetricType::Counter,
    description: "Malformed reports answered with 400",
};

pub const REPORTS_FORWARD_FAILED: MetricDef = MetricDef {
    name: "reports.forward_failed",
    metric_type: MetricType::Counter,
    description: "Reports the log sink failed to write. Tagged with sink.",
};

pub const REQUEST_DURATION: MetricDef = MetricDef {
    name: "request.duration",
    metric_type: MetricType::Histogram,
    description: "Request duration in seconds. Tagged with status.",
};

pub const ALL_METRICS: &[MetricDef] = &[
    REPORTS_FORWARDED,
    REPORTS_THROTTLED,
    REPORTS_DROPPED,
    REPORTS_REJECTED,
    REPORTS_FORWARD_FAILED,
    REQUEST_DURATION,
];
