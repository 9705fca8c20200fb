//! Prometheus metrics setup and metric definitions

use anyhow::Context;
use metrics::{counter, describe_counter, describe_histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

pub const EMAIL_MESSAGES_TOTAL: &str = "cartelia_email_messages_total";
pub const EMAIL_QUOTA_REJECTIONS_TOTAL: &str = "cartelia_email_quota_rejections_total";
pub const EMAIL_QUOTA_RESETS_TOTAL: &str = "cartelia_email_quota_resets_total";
pub const HTTP_REQUESTS_TOTAL: &str = "cartelia_http_requests_total";
pub const HTTP_REQUEST_DURATION_SECONDS: &str = "cartelia_http_request_duration_seconds";

/// Install the Prometheus recorder and return a handle for rendering metrics.
pub fn install_prometheus_recorder() -> anyhow::Result<PrometheusHandle> {
    let buckets = vec![
        0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
    ];

    PrometheusBuilder::new()
        .set_buckets(&buckets)
        .context("failed to set histogram buckets")?
        .install_recorder()
        .context("failed to install Prometheus recorder")
}

/// Register metric descriptions and emit zero values so HELP/TYPE lines
/// appear from startup.
pub fn describe_metrics() {
    describe_counter!(HTTP_REQUESTS_TOTAL, "Total number of HTTP requests");
    describe_histogram!(
        HTTP_REQUEST_DURATION_SECONDS,
        "HTTP request duration in seconds"
    );

    describe_counter!(
        EMAIL_MESSAGES_TOTAL,
        "Email delivery attempts per recipient by provider and result"
    );
    describe_counter!(
        EMAIL_QUOTA_REJECTIONS_TOTAL,
        "Send requests rejected because the daily quota was exhausted"
    );
    describe_counter!(
        EMAIL_QUOTA_RESETS_TOTAL,
        "Daily quota resets applied"
    );

    counter!(EMAIL_MESSAGES_TOTAL, "provider" => "cartelia_subdomain", "result" => "sent").absolute(0);
    counter!(EMAIL_QUOTA_REJECTIONS_TOTAL).absolute(0);
    counter!(EMAIL_QUOTA_RESETS_TOTAL).absolute(0);
}

/// Count delivery outcomes for one provider
pub fn record_deliveries(provider: &'static str, sent: usize, failed: usize) {
    if sent > 0 {
        counter!(EMAIL_MESSAGES_TOTAL, "provider" => provider, "result" => "sent")
            .increment(sent as u64);
    }
    if failed > 0 {
        counter!(EMAIL_MESSAGES_TOTAL, "provider" => provider, "result" => "failed")
            .increment(failed as u64);
    }
}

pub fn record_quota_rejection() {
    counter!(EMAIL_QUOTA_REJECTIONS_TOTAL).increment(1);
}

pub fn record_quota_reset() {
    counter!(EMAIL_QUOTA_RESETS_TOTAL).increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_without_recorder_is_noop() {
        record_deliveries("gmail", 2, 1);
        record_quota_rejection();
        record_quota_reset();
    }
}
