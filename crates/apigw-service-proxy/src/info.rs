//! Post-deploy endpoint listing.

use std::fmt::Write as _;

use apigw_service_proxy_core::NormalizedEvent;

/// Base URL of a deployed stage.
#[must_use]
pub fn service_endpoint(rest_api_id: &str, region: &str, stage: &str) -> String {
    format!("https://{rest_api_id}.execute-api.{region}.amazonaws.com/{stage}")
}

/// `service proxies:` followed by one `  METHOD - <url>` line per event.
#[must_use]
pub fn endpoint_report(events: &[NormalizedEvent], service_endpoint: &str) -> String {
    let mut report = String::from("service proxies:");
    let base = service_endpoint.trim_end_matches('/');
    for event in events {
        let _ = write!(
            report,
            "\n  {} - {base}/{}",
            event.http.method.as_upper(),
            event.http.path
        );
    }
    report
}
