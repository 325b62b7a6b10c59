use crate::models::{CoreWebVitals, ExpectedMetrics};

pub const LCP_RECOMMENDATION: &str = "Improve LCP: lazy-load non-critical images";
pub const FID_RECOMMENDATION: &str = "Improve FID: reduce JavaScript blocking";
pub const CLS_RECOMMENDATION: &str = "Improve CLS: reserve image dimensions up front";
pub const TTFB_RECOMMENDATION: &str = "Improve TTFB: serve from a CDN closer to users";
pub const FCP_RECOMMENDATION: &str = "Improve FCP: reduce render-blocking CSS";

/// Per-metric checks in enumeration order. TBT is measured but has no
/// threshold, so it neither fails a run nor produces a recommendation.
fn checks(
    actual: &CoreWebVitals,
    expected: &ExpectedMetrics,
) -> [(bool, &'static str); 5] {
    [
        (actual.lcp <= expected.lcp, LCP_RECOMMENDATION),
        (actual.fid <= expected.fid, FID_RECOMMENDATION),
        (actual.cls <= expected.cls, CLS_RECOMMENDATION),
        (actual.ttfb <= expected.ttfb, TTFB_RECOMMENDATION),
        (actual.fcp <= expected.fcp, FCP_RECOMMENDATION),
    ]
}

/// Passes only when all five thresholded metrics are at or under their limit.
pub fn evaluate_metrics(actual: &CoreWebVitals, expected: &ExpectedMetrics) -> bool {
    checks(actual, expected).iter().all(|(within, _)| *within)
}

pub fn generate_recommendations(
    actual: &CoreWebVitals,
    expected: &ExpectedMetrics,
) -> Vec<String> {
    checks(actual, expected)
        .into_iter()
        .filter(|(within, _)| !within)
        .map(|(_, recommendation)| recommendation.to_string())
        .collect()
}
