//! Decides whether an error report is forwarded, and how it is labelled.

use crate::errors::ReportError;
use crate::report::{ErrorReport, RuntimeKind};
use crate::sampler::RandomSource;
use serde::Serialize;
use std::fmt;

const CDN_PREFIX: &str = "https://cdn.ampproject.org/";
const CDN_SUBDOMAIN: &str = ".cdn.ampproject.org/";
const FRAME_DOMAIN: &str = ".ampproject.net/";

/// Assertion errors are sampled this many times less often than other errors.
const ASSERTION_RATE_DIVISOR: f64 = 10.0;

/// Whether the referrer is a page served from the AMP cache or its frames
pub fn is_from_cdn(referrer: &str) -> bool {
    referrer.starts_with(CDN_PREFIX)
        || referrer.contains(CDN_SUBDOMAIN)
        || referrer.contains(FRAME_DOMAIN)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Info,
    Error,
}

impl Severity {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "INFO",
            Severity::Error => "ERROR",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The report properties the throttle table looks at
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TrafficFlags {
    pub is_canary: bool,
    pub is_third_party: bool,
    pub is_from_cdn: bool,
    pub is_assertion: bool,
}

pub struct ThrottleRule {
    pub name: &'static str,
    pub matches: fn(&TrafficFlags) -> bool,
    pub rate: f64,
}

/// Evaluated top to bottom; the first matching rule sets the base rate.
pub const THROTTLE_RULES: &[ThrottleRule] = &[
    ThrottleRule {
        name: "canary",
        matches: TrafficFlags::canary,
        rate: 1.0,
    },
    ThrottleRule {
        name: "3p",
        matches: TrafficFlags::third_party,
        rate: 0.1,
    },
    ThrottleRule {
        name: "cdn",
        matches: TrafficFlags::cdn,
        rate: 0.1,
    },
    ThrottleRule {
        name: "default",
        matches: TrafficFlags::any,
        rate: 0.01,
    },
];

impl TrafficFlags {
    fn canary(&self) -> bool {
        self.is_canary
    }

    fn third_party(&self) -> bool {
        self.is_third_party
    }

    fn cdn(&self) -> bool {
        self.is_from_cdn
    }

    fn any(&self) -> bool {
        true
    }
}

/// Returns the matching rule name and the effective forwarding probability
pub fn throttle_rate(flags: &TrafficFlags) -> (&'static str, f64) {
    let (name, rate) = THROTTLE_RULES
        .iter()
        .find(|rule| (rule.matches)(flags))
        .map(|rule| (rule.name, rule.rate))
        .unwrap_or(("default", 0.01));

    if flags.is_assertion {
        (name, rate / ASSERTION_RATE_DIVISOR)
    } else {
        (name, rate)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Classification {
    /// Category, e.g. `assert-cdn-3p-canary`
    pub label: String,
    /// Category followed by the raw runtime version, e.g. `default-cdn-inabox-1.0`
    pub version: String,
    pub severity: Severity,
    pub flags: TrafficFlags,
    pub rule: &'static str,
    pub throttle_rate: f64,
}

impl Classification {
    pub fn of(report: &ErrorReport) -> Self {
        let is_from_cdn = report.referrer.as_deref().is_some_and(is_from_cdn);
        let flags = TrafficFlags {
            is_canary: report.is_canary,
            is_third_party: report.is_third_party(),
            is_from_cdn,
            is_assertion: report.is_assertion,
        };

        let severity = if is_from_cdn || report.runtime == Some(RuntimeKind::Inabox) {
            Severity::Error
        } else {
            Severity::Info
        };

        let label = build_label(report, is_from_cdn);
        let version = format!("{label}-{}", report.version);
        let (rule, throttle_rate) = throttle_rate(&flags);

        Classification {
            label,
            version,
            severity,
            flags,
            rule,
            throttle_rate,
        }
    }
}

fn build_label(report: &ErrorReport, is_from_cdn: bool) -> String {
    let mut label = String::from(if report.is_assertion { "assert" } else { "default" });

    label.push_str(if is_from_cdn { "-cdn" } else { "-origin" });

    match &report.runtime {
        Some(runtime) => {
            label.push('-');
            label.push_str(runtime.as_str());
        }
        None if report.is_legacy_third_party => label.push_str("-3p"),
        None => label.push_str("-1p"),
    }

    if report.is_canary {
        label.push_str("-canary");
    }
    if report.is_expected {
        label.push_str("-expected");
    }
    label
}

#[derive(Clone, Debug, PartialEq)]
pub enum Decision {
    /// Internal test traffic, answered with no content
    Drop,
    /// Sampled out
    Throttled(Classification),
    Forward(Classification),
}

/// Classifies a report and samples it with one draw from `random`.
///
/// Nothing is drawn for dropped or rejected reports.
pub fn classify(report: &ErrorReport, random: &dyn RandomSource) -> Result<Decision, ReportError> {
    if report.is_internal_version() {
        return Ok(Decision::Drop);
    }
    if !report.has_content() {
        return Err(ReportError::MissingMessage);
    }

    let classification = Classification::of(report);
    let sample = random.draw();

    if sample <= classification.throttle_rate {
        Ok(Decision::Forward(classification))
    } else {
        Ok(Decision::Throttled(classification))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::INTERNAL_RUNTIME_VERSION;
    use crate::testutils::FixedDraw;
    use http::HeaderMap;

    fn report(query: &str) -> ErrorReport {
        ErrorReport::from_parts(&format!("/r?{query}").parse().unwrap(), &HeaderMap::new())
    }

    fn assert_rate(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-12,
            "expected rate {expected}, got {actual}"
        );
    }

    #[test]
    fn test_is_from_cdn() {
        assert!(is_from_cdn("https://cdn.ampproject.org/c/s/example.com"));
        assert!(is_from_cdn("https://example-com.cdn.ampproject.org/c/s"));
        assert!(is_from_cdn("https://d-123.ampproject.net/1.0/frame.html"));
        assert!(!is_from_cdn("http://cdn.ampproject.org/"));
        assert!(!is_from_cdn("https://example.com/?u=cdn.ampproject.org"));
        assert!(!is_from_cdn(""));
    }

    #[test]
    fn test_throttle_rule_priority() {
        let cases = [
            // canary, 3p, cdn, expected rule, rate
            (true, true, true, "canary", 1.0),
            (true, false, false, "canary", 1.0),
            (false, true, true, "3p", 0.1),
            (false, true, false, "3p", 0.1),
            (false, false, true, "cdn", 0.1),
            (false, false, false, "default", 0.01),
        ];

        for (is_canary, is_third_party, is_from_cdn, rule, rate) in cases {
            let flags = TrafficFlags {
                is_canary,
                is_third_party,
                is_from_cdn,
                is_assertion: false,
            };
            let (name, actual) = throttle_rate(&flags);
            assert_eq!(name, rule);
            assert_rate(actual, rate);

            let (name, actual) = throttle_rate(&TrafficFlags {
                is_assertion: true,
                ..flags
            });
            assert_eq!(name, rule);
            assert_rate(actual, rate / 10.0);
        }
    }

    #[test]
    fn test_label_order() {
        let c = Classification::of(&report("m=x"));
        assert_eq!(c.label, "default-origin-1p");

        let c = Classification::of(&report("m=x&3p=1"));
        assert_eq!(c.label, "default-origin-3p");

        let c = Classification::of(&report(
            "m=x&a=1&rt=3p&ca=1&ex=1&r=https%3A%2F%2Fcdn.ampproject.org%2Fx",
        ));
        assert_eq!(c.label, "assert-cdn-3p-canary-expected");

        let c = Classification::of(&report("m=x&rt=inabox&3p=1&ex=1"));
        assert_eq!(c.label, "default-origin-inabox-expected");

        // Unknown runtime kinds are kept verbatim
        let c = Classification::of(&report("m=x&rt=amp4email"));
        assert_eq!(c.label, "default-origin-amp4email");
    }

    #[test]
    fn test_severity() {
        assert_eq!(Classification::of(&report("m=x")).severity, Severity::Info);
        assert_eq!(
            Classification::of(&report("m=x&rt=3p")).severity,
            Severity::Info
        );
        assert_eq!(
            Classification::of(&report("m=x&rt=inabox")).severity,
            Severity::Error
        );
        assert_eq!(
            Classification::of(&report("m=x&r=https%3A%2F%2Fa.ampproject.net%2Ff")).severity,
            Severity::Error
        );
    }

    #[test]
    fn test_inabox_on_cdn() {
        let c = Classification::of(&report(
            "m=Boom&v=1.0&rt=inabox&r=https%3A%2F%2Fcdn.ampproject.org%2Fx",
        ));
        assert_eq!(c.label, "default-cdn-inabox");
        assert_eq!(c.version, "default-cdn-inabox-1.0");
        assert_eq!(c.severity, Severity::Error);
        assert_eq!(c.rule, "cdn");
        assert_rate(c.throttle_rate, 0.1);
    }

    #[test]
    fn test_assertion_only() {
        let c = Classification::of(&report("m=x&a=1"));
        assert_eq!(c.label, "assert-origin-1p");
        assert_rate(c.throttle_rate, 0.001);
    }

    #[test]
    fn test_version_is_not_cleaned_up() {
        let c = Classification::of(&report("m=x&v=default-origin-1p-2"));
        assert_eq!(c.version, "default-origin-1p-default-origin-1p-2");

        let c = Classification::of(&report("m=x"));
        assert_eq!(c.version, "default-origin-1p-");
    }

    #[test]
    fn test_classify_missing_message() {
        let result = classify(&report("v=1.0&ca=1"), &FixedDraw::new(0.0));
        assert!(matches!(result, Err(ReportError::MissingMessage)));

        let result = classify(&report("s=stack"), &FixedDraw::new(0.0));
        assert!(matches!(result, Ok(Decision::Forward(_))));
    }

    #[test]
    fn test_classify_internal_version() {
        let draw = FixedDraw::new(0.0);
        let version: String =
            url::form_urlencoded::byte_serialize(INTERNAL_RUNTIME_VERSION.as_bytes()).collect();
        let query = format!("v={version}");
        assert_eq!(classify(&report(&query), &draw).unwrap(), Decision::Drop);

        let query = format!("{query}&m=x&ca=1");
        assert_eq!(classify(&report(&query), &draw).unwrap(), Decision::Drop);
        assert_eq!(draw.draws(), 0);
    }

    #[test]
    fn test_classify_sampling() {
        // Canary is always forwarded, even on the largest possible draw
        let result = classify(&report("m=x&ca=1"), &FixedDraw::new(0.999_999));
        assert!(matches!(result, Ok(Decision::Forward(_))));

        // Draw equal to the rate is forwarded
        let result = classify(&report("m=x"), &FixedDraw::new(0.01));
        assert!(matches!(result, Ok(Decision::Forward(_))));

        let result = classify(&report("m=x"), &FixedDraw::new(0.02));
        assert!(matches!(result, Ok(Decision::Throttled(_))));

        let result = classify(&report("m=x&a=1"), &FixedDraw::new(0.005));
        assert!(matches!(result, Ok(Decision::Throttled(_))));

        let result = classify(&report("m=x&rt=3p"), &FixedDraw::new(0.05));
        assert!(matches!(result, Ok(Decision::Forward(_))));
    }
}
