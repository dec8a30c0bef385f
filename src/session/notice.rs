use crate::config::UrlLogConfig;
use crate::ledger::UrlEntry;
use chrono::{DateTime, Utc};
use std::fmt::Write as _;

/// Render the duplicate notice for a resubmitted URL.
///
/// The template is validated at config load, so rendering is not expected to
/// fail; if it somehow does, a plain fallback keeps the notice flowing.
pub fn duplicate_notice(config: &UrlLogConfig, submitter: &str, existing: &UrlEntry) -> String {
    let formatted_date = format_timestamp(existing.timestamp, &config.date_format);

    let mut ctx = tera::Context::new();
    ctx.insert("submitter", submitter);
    ctx.insert("original_submitter", &existing.submitter);
    ctx.insert("formatted_date", &formatted_date);
    ctx.insert("url", &existing.url);
    ctx.insert("title", &existing.title);

    match tera::Tera::one_off(&config.old_message, &ctx, false) {
        Ok(rendered) => rendered,
        Err(e) => {
            tracing::warn!(error = %e, "duplicate notice template failed to render");
            format!(
                "{submitter}: {} told this already {formatted_date}",
                existing.submitter
            )
        }
    }
}

/// Render the in-channel error notice, addressed to the submitter.
pub fn error_notice(submitter: &str, detail: &str) -> String {
    format!("{submitter}: Oh noes, error: {detail}")
}

fn format_timestamp(timestamp: DateTime<Utc>, format: &str) -> String {
    let mut out = String::new();
    if write!(out, "{}", timestamp.format(format)).is_err() {
        return timestamp.to_rfc3339();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn existing_entry() -> UrlEntry {
        UrlEntry {
            url: "http://example.com".to_string(),
            description: "cool site".to_string(),
            title: "Example Domain".to_string(),
            submitter: "alice".to_string(),
            timestamp: Utc.with_ymd_and_hms(2026, 3, 7, 14, 30, 5).unwrap(),
        }
    }

    #[test]
    fn default_template_renders() {
        let config = UrlLogConfig::default();
        let notice = duplicate_notice(&config, "bob", &existing_entry());
        assert_eq!(
            notice,
            "bob: Old link!!1! alice told this already 7.3.2026 14:30:05"
        );
    }

    #[test]
    fn custom_template_sees_all_variables() {
        let config = UrlLogConfig {
            old_message: "{{ url }} ({{ title }}) by {{ original_submitter }} for {{ submitter }}"
                .to_string(),
            ..UrlLogConfig::default()
        };
        let notice = duplicate_notice(&config, "bob", &existing_entry());
        assert_eq!(notice, "http://example.com (Example Domain) by alice for bob");
    }

    #[test]
    fn custom_date_format_applies() {
        let config = UrlLogConfig {
            date_format: "%Y-%m-%d".to_string(),
            ..UrlLogConfig::default()
        };
        let notice = duplicate_notice(&config, "bob", &existing_entry());
        assert!(notice.contains("2026-03-07"));
    }

    #[test]
    fn error_notice_addresses_submitter() {
        let notice = error_notice("bob", "request timed out");
        assert_eq!(notice, "bob: Oh noes, error: request timed out");
    }
}
