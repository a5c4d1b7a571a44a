//! Subscriber setup. Logs go to stderr; stdout carries the model output.

use tracing_subscriber::EnvFilter;

use llmstxt_core::config::LoggingConfig;

/// Filter directives when `RUST_LOG` is unset.
fn directives(verbose: bool, logging: Option<&LoggingConfig>) -> String {
    let level = if verbose {
        "debug".to_string()
    } else {
        logging
            .and_then(|l| l.level.clone())
            .unwrap_or_else(|| "info".to_string())
    };

    let mut parts = vec![level];
    if let Some(logging) = logging {
        parts.extend(logging.filters.iter().cloned());
    }
    parts.join(",")
}

pub fn init(verbose: bool, logging: Option<&LoggingConfig>) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(directives(verbose, logging)));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    if logging.is_some_and(|l| l.format == "json") {
        builder.json().init();
    } else {
        builder.with_target(false).init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn logging(level: Option<&str>, filters: &[&str]) -> LoggingConfig {
        LoggingConfig {
            format: "plain".into(),
            level: level.map(String::from),
            filters: filters.iter().map(|f| f.to_string()).collect(),
        }
    }

    #[test]
    fn test_default_is_info() {
        assert_eq!(directives(false, None), "info");
    }

    #[test]
    fn test_verbose_wins_over_config_level() {
        let config = logging(Some("warn"), &[]);
        assert_eq!(directives(true, Some(&config)), "debug");
        assert_eq!(directives(false, Some(&config)), "warn");
    }

    #[test]
    fn test_filters_appended() {
        let config = logging(None, &["llmstxt_agent=trace", "reqwest=warn"]);
        assert_eq!(
            directives(false, Some(&config)),
            "info,llmstxt_agent=trace,reqwest=warn"
        );
    }
}
