use tracing_subscriber::EnvFilter;

use crate::config::LoggingSettings;

/// Install the global tracing subscriber.
///
/// `level` is an `EnvFilter` directive (an unparsable one falls back to
/// `info`); `format = "pretty"` switches from JSON lines to the human
/// readable format.
pub fn init(settings: &LoggingSettings) {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter_for(&settings.level))
        .with_target(false)
        .with_level(true);

    if is_pretty(&settings.format) {
        subscriber.pretty().init();
    } else {
        subscriber.json().init();
    }
}

fn filter_for(level: &str) -> EnvFilter {
    EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"))
}

fn is_pretty(format: &str) -> bool {
    format.eq_ignore_ascii_case("pretty")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_uses_configured_level() {
        assert_eq!(filter_for("debug").to_string(), "debug");
        assert_eq!(filter_for("swipebot=trace").to_string(), "swipebot=trace");
    }

    #[test]
    fn test_unparsable_level_falls_back_to_info() {
        assert_eq!(filter_for("swipebot=loud").to_string(), "info");
    }

    #[test]
    fn test_format_selection() {
        assert!(is_pretty("pretty"));
        assert!(is_pretty("PRETTY"));
        assert!(!is_pretty("json"));
        assert!(!is_pretty(&LoggingSettings::default().format));
    }
}
