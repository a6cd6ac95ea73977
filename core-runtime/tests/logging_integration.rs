//! Integration tests for logging system

use bridge_traits::time::LogLevel;
use core_runtime::logging::{redact_if_sensitive, strip_path, LogFormat, LoggingConfig};

#[test]
fn test_redaction_keeps_domain_values() {
    assert_eq!(redact_if_sensitive("api_key", "k-123"), "[REDACTED]");
    assert_eq!(redact_if_sensitive("auth_token", "abc"), "[REDACTED]");
    assert_eq!(redact_if_sensitive("verse", "2:255"), "2:255");
    assert_eq!(redact_if_sensitive("reciter", "ar.alafasy"), "ar.alafasy");
    assert_eq!(redact_if_sensitive("bookmark_id", "17"), "17");
}

#[test]
fn test_path_stripping() {
    assert_eq!(
        strip_path("/home/reader/.cache/quran/audio/audio_36_1.mp3"),
        "audio_36_1.mp3"
    );
    assert_eq!(strip_path("C:\\cache\\images\\image_1_1.png"), "image_1_1.png");
    assert_eq!(strip_path("quran.db"), "quran.db");
    assert_eq!(strip_path("/var/cache/"), "");
}

#[test]
fn test_config_defaults_and_chaining() {
    let defaults = LoggingConfig::default();
    #[cfg(debug_assertions)]
    assert_eq!(defaults.format, LogFormat::Pretty);
    #[cfg(not(debug_assertions))]
    assert_eq!(defaults.format, LogFormat::Json);

    // Logging can only be initialized once per process, so only the builder is exercised
    let config = defaults
        .with_format(LogFormat::Compact)
        .with_level(LogLevel::Warn)
        .with_pii_redaction(false)
        .with_spans(false)
        .with_target(false)
        .with_filter("core_cache=debug");

    assert_eq!(config.format, LogFormat::Compact);
    assert_eq!(config.level, LogLevel::Warn);
    assert!(!config.redact_pii);
    assert!(!config.enable_spans);
    assert!(!config.display_target);
    assert_eq!(config.filter.as_deref(), Some("core_cache=debug"));
}
