use keeper_core::{CredentialFingerprint, ValidationTag, KEEPER_LOG_VAR};
use std::time::Duration;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

// Re-export tracing macros for convenience
pub use tracing::{debug, error, info, instrument, span, trace, warn, Level, Span};

/// Initialize the tracing system
///
/// The filter is read from `KEEPER_LOG`, then `RUST_LOG`, falling back to
/// `info`. Output goes to stderr in the compact format.
pub fn init() -> Result<(), Box<dyn std::error::Error + Send + Sync + 'static>> {
    let filter = EnvFilter::try_from_env(KEEPER_LOG_VAR)
        .or_else(|_| EnvFilter::try_from_default_env())
        .or_else(|_| EnvFilter::try_new("info"))?;

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(is_tty())
        .compact()
        .with_target(false)
        .with_thread_ids(false)
        .with_level(true);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init()?;

    Ok(())
}

fn is_tty() -> bool {
    std::io::IsTerminal::is_terminal(&std::io::stderr())
}

/// Create a span covering one session validation
pub fn validation_span(fingerprint: &CredentialFingerprint, device: &str) -> Span {
    span!(Level::INFO, "validate", credential = %fingerprint, device = %device)
}

/// Emit a structured event for cache operations
pub fn cache_event(cache: &str, key: &str, hit: bool) {
    if hit {
        debug!(cache = %cache, key = %key, "cache_hit");
    } else {
        debug!(cache = %cache, key = %key, "cache_miss");
    }
}

/// Emit a structured event when a request is throttled
pub fn throttle_event(key: &str, retry_after: Duration) {
    warn!(
        key = %key,
        retry_after_ms = %retry_after.as_millis(),
        "throttled"
    );
}

/// Emit a structured event for a finished validation
pub fn validation_event(fingerprint: &CredentialFingerprint, outcome: ValidationTag, elapsed: Duration) {
    match outcome {
        ValidationTag::Invalid => info!(
            credential = %fingerprint,
            outcome = %outcome,
            elapsed_ms = %elapsed.as_millis(),
            "validation_completed"
        ),
        ValidationTag::ValidOffline => warn!(
            credential = %fingerprint,
            outcome = %outcome,
            elapsed_ms = %elapsed.as_millis(),
            "validation_completed"
        ),
        ValidationTag::Valid => debug!(
            credential = %fingerprint,
            outcome = %outcome,
            elapsed_ms = %elapsed.as_millis(),
            "validation_completed"
        ),
    }
}
