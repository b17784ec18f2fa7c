//! File-based JSON tracing for hosts that load the library through the C ABI.

#[cfg(feature = "trace")]
use std::path::Path;
#[cfg(feature = "trace")]
use std::sync::Once;

#[cfg(feature = "trace")]
static INIT: Once = Once::new();

/// Environment variable that overrides the default filter directive.
#[cfg(feature = "trace")]
const FILTER_ENV: &str = "LEX_FSA_LOG";

#[cfg(feature = "trace")]
pub fn init_tracing(log_dir: &Path) {
    INIT.call_once(|| {
        let file_appender = tracing_appender::rolling::never(log_dir, "lex-fsa-trace.jsonl");
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
        // The subscriber is global; keep the writer thread for the process lifetime.
        std::mem::forget(guard);

        let filter = tracing_subscriber::EnvFilter::try_from_env(FILTER_ENV)
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("lex_fsa=debug"));
        let installed = tracing_subscriber::fmt()
            .json()
            .with_writer(non_blocking)
            .with_target(true)
            .with_span_events(tracing_subscriber::fmt::format::FmtSpan::CLOSE)
            .with_env_filter(filter)
            .try_init();
        if installed.is_err() {
            // The host already installed a global subscriber; events go there.
            tracing::debug!("global subscriber already set");
        }
    });
}

#[cfg(not(feature = "trace"))]
pub fn init_tracing(_log_dir: &std::path::Path) {}
