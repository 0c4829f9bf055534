use std::any::Any;

use tracing_subscriber::EnvFilter;

pub const DEFAULT_LOG_LEVEL: &str = "info";

/// `RUST_LOG` wins; otherwise `level` from the config, then "info".
pub fn log_filter(level: Option<&str>) -> EnvFilter {
    // RUST_LOG=demohelper_core::registry=trace,info
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.unwrap_or(DEFAULT_LOG_LEVEL)))
}

pub fn init_tracing(level: Option<&str>) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(log_filter(level))
        .with_target(true)
        .with_line_number(true)
        .with_writer(std::io::stderr)
        .compact()
        .try_init();
}

/// Text of a panic payload; listener panics carry either `&str` or `String`.
pub fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("<non-string panic payload>")
}

/// Route panics into the log instead of a console window nobody watches.
///
/// Fires for listener panics too, before their task contains them.
pub fn install_panic_hook() {
    std::panic::set_hook(Box::new(|info| {
        let location = info
            .location()
            .map(|l| format!("{}:{}", l.file(), l.line()))
            .unwrap_or_else(|| "<unknown>".to_string());
        let thread = std::thread::current();

        tracing::error!(
            %location,
            thread = thread.name().unwrap_or("<unnamed>"),
            "DemoHelper panicked: {}",
            panic_message(info.payload())
        );
    }));
}
