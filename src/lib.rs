pub mod config;
pub mod events;
pub mod logger;

pub use config::{BusConfig, ConfigError};
pub use events::{EmitReport, Event, EventBus, ListenerError, ListenerFailure, SubscriptionId};
pub use logger::{Logger, MESSAGE_LOGGED};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialise env_logger from the logging section.
///
/// `RUST_LOG` wins over the configured level. With a log file configured the
/// output is appended there; if the file cannot be opened we fall back to
/// stderr. Calling this twice is harmless.
pub fn init_logging(config: &config::LoggingConfig) {
    use std::fs::OpenOptions;

    let mut builder = env_logger::Builder::new();
    builder.filter_level(config.level_filter().unwrap_or(log::LevelFilter::Info));
    builder.parse_default_env();

    if !config.file.is_empty() {
        match OpenOptions::new().create(true).append(true).open(&config.file) {
            Ok(file) => {
                builder.target(env_logger::Target::Pipe(Box::new(file)));
            }
            Err(e) => {
                eprintln!("cannot open log file {}: {}, logging to stderr", config.file, e);
            }
        }
    }

    let _ = builder.try_init();
}
