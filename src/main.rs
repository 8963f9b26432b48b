use std::env;
use std::sync::Arc;

use evbus::{init_logging, BusConfig, EmitReport, EventBus, Logger};

// Usage: evbus [CONFIG_PATH] [MESSAGE]
fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut args = env::args().skip(1);
    let config_path = args.next();
    let message = args.next().unwrap_or_else(|| "HTML CSS JS".to_string());

    let config = match &config_path {
        Some(path) => BusConfig::load(path)?,
        None => BusConfig::default(),
    };
    init_logging(&config.logging);
    log::debug!("evbus {} starting with {:?}", evbus::VERSION, config);

    // One bus, owned here and handed to both producer and consumer
    let bus = Arc::new(EventBus::with_settings(&config.bus));
    bus.set_error_handler(|failure| eprintln!("listener error: {}", failure));

    bus.subscribe(evbus::MESSAGE_LOGGED, |event| {
        println!("Listener Called! {}", event.payload);
    });

    let logger = Logger::from_config(bus.clone(), &config.logger);
    println!("{}", message);
    let report = logger.log(&message);

    log::debug!(
        "messageLogged reached {} listener(s), {} failure(s)",
        report.invoked,
        report.failures.len()
    );
    check_report(&report)
}

fn check_report(report: &EmitReport) -> Result<(), Box<dyn std::error::Error>> {
    match report.failures.first() {
        None => Ok(()),
        Some(first) => Err(format!(
            "{} of {} listener(s) failed, first: {}",
            report.failures.len(),
            report.invoked,
            first
        )
        .into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use evbus::ListenerError;
    use serde_json::Value;

    #[test]
    fn test_check_report_passes_clean_emit() {
        let bus = EventBus::new();
        bus.subscribe(evbus::MESSAGE_LOGGED, |_| {});
        assert!(check_report(&bus.emit(evbus::MESSAGE_LOGGED, Value::Null)).is_ok());
        assert!(check_report(&EmitReport::default()).is_ok());
    }

    #[test]
    fn test_check_report_returns_error_on_failure() {
        let bus = EventBus::new();
        bus.set_error_handler(|_| {});
        bus.subscribe(evbus::MESSAGE_LOGGED, |_| {});
        bus.try_subscribe(evbus::MESSAGE_LOGGED, |_| Err(ListenerError::failed("rejected")));

        let err = check_report(&bus.emit(evbus::MESSAGE_LOGGED, Value::Null)).unwrap_err();
        let message = err.to_string();
        assert!(message.starts_with("1 of 2 listener(s) failed"));
        assert!(message.contains("rejected"));
    }
}
