pub mod error;
pub mod event_bus;
pub mod event_types;
pub mod relay;

pub use error::{EmitReport, ListenerError, ListenerFailure};
pub use event_bus::{ErrorHandler, EventBus, EventBusStats, Listener};
pub use event_types::{Event, SubscriptionId};
pub use relay::{relay, relay_channel};
