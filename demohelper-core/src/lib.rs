pub mod config;
pub mod console;
pub mod cvars;
pub mod demo;
pub mod error;
pub mod listener;
pub mod protocol;
pub mod registry;
pub mod services;
pub mod session;
pub mod timeout;
pub mod voice;

// Re-export the pieces most callers need so they can `use demohelper_core::ConsoleSession`
pub use config::{Config, ConfigError};
pub use error::{ConsoleError, ConsoleResult};
pub use listener::ListenerService;
pub use registry::{LineWaiterRegistry, ListenerId, RoutingOutcome};
pub use session::{ConsoleSession, SessionState};
pub use timeout::{TimeoutGuard, WaitKind};

// The display-name contract is part of the recording workflow's API.
pub use demohelper_steam::{DisplayNameProvider, StaticDisplayName};
