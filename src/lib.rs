// Internal modules required when compiled as a library for tests.
pub mod alert;
pub mod app;
pub mod config;
pub mod http;
pub mod metrics;
pub mod registry;
pub mod state;
pub mod ticker;
// Re-export commonly used types for tests
pub use alert::{Alert, AlertCategory, AlertKind};
pub use registry::{Machine, MachineRegistry, MachineStatus};
pub use state::{AlertTransition, FloorState, SharedState};
