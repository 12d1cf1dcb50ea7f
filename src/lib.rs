pub mod config;
pub mod driver;
pub mod error;
pub mod kernel;
pub mod outputs;
pub mod services;

// Re-export specific items for convenient access
pub use driver::{DashboardHandle, Driver};
pub use kernel::reactor::{DashboardView, Reactor, ReactorConfig};
