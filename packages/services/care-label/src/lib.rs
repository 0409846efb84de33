pub mod config;
pub mod error;
pub mod models;
pub mod processing;
pub mod clients;
pub mod catalog;
pub mod inference;
pub mod pipeline;
pub mod presentation;
pub mod schema;
pub mod cli;

// Convenient re-exports for tests and external callers
pub use config::*;
pub use error::*;
pub use models::*;
pub use clients::*;
pub use catalog::*;
pub use inference::*;
pub use pipeline::*;
pub use presentation::*;
