//! Shared domain for the rice mill sample workflow
//!
//! Pure types and rules used by the workflow backend and by browser clients
//! (via WASM): entry models, the phase graph, the permission matrix, the rate
//! calculation engine, and lot/inspection aggregation.

pub mod error;
pub mod models;
pub mod permissions;
pub mod rates;
pub mod types;
pub mod validation;
pub mod workflow;

pub use error::*;
pub use models::*;
pub use permissions::*;
pub use rates::*;
pub use types::*;
pub use validation::*;
pub use workflow::*;
