//! Engine services for the mill sample workflow

pub mod locks;
pub mod lot;
pub mod purchase_rate;
pub mod stage;
pub mod workflow;

pub use locks::EntryLocks;
pub use lot::LotService;
pub use purchase_rate::PurchaseRateService;
pub use stage::{StagePlan, TransitionPayload};
pub use workflow::WorkflowService;
