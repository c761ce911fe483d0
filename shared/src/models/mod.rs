//! Domain models for the rice mill sample workflow

mod inventory;
mod lot;
mod offering;
mod purchase_rate;
mod quality;
mod sample_entry;
mod user;

pub use inventory::*;
pub use lot::*;
pub use offering::*;
pub use purchase_rate::*;
pub use quality::*;
pub use sample_entry::*;
pub use user::*;
