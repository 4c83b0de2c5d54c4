pub mod error;
pub mod memory;
pub mod pg;

mod campaign;

pub use campaign::CampaignStore;
