pub mod campaign;
pub mod contact;
pub mod interaction_step;
pub mod message;
pub mod user;
