pub mod auth;
pub mod checkout;
pub mod inventory;

pub use auth::*;
pub use checkout::*;
pub use inventory::*;
