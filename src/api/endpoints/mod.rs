pub mod analysis;
pub mod health;
pub mod reports;
pub mod sessions;
