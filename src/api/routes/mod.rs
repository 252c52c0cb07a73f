pub mod health;
pub mod monitoring;
pub mod notify;
