pub mod balance;
pub mod config;
pub mod error;
pub mod exchange;
pub mod money;
pub mod routes;
pub mod schemas;
pub mod store;
pub mod validation;

pub use balance::compute_balances;
