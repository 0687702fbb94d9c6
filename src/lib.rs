pub mod auth;
pub mod bidding;
pub mod database;
pub mod error;
pub mod handlers;
pub mod orders;
pub mod query;
pub mod scheduler;
pub mod store;
pub mod users;
