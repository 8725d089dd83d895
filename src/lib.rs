pub mod config;
pub mod database;
pub mod errors;
pub mod providers;
pub mod server;
pub mod services;
pub mod views;
