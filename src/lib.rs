pub mod config;
pub mod db;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod policy;
pub mod services;
pub mod state;
