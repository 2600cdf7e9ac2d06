pub mod admin;
pub mod auth;
pub mod data;
pub mod server;
