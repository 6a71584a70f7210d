pub extern crate actix_web;

pub mod admin;
pub mod config;
pub mod connection;
pub mod connection_tx_storage;
pub mod error;
pub mod handlers;
mod handshake;
pub mod server;
mod server_state;
mod session;
pub mod session_code;
mod sync;
