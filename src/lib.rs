pub mod config;
pub mod conversation;
pub mod error;
pub mod model;
pub mod session;
pub mod web;
