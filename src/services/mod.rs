pub mod auth;
pub mod chat;
pub mod persona;
pub mod store;
