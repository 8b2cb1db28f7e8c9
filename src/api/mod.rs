pub mod activity;
pub mod auth;
pub mod client;
pub mod export;
pub mod health;
pub mod notification;
pub mod user;
