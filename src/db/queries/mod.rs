pub mod activity;
pub mod client;
