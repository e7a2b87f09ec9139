pub mod actions;
pub mod classifier;
pub mod config;
pub mod confirmation;
pub mod navigation;
pub mod query_guard;
pub mod resource;
pub mod session;
pub mod transport;
pub mod view;
