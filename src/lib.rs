pub mod app;
pub mod config;
pub mod engine;
pub mod listing;
pub mod model;
pub mod player;
pub mod ui;
