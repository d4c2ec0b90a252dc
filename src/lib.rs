pub mod app;
pub mod assets;
pub mod config;
pub mod domain;
pub mod error;
pub mod export;
pub mod output;
pub mod pages;
pub mod store;
pub mod tui;
pub mod views;
