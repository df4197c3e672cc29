pub mod cache;
pub mod calendar;
pub mod cli;
pub mod config;
pub mod download;
pub mod error;
pub mod global;
pub mod sync;
pub mod zoom;
