pub mod config;
pub mod detector;
pub mod platform;
pub mod playlist;
