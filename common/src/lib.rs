pub mod config;
pub mod seed;
