pub mod config;
pub mod data;
pub mod health;
pub mod videos;
