pub mod chart;
pub mod config;
pub mod credentials;
pub mod dates;
pub mod error;
pub mod fetcher;
pub mod models;
pub mod pipeline;
pub mod theme;
pub mod timestamp;
