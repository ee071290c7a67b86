pub mod analyzers;
pub mod config;
pub mod error;
pub mod fetch;
pub mod infra;
pub mod model;
pub mod output;
pub mod parser;
pub mod rating;
pub mod service;
pub mod services;
