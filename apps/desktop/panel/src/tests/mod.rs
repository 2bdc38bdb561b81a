mod config;
mod error;
mod logger;
mod services;
