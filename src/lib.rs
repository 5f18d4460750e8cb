pub mod app;
pub mod appwrite;
pub mod config;
pub mod counters;
pub mod debounce;
pub mod discovery;
pub mod proxy;
pub mod tmdb;
