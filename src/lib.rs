// Library for tests to access modules

pub mod collector;
pub mod config;
pub mod export;
pub mod forecast;
pub mod metrics_repo;
pub mod models;
pub mod routes;
pub mod scoring;
pub mod version;
pub mod worker;
