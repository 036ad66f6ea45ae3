// Library for tests to access modules

pub mod agent;
pub mod analytics;
pub mod cache;
pub mod config;
pub mod error;
pub mod ingest;
pub mod logging;
pub mod metrics_repo;
pub mod models;
pub mod reader;
pub mod resolution;
pub mod rollup_worker;
pub mod routes;
pub mod version;
