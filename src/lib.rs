// Library for tests to access modules

pub mod clock;
pub mod config;
pub mod error;
pub mod models;
pub mod report;
pub mod routes;
pub mod scheduler;
pub mod store;
pub mod version;
