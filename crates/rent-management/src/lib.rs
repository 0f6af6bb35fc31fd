pub mod accounts;
pub mod body;
pub mod config;
pub mod error;
pub mod listings;
pub mod paging;
pub mod shape;
pub mod storage;
pub mod telemetry;
pub mod validation;
