pub mod app;
pub mod config;
pub mod domain;
pub mod error;
pub mod fs_util;
pub mod gdc;
pub mod header;
pub mod manifest;
pub mod metrics;
pub mod output;
pub mod resolver;
pub mod table;
pub mod transfer;
pub mod writer;
