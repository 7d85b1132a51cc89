pub mod aliases;
pub mod classify;
pub mod config;
pub mod export;
pub mod header_locate;
pub mod metrics;
pub mod parser;
pub mod row_mapper;
pub mod sheet;
pub mod store;
pub mod text_norm;
pub mod upload;
