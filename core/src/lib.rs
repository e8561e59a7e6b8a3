//! Core library for the larder meal planner: data models, the SQLite-backed
//! store, the shopping-list aggregator, HTML export, and the service layer
//! that ties them together behind an explicit per-user context.

pub mod aggregate;
pub mod catalog_import;
pub mod db;
pub mod export;
pub mod models;
pub mod service;
