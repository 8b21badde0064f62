pub mod alcohol;
pub mod cache;
pub mod catalog;
pub mod coerce;
pub mod compact;
pub mod config;
pub mod domain;
pub mod error;
pub mod fetcher;
pub mod figure;
pub mod fs_util;
pub mod geo;
pub mod output;
pub mod parser;
pub mod stats;
pub mod store;
pub mod table;
pub mod tui;
