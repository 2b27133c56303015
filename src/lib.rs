pub mod chart;
pub mod client;
pub mod config;
pub mod error;
pub mod fetcher;
pub mod logging;
pub mod markup;
pub mod model;
pub mod rank;
pub mod stats;
pub mod token;
pub mod view;
