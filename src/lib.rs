pub mod analyzers;
pub mod charts;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod fetch;
pub mod frame;
pub mod loader;
pub mod model;
pub mod output;
pub mod parser;
pub mod pipeline;
pub mod report;
