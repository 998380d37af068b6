pub mod analysis;
pub mod charts;
pub mod config;
pub mod data_handling;
pub mod helper_functions;
pub mod ml;
pub mod models;
pub mod stats;
