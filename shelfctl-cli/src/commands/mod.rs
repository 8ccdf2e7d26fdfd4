//! Command implementations for shelfctl CLI

pub mod book;
pub mod config;
pub mod import;
pub mod output;

// Re-export dispatcher functions for flat access from main.rs
pub use book::{
    run_add, run_avg, run_cheapest, run_count, run_delete, run_exists, run_find, run_get,
    run_list, run_priciest, run_stock, run_update,
};
pub use config::run_config;
pub use import::run_import;
pub use output::OutputFormat;
