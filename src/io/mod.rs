// Import and export of shop data (CSV, JSON)

pub mod export;
pub mod import;

pub use export::*;
pub use import::*;
