//! Utility functions and types

pub mod data_loader;
pub mod frame;

pub use data_loader::{DataLoader, DataSaver};
pub use frame::{column_names, columns_to_array2, is_numeric_dtype};
