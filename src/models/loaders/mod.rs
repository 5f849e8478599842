pub mod csv_loader;

pub use csv_loader::{parse_source_csv, read_source_csv};
