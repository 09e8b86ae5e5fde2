//! Output generation.
//!
//! # Submodules
//!
//! - [`csv`]: Writes a [`NormalizedMonth`](crate::models::NormalizedMonth) as one CSV file per month
//!
//! # Output Structure
//!
//! ```text
//! output_dir/
//! ├── 202012_DisneySea.csv
//! ├── 202101_DisneySea.csv
//! └── ...
//! ```

pub mod csv;
