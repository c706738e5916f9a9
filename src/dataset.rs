//! Raw tabular data: named-column records, the CSV loader, and the
//! train/test split.

pub mod loader;
mod record;
pub mod split;

pub use loader::{DatasetError, LabeledTable, load_csv, read_csv};
pub use record::{RawRecord, RawTable};
pub use split::train_test_split;
