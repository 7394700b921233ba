pub mod constants;
pub mod filename;
pub mod progress;
pub mod timestamps;
pub mod units;

pub use constants::*;
pub use filename::{file_name_of, legacy_output_path};
pub use progress::ProgressReporter;
pub use timestamps::{canonicalize_timestamp, parse_timestamp};
pub use units::{fahrenheit_to_celsius, strip_unit_suffix};
