pub mod bar;
pub mod loader;
pub mod series;

pub use bar::{Bar, BarError};
pub use loader::{load_csv, load_csv_from_reader, LoadError};
pub use series::{PriceSeries, SeriesError};
