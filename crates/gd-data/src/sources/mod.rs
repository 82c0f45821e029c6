pub mod csv_source;
pub mod generator;
pub mod simulated;

pub use csv_source::load_records_csv;
pub use generator::SampleGenerator;
pub use simulated::SimulatedSource;
