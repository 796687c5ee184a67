mod parser;

pub use parser::SensorCsvParser;
