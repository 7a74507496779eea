pub mod normalizer;

pub use normalizer::{currency_rate, parse_date, write_csv, NormalizeStats, RecordNormalizer};
