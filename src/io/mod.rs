//! Writing samples to disk. Enable the `csv` feature for [`csv::save_csv`].

#[cfg(feature = "csv")]
pub mod csv;
