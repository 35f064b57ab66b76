/*!
# Saving HMC samples to CSV

Enable via the `csv` feature.
*/

use crate::error::HmcError;
use csv::Writer;
use ndarray::{ArrayView3, Axis};
use std::fs::File;
use std::io::Write;
use std::path::Path;

/**
Saves a sample of shape **chain × sample × dimension** as a CSV file.

The file has a header row `chain,sample,dim_0,dim_1,...` followed by one row per draw,
chain by chain.

# Examples

```rust
use ndarray::arr3;
use static_hmc::io::csv::save_csv;

let data = arr3(&[[[1.0, 2.0], [3.0, 4.0]]]);
let path = std::env::temp_dir().join("static_hmc_doc.csv");
save_csv(data.view(), &path)?;
# Ok::<(), static_hmc::error::HmcError>(())
```
*/
pub fn save_csv<T, P>(data: ArrayView3<T>, path: P) -> Result<(), HmcError>
where
    T: std::fmt::Display,
    P: AsRef<Path>,
{
    write_csv(data, File::create(path)?)
}

/// Like [`save_csv`], writing to any [`Write`] sink.
pub fn write_csv<T, W>(data: ArrayView3<T>, sink: W) -> Result<(), HmcError>
where
    T: std::fmt::Display,
    W: Write,
{
    let mut wtr = Writer::from_writer(sink);
    let n_dims = data.shape()[2];

    let mut header: Vec<String> = vec!["chain".to_string(), "sample".to_string()];
    header.extend((0..n_dims).map(|i| format!("dim_{i}")));
    wtr.write_record(&header)?;

    for (chain_idx, chain) in data.axis_iter(Axis(0)).enumerate() {
        for (sample_idx, draw) in chain.axis_iter(Axis(0)).enumerate() {
            let mut row = vec![chain_idx.to_string(), sample_idx.to_string()];
            row.extend(draw.iter().map(|v| v.to_string()));
            wtr.write_record(&row)?;
        }
    }

    wtr.flush()?;
    Ok(())
}
