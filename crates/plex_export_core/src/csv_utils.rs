use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::errors::PlexError;
use crate::models::MovieRecord;

pub const FIELDNAMES: [&str; 4] = ["Title", "Year", "Rating10", "WatchedDate"];

pub fn write_csv(path: &Path, records: &[MovieRecord]) -> Result<usize, PlexError> {
    let file = File::create(path)?;
    let written = write_records(BufWriter::new(file), records)?;
    Ok(written)
}

pub fn write_records<W: Write>(writer: W, records: &[MovieRecord]) -> Result<usize, PlexError> {
    let mut csv_writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer);
    csv_writer.write_record(FIELDNAMES)?;
    for record in records {
        csv_writer.serialize(record)?;
    }
    csv_writer.flush()?;
    Ok(records.len())
}
