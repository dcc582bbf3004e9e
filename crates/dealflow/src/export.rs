//! CSV export of the filtered, sorted record set.

use crate::record::Record;
use dealflow_protocol::defaults::EXPORT_FILE_NAME;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

pub const CSV_HEADERS: [&str; 6] = [
    "Name",
    "First Interaction",
    "Last Interaction",
    "Total Interactions",
    "Company Contact",
    "Analysis Date",
];

const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("failed to write CSV: {0}")]
    Csv(#[from] csv::Error),
    #[error("failed to write export file {}: {source}", path.display())]
    Io { path: PathBuf, source: io::Error },
}

/// Write a header row and one row per record. Returns the number of records written.
pub fn write_csv<'a, W, I>(writer: W, records: I) -> Result<usize, ExportError>
where
    W: Write,
    I: IntoIterator<Item = &'a Record>,
{
    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer.write_record(CSV_HEADERS)?;

    let mut written = 0;
    for record in records {
        let total = record.total_interactions.to_string();
        let first = record.first_interaction.format(DATE_FORMAT).to_string();
        let last = record.last_interaction.format(DATE_FORMAT).to_string();
        let analyzed = record.analysis_date.format(DATE_FORMAT).to_string();
        csv_writer.write_record([
            record.name.as_str(),
            first.as_str(),
            last.as_str(),
            total.as_str(),
            record.contact.as_str(),
            analyzed.as_str(),
        ])?;
        written += 1;
    }

    csv_writer.flush().map_err(csv::Error::from)?;
    Ok(written)
}

/// Render the export into a string.
pub fn to_csv_string<'a, I>(records: I) -> Result<String, ExportError>
where
    I: IntoIterator<Item = &'a Record>,
{
    let mut buffer = Vec::new();
    write_csv(&mut buffer, records)?;
    String::from_utf8(buffer)
        .map_err(|e| ExportError::Csv(io::Error::new(io::ErrorKind::InvalidData, e).into()))
}

/// `<dir>/startups_data.csv`
pub fn default_export_path(dir: &Path) -> PathBuf {
    dir.join(EXPORT_FILE_NAME)
}

/// Write the export to `path`, creating parent directories as needed.
pub fn export_to_path<'a, I>(path: &Path, records: I) -> Result<usize, ExportError>
where
    I: IntoIterator<Item = &'a Record>,
{
    let io_err = |source| ExportError::Io {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(io_err)?;
    }
    let file = File::create(path).map_err(io_err)?;
    let written = write_csv(file, records)?;
    info!(path = %path.display(), records = written, "Exported records");
    Ok(written)
}
