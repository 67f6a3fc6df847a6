use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::core::models::report::ReportData;

#[derive(Debug, Error)]
pub enum FileWriteError {
    #[error(
        "Permission denied: could not write '{path}'. Ensure the file is not \
         open in another program and that the directory is writable."
    )]
    PermissionDenied { path: PathBuf },
    #[error("Failed to write report '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}

/// Unique per run, so a rerun never overwrites an earlier report.
pub fn report_filename(now: DateTime<Utc>) -> String {
    format!("azure_cost_report_{}.csv", now.format("%Y%m%d_%H%M%S"))
}

fn classify_create_error(path: &Path, err: io::Error) -> FileWriteError {
    if err.kind() == io::ErrorKind::PermissionDenied {
        FileWriteError::PermissionDenied {
            path: path.to_path_buf(),
        }
    } else {
        FileWriteError::Io {
            path: path.to_path_buf(),
            source: csv::Error::from(err),
        }
    }
}

/// Write the report as UTF-8 CSV under `dir` and return the full path.
///
/// Header: Subscription ID, Subscription Name, then one column per period
/// in period order. Rows follow aggregator order; amounts are plain
/// decimals, failed cells the literal `N/A` sentinel.
pub fn write_report(
    dir: &Path,
    report: &ReportData,
    now: DateTime<Utc>,
) -> Result<PathBuf, FileWriteError> {
    let path = dir.join(report_filename(now));

    let file = File::create(&path).map_err(|e| classify_create_error(&path, e))?;
    let mut writer = csv::Writer::from_writer(file);

    let io_err = |source| FileWriteError::Io {
        path: path.clone(),
        source,
    };

    let mut header = vec!["Subscription ID".to_string(), "Subscription Name".to_string()];
    header.extend(report.periods.iter().map(|p| p.name.clone()));
    writer.write_record(&header).map_err(io_err)?;

    for row in &report.rows {
        let mut record = vec![row.subscription_id.clone(), row.display_name.clone()];
        record.extend(row.costs.iter().map(|c| c.to_string()));
        writer.write_record(&record).map_err(io_err)?;
    }

    writer
        .flush()
        .map_err(|e| classify_create_error(&path, e))?;
    Ok(path)
}
