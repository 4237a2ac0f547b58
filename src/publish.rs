use std::io::Write;
use std::path::PathBuf;

use async_trait::async_trait;
use csv::WriterBuilder;

use crate::error::JobError;

/// Destination for the extracted table. `publish` replaces whatever the
/// destination held before.
#[async_trait]
pub trait TablePublisher: Send + Sync {
    async fn publish(&self, rows: &[Vec<String>]) -> Result<(), JobError>;

    fn describe(&self) -> String;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CsvTarget {
    Stdout,
    File(PathBuf),
}

impl CsvTarget {
    pub fn parse(value: &str) -> Self {
        if value == "-" {
            Self::Stdout
        } else {
            Self::File(PathBuf::from(value))
        }
    }
}

#[derive(Debug, Clone)]
pub struct CsvPublisher {
    target: CsvTarget,
    delimiter: u8,
}

impl CsvPublisher {
    pub fn new(target: CsvTarget, delimiter: u8) -> Self {
        Self { target, delimiter }
    }
}

#[async_trait]
impl TablePublisher for CsvPublisher {
    async fn publish(&self, rows: &[Vec<String>]) -> Result<(), JobError> {
        let csv = write_csv_to_string(rows, self.delimiter)?;
        match &self.target {
            CsvTarget::Stdout => {
                let mut stdout = std::io::stdout().lock();
                stdout.write_all(csv.as_bytes())?;
                stdout.flush()?;
            }
            CsvTarget::File(path) => tokio::fs::write(path, csv).await?,
        }
        Ok(())
    }

    fn describe(&self) -> String {
        match &self.target {
            CsvTarget::Stdout => "csv:stdout".to_string(),
            CsvTarget::File(path) => format!("csv:{}", path.display()),
        }
    }
}

pub fn write_csv_to_string(rows: &[Vec<String>], delimiter: u8) -> Result<String, JobError> {
    let mut writer = WriterBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .from_writer(Vec::<u8>::new());
    for row in rows {
        writer.write_record(row)?;
    }
    writer.flush()?;

    let bytes = writer
        .into_inner()
        .map_err(|error| JobError::Csv(error.into_error().into()))?;
    String::from_utf8(bytes)
        .map_err(|error| JobError::Publish(format!("invalid utf-8 csv output: {error}")))
}

#[cfg(test)]
mod tests {
    use super::{CsvTarget, write_csv_to_string};

    #[test]
    fn quotes_cells_containing_the_delimiter() {
        let rows = vec![
            vec!["Papel".to_string(), "Preço".to_string()],
            vec!["ABCD11".to_string(), "10,50".to_string()],
        ];
        let csv = write_csv_to_string(&rows, b',').expect("csv");
        assert_eq!(csv, "Papel,Preço\nABCD11,\"10,50\"\n");
    }

    #[test]
    fn dash_means_stdout() {
        assert_eq!(CsvTarget::parse("-"), CsvTarget::Stdout);
        assert_eq!(
            CsvTarget::parse("out.csv"),
            CsvTarget::File("out.csv".into())
        );
    }
}
