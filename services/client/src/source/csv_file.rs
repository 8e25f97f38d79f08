use async_trait::async_trait;
use csv::{ReaderBuilder, StringRecord};
use shared::{Bet, MAX_BATCH_SIZE};
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use super::{BetSource, SourceError};

/// Reads bets from the agency CSV file
///
/// Rows are `first_name,last_name,document,birthdate,number` with no header.
/// Rows that fail validation are skipped with a warning and do not count
/// toward the offset.
pub struct CsvBetSource {
    reader: csv::Reader<File>,
    path: PathBuf,
    record: StringRecord,
    offset: usize,
    skipped: usize,
}

impl CsvBetSource {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, SourceError> {
        Self::open_at(path, 0)
    }

    /// Open the file and skip the first `offset` valid bets
    pub fn open_at(path: impl AsRef<Path>, offset: usize) -> Result<Self, SourceError> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path).map_err(|source| SourceError::Open {
            path: path.clone(),
            source,
        })?;

        let reader = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(file);

        let mut source = Self {
            reader,
            path,
            record: StringRecord::new(),
            offset: 0,
            skipped: 0,
        };

        while source.offset < offset {
            if source.read_valid()?.is_none() {
                break;
            }
        }

        debug!(
            action = "open_file",
            result = "success",
            path = %source.path.display(),
            offset = source.offset
        );
        Ok(source)
    }

    /// Rows rejected by validation so far
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    fn read_valid(&mut self) -> Result<Option<Bet>, SourceError> {
        loop {
            if !self.reader.read_record(&mut self.record)? {
                return Ok(None);
            }

            let fields: Vec<&str> = self.record.iter().collect();
            match Bet::from_csv_fields(&fields) {
                Ok(bet) => {
                    self.offset += 1;
                    return Ok(Some(bet));
                }
                Err(e) => {
                    self.skipped += 1;
                    let line = self.record.position().map(|p| p.line()).unwrap_or(0);
                    warn!(
                        action = "read_bet",
                        result = "skipped",
                        path = %self.path.display(),
                        line,
                        error = %e
                    );
                }
            }
        }
    }
}

#[async_trait]
impl BetSource for CsvBetSource {
    async fn next_batch(&mut self, max: usize) -> Result<Vec<Bet>, SourceError> {
        let mut batch = Vec::with_capacity(max.min(MAX_BATCH_SIZE));
        while batch.len() < max {
            match self.read_valid()? {
                Some(bet) => batch.push(bet),
                None => break,
            }
        }
        Ok(batch)
    }

    fn offset(&self) -> usize {
        self.offset
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn agency_file(rows: &[&str]) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        for row in rows {
            writeln!(file, "{}", row).unwrap();
        }
        file
    }

    const ROWS: [&str; 4] = [
        "Santiago Lionel,Lorca,30904465,1999-03-17,7574",
        "Joaquin,Rojas,25336497,1974-06-05,1128",
        "Malena,Gomez,38214321,2001-11-30,42",
        "Lautaro,Perez,40111222,1995-02-01,9001",
    ];

    #[tokio::test]
    async fn test_reads_batches_in_file_order() {
        let file = agency_file(&ROWS);
        let mut source = CsvBetSource::open(file.path()).unwrap();

        let first = source.next_batch(3).await.unwrap();
        assert_eq!(first.len(), 3);
        assert_eq!(first[0].document.as_str(), "30904465");
        assert_eq!(first[2].document.as_str(), "38214321");
        assert_eq!(source.offset(), 3);

        let second = source.next_batch(3).await.unwrap();
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].number, 9001);

        assert!(source.next_batch(3).await.unwrap().is_empty());
        assert_eq!(source.offset(), 4);
    }

    #[tokio::test]
    async fn test_unbounded_request_reads_rest_of_file() {
        let file = agency_file(&ROWS);
        let mut source = CsvBetSource::open(file.path()).unwrap();

        let batch = source.next_batch(usize::MAX).await.unwrap();
        assert_eq!(batch.len(), ROWS.len());
        assert!(source.next_batch(usize::MAX).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_rows_are_skipped() {
        let file = agency_file(&[
            ROWS[0],
            "Only,Three,Fields",
            "Ana,Lorca,not-a-dni,1999-03-17,1",
            ROWS[1],
        ]);
        let mut source = CsvBetSource::open(file.path()).unwrap();

        let batch = source.next_batch(10).await.unwrap();
        assert_eq!(batch.len(), 2);
        assert_eq!(batch[1].document.as_str(), "25336497");
        assert_eq!(source.skipped(), 2);
        assert_eq!(source.offset(), 2);
    }

    #[tokio::test]
    async fn test_open_at_offset_resumes_after_sent_bets() {
        let file = agency_file(&ROWS);
        let mut source = CsvBetSource::open_at(file.path(), 2).unwrap();
        assert_eq!(source.offset(), 2);

        let batch = source.next_batch(10).await.unwrap();
        assert_eq!(batch.len(), 2);
        assert_eq!(batch[0].document.as_str(), "38214321");
    }

    #[tokio::test]
    async fn test_offset_past_end_yields_nothing() {
        let file = agency_file(&ROWS);
        let mut source = CsvBetSource::open_at(file.path(), 50).unwrap();
        assert_eq!(source.offset(), 4);
        assert!(source.next_batch(5).await.unwrap().is_empty());
    }

    #[test]
    fn test_missing_file_is_open_error() {
        let err = CsvBetSource::open("/nonexistent/agency.csv").err().unwrap();
        assert!(matches!(err, SourceError::Open { .. }));
    }
}
