//! Incremental CSV encoding over an upload stream.

use crate::export::shape::ExportRow;
use crate::upload::{UploadError, UploadStream};
use bytes::Bytes;
use tracing::warn;

/// Streams shaped rows as CSV into one artifact upload. The header is
/// emitted with the first batch; the column order is fixed for the life
/// of the writer.
pub struct CsvStreamWriter {
    key: String,
    stream: Box<dyn UploadStream>,
    columns: Vec<String>,
    wrote_header: bool,
    write_failed: bool,
}

impl CsvStreamWriter {
    pub fn new(key: impl Into<String>, stream: Box<dyn UploadStream>, columns: Vec<String>) -> Self {
        CsvStreamWriter {
            key: key.into(),
            stream,
            columns,
            wrote_header: false,
            write_failed: false,
        }
    }

    /// Encode and send a batch of rows. A failed send is logged and the
    /// writer keeps accepting batches; the artifact may come out truncated
    /// but the job carries on, matching the long-standing export behavior.
    pub async fn write_rows(&mut self, rows: &[ExportRow]) -> Result<(), UploadError> {
        if rows.is_empty() {
            return Ok(());
        }

        let mut buffer = Vec::new();
        {
            let mut encoder = csv::Writer::from_writer(&mut buffer);
            if !self.wrote_header {
                if let Err(e) = encoder.write_record(&self.columns) {
                    warn!(key = %self.key, error = %e, "Failed to encode CSV header");
                    self.write_failed = true;
                    return Ok(());
                }
                self.wrote_header = true;
            }
            for row in rows {
                let record = self
                    .columns
                    .iter()
                    .map(|column| row.get(column).map(String::as_str).unwrap_or(""));
                if let Err(e) = encoder.write_record(record) {
                    warn!(key = %self.key, error = %e, "Failed to encode CSV row");
                    self.write_failed = true;
                    return Ok(());
                }
            }
            if let Err(e) = encoder.flush() {
                warn!(key = %self.key, error = %e, "Failed to flush CSV encoder");
                self.write_failed = true;
                return Ok(());
            }
        }

        if let Err(e) = self.stream.write(Bytes::from(buffer)).await {
            warn!(key = %self.key, error = %e, "Failed to stream CSV chunk; artifact may be truncated");
            self.write_failed = true;
        }
        Ok(())
    }

    /// Finalize the upload and return the artifact URL.
    pub async fn close(mut self) -> Result<String, UploadError> {
        if !self.wrote_header {
            // Header-only artifact for empty result sets.
            let mut buffer = Vec::new();
            {
                let mut encoder = csv::Writer::from_writer(&mut buffer);
                if let Err(e) = encoder.write_record(&self.columns) {
                    warn!(key = %self.key, error = %e, "Failed to encode CSV header");
                }
            }
            if let Err(e) = self.stream.write(Bytes::from(buffer)).await {
                warn!(key = %self.key, error = %e, "Failed to stream CSV header");
            }
        }
        if self.write_failed {
            warn!(key = %self.key, "One or more CSV batches were dropped; artifact is incomplete");
        }
        self.stream.finish().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::upload::{MemoryUploadStore, UploadStore};
    use std::collections::HashMap;

    fn row(pairs: &[(&str, &str)]) -> ExportRow {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect::<HashMap<_, _>>()
    }

    #[tokio::test]
    async fn header_is_written_once_and_columns_stay_ordered() {
        let uploads = MemoryUploadStore::new();
        let stream = uploads.begin("out.csv").await.unwrap();
        let columns = vec!["a".to_string(), "b".to_string()];
        let mut writer = CsvStreamWriter::new("out.csv", stream, columns);

        writer
            .write_rows(&[row(&[("a", "1"), ("b", "2")])])
            .await
            .unwrap();
        writer
            .write_rows(&[row(&[("b", "4"), ("a", "3")])])
            .await
            .unwrap();
        let url = writer.close().await.unwrap();

        assert_eq!(url, "memory://out.csv");
        let content = String::from_utf8(uploads.object("out.csv").unwrap()).unwrap();
        assert_eq!(content, "a,b\n1,2\n3,4\n");
    }

    #[tokio::test]
    async fn missing_cells_render_as_empty_fields() {
        let uploads = MemoryUploadStore::new();
        let stream = uploads.begin("out.csv").await.unwrap();
        let columns = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        let mut writer = CsvStreamWriter::new("out.csv", stream, columns);

        writer.write_rows(&[row(&[("a", "1")])]).await.unwrap();
        writer.close().await.unwrap();

        let content = String::from_utf8(uploads.object("out.csv").unwrap()).unwrap();
        assert_eq!(content, "a,b,c\n1,,\n");
    }

    #[tokio::test]
    async fn empty_result_set_still_produces_a_header() {
        let uploads = MemoryUploadStore::new();
        let stream = uploads.begin("out.csv").await.unwrap();
        let writer = CsvStreamWriter::new(
            "out.csv",
            stream,
            vec!["a".to_string(), "b".to_string()],
        );
        writer.close().await.unwrap();

        let content = String::from_utf8(uploads.object("out.csv").unwrap()).unwrap();
        assert_eq!(content, "a,b\n");
    }
}
