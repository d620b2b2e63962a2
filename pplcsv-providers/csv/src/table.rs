//! In-memory CSV table with column extraction and atomic write-back.
use std::{
    fs::{self, File},
    io::{self, BufReader, Read, Write},
    path::Path,
};

use csv::{ReaderBuilder, StringRecord, WriterBuilder};
use tempfile::NamedTempFile;
use tracing::{Span, debug, field, info, instrument};

use crate::errors::CsvProviderError;

/// How [`CsvTable::set_column`] placed the values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnPlacement {
    /// A new column was added after the existing ones.
    Appended,
    /// An existing column with the same name was overwritten in place.
    Replaced,
}

/// Header plus data rows of a delimited file, held in memory.
///
/// Every row has one field per header; ragged input is rejected while
/// loading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvTable {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
    delimiter: u8,
}

impl CsvTable {
    /// Loads a table from the file at `path`.
    ///
    /// # Errors
    /// Returns [`CsvProviderError::Open`] when the file cannot be opened and
    /// any error surfaced by [`Self::from_reader`].
    #[instrument(name = "csv.load", err, fields(path = field::Empty, rows = field::Empty))]
    pub fn from_path(path: &Path, delimiter: u8) -> Result<Self, CsvProviderError> {
        let span = Span::current();
        span.record("path", field::display(path.display()));
        let file = File::open(path).map_err(|source| CsvProviderError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        let table = Self::from_reader(BufReader::new(file), delimiter)?;
        span.record("rows", table.len());
        Ok(table)
    }

    /// Loads a table from any reader producing delimited UTF-8 text.
    ///
    /// # Errors
    /// Returns [`CsvProviderError::MissingHeader`] for empty input and
    /// [`CsvProviderError::Csv`] for malformed or ragged records.
    ///
    /// # Examples
    /// ```
    /// use pplcsv_providers_csv::CsvTable;
    ///
    /// let table = CsvTable::from_reader("id;sentence\n1;hello world\n".as_bytes(), b';')?;
    /// assert_eq!(table.headers(), ["id", "sentence"]);
    /// assert_eq!(table.column("sentence")?, ["hello world"]);
    /// # Ok::<(), pplcsv_providers_csv::CsvProviderError>(())
    /// ```
    pub fn from_reader<R: Read>(reader: R, delimiter: u8) -> Result<Self, CsvProviderError> {
        let mut reader = ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(true)
            .from_reader(reader);
        let headers = reader.headers()?.clone();
        if headers.is_empty() {
            return Err(CsvProviderError::MissingHeader);
        }
        let rows = reader
            .records()
            .map(|record| record.map(|record| to_fields(&record)))
            .collect::<Result<Vec<_>, _>>()?;
        debug!(columns = headers.len(), rows = rows.len(), "parsed csv table");
        Ok(Self {
            headers: to_fields(&headers),
            rows,
            delimiter,
        })
    }

    /// Returns the header names in file order.
    #[must_use]
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// Returns the number of data rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns whether the table has no data rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Returns the field delimiter used for reading and writing.
    #[must_use]
    pub fn delimiter(&self) -> u8 {
        self.delimiter
    }

    /// Returns the values of the column called `name`, one per row.
    ///
    /// # Errors
    /// Returns [`CsvProviderError::ColumnNotFound`] when the header has no such
    /// column.
    pub fn column(&self, name: &str) -> Result<Vec<String>, CsvProviderError> {
        let index = self.column_index(name)?;
        self.rows
            .iter()
            .enumerate()
            .map(|(row, fields)| {
                fields
                    .get(index)
                    .cloned()
                    .ok_or_else(|| CsvProviderError::MissingField {
                        row,
                        column: name.to_owned(),
                    })
            })
            .collect()
    }

    /// Reports where a score column called `name` would be stored.
    ///
    /// An absent column is appended. An existing column is only replaced when
    /// it is the last column and every cell is blank or numeric, which is
    /// what an earlier scoring run leaves behind.
    ///
    /// # Errors
    /// Returns [`CsvProviderError::ColumnConflict`] when `name` refers to any
    /// other existing column.
    ///
    /// # Examples
    /// ```
    /// use pplcsv_providers_csv::{ColumnPlacement, CsvTable};
    ///
    /// let table = CsvTable::from_reader("id,sentence,ppl\n1,hi,\n".as_bytes(), b',')?;
    /// assert_eq!(table.score_column_placement("ppl")?, ColumnPlacement::Replaced);
    /// assert_eq!(table.score_column_placement("new")?, ColumnPlacement::Appended);
    /// assert!(table.score_column_placement("id").is_err());
    /// # Ok::<(), pplcsv_providers_csv::CsvProviderError>(())
    /// ```
    pub fn score_column_placement(&self, name: &str) -> Result<ColumnPlacement, CsvProviderError> {
        let Ok(index) = self.column_index(name) else {
            return Ok(ColumnPlacement::Appended);
        };
        let is_last = index + 1 == self.headers.len();
        let holds_scores = self.rows.iter().all(|fields| {
            fields.get(index).is_none_or(|cell| {
                let cell = cell.trim();
                cell.is_empty() || cell.parse::<f64>().is_ok()
            })
        });
        if is_last && holds_scores {
            Ok(ColumnPlacement::Replaced)
        } else {
            Err(CsvProviderError::ColumnConflict {
                column: name.to_owned(),
            })
        }
    }

    /// Stores `values` under the column `name`.
    ///
    /// A new column is appended unless one with the same name exists, in
    /// which case its values are overwritten in place.
    ///
    /// # Errors
    /// Returns [`CsvProviderError::RowCountMismatch`] when `values` does not
    /// hold exactly one entry per row. The table is unchanged on error.
    ///
    /// # Examples
    /// ```
    /// use pplcsv_providers_csv::{ColumnPlacement, CsvTable};
    ///
    /// let mut table = CsvTable::from_reader("sentence\nhi\n".as_bytes(), b',')?;
    /// let placement = table.set_column("Perplexity", vec!["3.5".to_owned()])?;
    /// assert_eq!(placement, ColumnPlacement::Appended);
    /// let placement = table.set_column("Perplexity", vec!["3.5".to_owned()])?;
    /// assert_eq!(placement, ColumnPlacement::Replaced);
    /// assert_eq!(table.headers(), ["sentence", "Perplexity"]);
    /// # Ok::<(), pplcsv_providers_csv::CsvProviderError>(())
    /// ```
    pub fn set_column(
        &mut self,
        name: &str,
        values: Vec<String>,
    ) -> Result<ColumnPlacement, CsvProviderError> {
        if values.len() != self.rows.len() {
            return Err(CsvProviderError::RowCountMismatch {
                expected: self.rows.len(),
                actual: values.len(),
            });
        }
        match self.column_index(name) {
            Ok(index) => {
                for (row, (fields, value)) in self.rows.iter_mut().zip(values).enumerate() {
                    let slot = fields
                        .get_mut(index)
                        .ok_or_else(|| CsvProviderError::MissingField {
                            row,
                            column: name.to_owned(),
                        })?;
                    *slot = value;
                }
                Ok(ColumnPlacement::Replaced)
            }
            Err(_) => {
                self.headers.push(name.to_owned());
                for (fields, value) in self.rows.iter_mut().zip(values) {
                    fields.push(value);
                }
                Ok(ColumnPlacement::Appended)
            }
        }
    }

    /// Serialises the table, header first, to `writer`.
    ///
    /// # Errors
    /// Returns [`CsvProviderError::Csv`] or [`CsvProviderError::Io`] when
    /// writing fails.
    pub fn write_to<W: Write>(&self, writer: W) -> Result<(), CsvProviderError> {
        let mut writer = WriterBuilder::new()
            .delimiter(self.delimiter)
            .from_writer(writer);
        writer.write_record(&self.headers)?;
        for fields in &self.rows {
            writer.write_record(fields)?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Replaces the file at `path` with the serialised table.
    ///
    /// The table is written to a temporary file in the same directory and
    /// renamed over `path`, so readers never observe a half-written file and
    /// a failure leaves the original untouched.
    ///
    /// # Errors
    /// Returns [`CsvProviderError::Persist`] when the temporary file cannot be
    /// created or renamed, and any error surfaced by [`Self::write_to`].
    #[instrument(name = "csv.persist", err, skip(self), fields(path = field::Empty, rows = self.rows.len()))]
    pub fn persist(&self, path: &Path) -> Result<(), CsvProviderError> {
        Span::current().record("path", field::display(path.display()));
        let persist_error = |source: io::Error| CsvProviderError::Persist {
            path: path.to_path_buf(),
            source,
        };
        let directory = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut staged = NamedTempFile::new_in(directory).map_err(persist_error)?;
        self.write_to(staged.as_file_mut())?;
        staged.as_file().sync_all()?;
        if let Ok(metadata) = fs::metadata(path) {
            fs::set_permissions(staged.path(), metadata.permissions()).map_err(persist_error)?;
        }
        staged
            .persist(path)
            .map_err(|err| persist_error(err.error))?;
        info!(rows = self.rows.len(), columns = self.headers.len(), "csv written");
        Ok(())
    }

    fn column_index(&self, name: &str) -> Result<usize, CsvProviderError> {
        self.headers
            .iter()
            .position(|header| header == name)
            .ok_or_else(|| CsvProviderError::ColumnNotFound {
                column: name.to_owned(),
            })
    }
}

fn to_fields(record: &StringRecord) -> Vec<String> {
    record.iter().map(str::to_owned).collect()
}
