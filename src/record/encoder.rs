use log::{info, warn};
use std::fs::File;
use std::io::Read;
use std::path::Path;

use super::error::{RecordError, RecordResult};
use super::page::HeapPage;
use super::record::Record;
use super::schema::Schema;
use crate::file::PagedFile;

/// Counts reported after a heap file is written
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodeStats {
    pub records: usize,
    pub pages: usize,
}

/// Writes new heap files page by page
pub struct HeapFileEncoder;

impl HeapFileEncoder {
    /// Pack `records` into a new heap file at `path`
    pub fn write_records<P, I>(path: P, schema: &Schema, records: I) -> RecordResult<EncodeStats>
    where
        P: AsRef<Path>,
        I: IntoIterator<Item = Record>,
    {
        Self::write_fallible(path, schema, records.into_iter().map(Ok))
    }

    /// Load a headerless CSV file into a new heap file
    pub fn convert_csv<P, Q>(
        csv_path: P,
        path: Q,
        schema: &Schema,
        delimiter: u8,
    ) -> RecordResult<EncodeStats>
    where
        P: AsRef<Path>,
        Q: AsRef<Path>,
    {
        let file = File::open(csv_path.as_ref())?;
        let stats = Self::convert_reader(file, path, schema, delimiter)?;
        info!(
            "Loaded {} records ({} pages) from {}",
            stats.records,
            stats.pages,
            csv_path.as_ref().display()
        );
        Ok(stats)
    }

    /// Same as `convert_csv` but reading rows from any reader
    pub fn convert_reader<R, Q>(
        reader: R,
        path: Q,
        schema: &Schema,
        delimiter: u8,
    ) -> RecordResult<EncodeStats>
    where
        R: Read,
        Q: AsRef<Path>,
    {
        let mut csv_reader = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(false)
            .from_reader(reader);

        let rows = csv_reader.records().map(|row| {
            let row = row?;
            if row.len() != schema.field_count() {
                return Err(RecordError::SchemaMismatch(format!(
                    "Expected {} fields, got {} in row {:?}",
                    schema.field_count(),
                    row.len(),
                    row
                )));
            }

            let values = row
                .iter()
                .zip(schema.fields())
                .map(|(cell, field)| field.data_type.parse_value(cell))
                .collect::<RecordResult<Vec<_>>>()?;
            Ok(Record::new(values))
        });

        Self::write_fallible(path, schema, rows)
    }

    fn write_fallible<P, I>(path: P, schema: &Schema, records: I) -> RecordResult<EncodeStats>
    where
        P: AsRef<Path>,
        I: Iterator<Item = RecordResult<Record>>,
    {
        let slots_per_page = HeapPage::calculate_slot_count(schema.byte_width());
        if slots_per_page == 0 {
            return Err(RecordError::RecordTooLarge(schema.byte_width()));
        }

        let path = path.as_ref();
        let mut file = PagedFile::create(path)?;
        match Self::fill(&mut file, schema, slots_per_page, records) {
            Ok(stats) => Ok(stats),
            Err(err) => {
                // Leave no partial file behind
                drop(file);
                if let Err(remove_err) = std::fs::remove_file(path) {
                    warn!("Cannot remove partial file {}: {}", path.display(), remove_err);
                }
                Err(err)
            }
        }
    }

    fn fill<I>(
        file: &mut PagedFile,
        schema: &Schema,
        slots_per_page: usize,
        records: I,
    ) -> RecordResult<EncodeStats>
    where
        I: Iterator<Item = RecordResult<Record>>,
    {
        let mut stats = EncodeStats {
            records: 0,
            pages: 0,
        };
        let mut batch = Vec::with_capacity(slots_per_page);

        for record in records {
            batch.push(record?);
            if batch.len() == slots_per_page {
                file.write_page(stats.pages, &HeapPage::encode(schema, &batch)?)?;
                stats.records += batch.len();
                stats.pages += 1;
                batch.clear();
            }
        }

        if !batch.is_empty() {
            file.write_page(stats.pages, &HeapPage::encode(schema, &batch)?)?;
            stats.records += batch.len();
            stats.pages += 1;
        }

        file.sync()?;
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file::PAGE_SIZE;
    use crate::record::{DataType, Value};

    fn int_schema() -> Schema {
        Schema::named(vec![(DataType::Int, "a"), (DataType::Int, "b")]).unwrap()
    }

    #[test]
    fn test_write_records_fills_pages() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("t.dat");
        let schema = int_schema();
        let per_page = HeapPage::calculate_slot_count(schema.byte_width());

        let records = (0..(per_page as i32 + 1))
            .map(|i| Record::new(vec![Value::Int(i), Value::Int(-i)]));
        let stats = HeapFileEncoder::write_records(&path, &schema, records).unwrap();

        assert_eq!(stats.records, per_page + 1);
        assert_eq!(stats.pages, 2);
        assert_eq!(
            std::fs::metadata(&path).unwrap().len(),
            (2 * PAGE_SIZE) as u64
        );
    }

    #[test]
    fn test_write_refuses_existing_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("t.dat");
        HeapFileEncoder::write_records(&path, &int_schema(), Vec::new()).unwrap();
        assert!(HeapFileEncoder::write_records(&path, &int_schema(), Vec::new()).is_err());
    }

    #[test]
    fn test_convert_reader() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("people.dat");
        let schema = Schema::named(vec![(DataType::Int, "id"), (DataType::Text(8), "name")]).unwrap();

        let csv = "1|alice\n2|bob\n3|\n";
        let stats = HeapFileEncoder::convert_reader(csv.as_bytes(), &path, &schema, b'|').unwrap();
        assert_eq!(
            stats,
            EncodeStats {
                records: 3,
                pages: 1
            }
        );
    }

    #[test]
    fn test_convert_reader_rejects_bad_rows() {
        let temp_dir = tempfile::tempdir().unwrap();
        let schema = int_schema();

        let short = HeapFileEncoder::convert_reader(
            "1,2\n3\n".as_bytes(),
            temp_dir.path().join("short.dat"),
            &schema,
            b',',
        );
        assert!(short.is_err());

        let not_int = HeapFileEncoder::convert_reader(
            "1,x\n".as_bytes(),
            temp_dir.path().join("not_int.dat"),
            &schema,
            b',',
        );
        assert!(matches!(not_int, Err(RecordError::TypeMismatch { .. })));
        assert!(!temp_dir.path().join("short.dat").exists());
        assert!(!temp_dir.path().join("not_int.dat").exists());
    }

    #[test]
    fn test_failed_convert_can_be_retried() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("retry.dat");
        let schema = Schema::named(vec![(DataType::Int, "id"), (DataType::Text(4), "tag")]).unwrap();

        let bad = "1,a\n2,b\nnotanint,c\n";
        let failed = HeapFileEncoder::convert_reader(bad.as_bytes(), &path, &schema, b',');
        assert!(matches!(failed, Err(RecordError::TypeMismatch { .. })));
        assert!(!path.exists());

        let good = "1,a\n2,b\n3,c\n";
        let stats = HeapFileEncoder::convert_reader(good.as_bytes(), &path, &schema, b',').unwrap();
        assert_eq!(stats.records, 3);
        assert!(path.exists());
    }

    #[test]
    fn test_convert_csv_from_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let csv_path = temp_dir.path().join("in.csv");
        std::fs::write(&csv_path, "10,20\n30,40\n").unwrap();

        let stats = HeapFileEncoder::convert_csv(
            &csv_path,
            temp_dir.path().join("out.dat"),
            &int_schema(),
            b',',
        )
        .unwrap();
        assert_eq!(stats.records, 2);
    }
}
