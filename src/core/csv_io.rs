use crate::domain::model::{Granularity, ProcessedFile, Table, Value};
use crate::utils::error::Result;
use std::io::{Cursor, Write};
use zip::write::{SimpleFileOptions, ZipWriter};
use zip::CompressionMethod;

/// Parses CSV bytes into a table. Every cell is kept as text; empty cells are null.
pub fn read_table(bytes: &[u8]) -> Result<Table> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::Headers)
        .from_reader(bytes);

    let columns: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').to_string())
        .collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let row = record
            .iter()
            .map(|cell| {
                if cell.trim().is_empty() {
                    Value::Null
                } else {
                    Value::Text(cell.to_string())
                }
            })
            .collect();
        rows.push(row);
    }

    Ok(Table::with_rows(columns, rows))
}

/// Serializes a table with a header row; nulls are written as empty fields.
pub fn write_table(table: &Table) -> Result<String> {
    let mut writer = csv::WriterBuilder::new().from_writer(Vec::new());
    writer.write_record(&table.columns)?;
    for row in &table.rows {
        writer.write_record(row.iter().map(Value::render))?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| std::io::Error::other(e.to_string()))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

pub fn output_name(stem: &str, granularity: Granularity) -> String {
    format!("{}{}", stem, granularity.output_suffix())
}

pub fn default_archive_name(granularity: Granularity) -> String {
    format!("processed_data_{}.zip", granularity)
}

/// Bundles every processed CSV into one deflate-compressed ZIP archive.
pub fn build_archive(files: &[ProcessedFile]) -> Result<Vec<u8>> {
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));

    for file in files {
        zip.start_file(file.output_name.as_str(), options)?;
        zip.write_all(file.csv.as_bytes())?;
    }

    // 完成並取回底層 Vec<u8>
    let cursor = zip.finish()?;
    Ok(cursor.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    #[test]
    fn test_read_table_keeps_text_and_nulls() {
        let csv = "time_stamp,pm2.5_atm,humidity,sensor_index\n2024-01-01T05:00:00Z,10,,0042\n";
        let table = read_table(csv.as_bytes()).unwrap();

        assert_eq!(table.columns, vec!["time_stamp", "pm2.5_atm", "humidity", "sensor_index"]);
        assert_eq!(table.len(), 1);
        assert!(table.rows[0][2].is_null());
        assert_eq!(table.rows[0][3], Value::Text("0042".to_string()));
    }

    #[test]
    fn test_read_table_strips_bom() {
        let csv = "\u{feff}time_stamp,humidity\n2024-01-01,1\n";
        let table = read_table(csv.as_bytes()).unwrap();
        assert_eq!(table.columns[0], "time_stamp");
    }

    #[test]
    fn test_ragged_rows_are_csv_errors() {
        let csv = "a,b\n1,2,3\n";
        assert!(read_table(csv.as_bytes()).is_err());
    }

    #[test]
    fn test_write_table_renders_nulls_as_empty() {
        let table = Table::with_rows(
            vec!["a".to_string(), "b".to_string()],
            vec![
                vec![Value::Text("x".to_string()), Value::Null],
                vec![Value::Null, Value::Number(6.5)],
            ],
        );
        assert_eq!(write_table(&table).unwrap(), "a,b\nx,\n,6.5\n");
    }

    #[test]
    fn test_write_empty_table_has_header_only() {
        let table = Table::new(vec!["time_stamp".to_string(), "pm2.5_corr".to_string()]);
        assert_eq!(write_table(&table).unwrap(), "time_stamp,pm2.5_corr\n");
    }

    #[test]
    fn test_archive_entries_use_deflate() {
        let file = ProcessedFile {
            source_name: "a.csv".to_string(),
            output_name: output_name("a", Granularity::Hourly),
            input_rows: 0,
            table: Table::default(),
            csv: "time_stamp\n".to_string(),
            warnings: vec![],
        };
        let bytes = build_archive(&[file]).unwrap();

        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        assert_eq!(archive.len(), 1);
        let mut entry = archive.by_name("a_processed_data_hourly.csv").unwrap();
        assert_eq!(entry.compression(), CompressionMethod::Deflated);
        let mut content = String::new();
        entry.read_to_string(&mut content).unwrap();
        assert_eq!(content, "time_stamp\n");
    }
}
