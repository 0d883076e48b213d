use std::fs;
use std::path::Path;

use rust_xlsxwriter::Workbook;
use serde::Serialize;
use takeoff_core::table::Table;

use crate::IoError;

pub const SHEET_NAME: &str = "Sheet1";
/// 这些列即使内容形似数字也按文本写入 xlsx。
pub const TEXT_COLUMNS: [&str; 7] = [
    "Room",
    "Room Name",
    "Layer",
    "Entity",
    "Source",
    "Material Type",
    "Label",
];

/// 以固定表头写出记录；记录为空时仍写出表头行。
pub fn write_records<T: Serialize>(
    path: &Path,
    headers: &[&str],
    records: &[T],
) -> Result<(), IoError> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());
    writer.write_record(headers).map_err(IoError::CsvEncode)?;
    for record in records {
        writer.serialize(record).map_err(IoError::CsvEncode)?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|err| IoError::CsvEncode(err.into_error().into()))?;
    write_bytes(path, &bytes)
}

/// 读取 CSV 为字符串表；行宽按表头补齐或截断。
pub fn read_table(path: &Path) -> Result<Table, IoError> {
    let csv_error = |source| IoError::CsvRead {
        path: path.to_path_buf(),
        source,
    };
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .map_err(csv_error)?;
    // Excel 另存的 CSV 以 BOM 开头
    let headers: Vec<String> = reader
        .headers()
        .map_err(csv_error)?
        .iter()
        .enumerate()
        .map(|(index, header)| match index {
            0 => header.trim_start_matches('\u{feff}').to_string(),
            _ => header.to_string(),
        })
        .collect();
    let width = headers.len();
    let mut table = Table::new(headers);
    for record in reader.records() {
        let record = record.map_err(csv_error)?;
        let mut row: Vec<String> = record.iter().take(width).map(str::to_string).collect();
        row.resize(width, String::new());
        table.push_row(row);
    }
    Ok(table)
}

pub fn render_csv(table: &Table) -> Result<Vec<u8>, IoError> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());
    writer
        .write_record(table.headers())
        .map_err(IoError::CsvEncode)?;
    for row in table.rows() {
        writer.write_record(row).map_err(IoError::CsvEncode)?;
    }
    writer
        .into_inner()
        .map_err(|err| IoError::CsvEncode(err.into_error().into()))
}

pub fn write_table(path: &Path, table: &Table) -> Result<(), IoError> {
    let bytes = render_csv(table)?;
    write_bytes(path, &bytes)
}

/// 单工作表 xlsx：表头为字符串，文本列原样保留，其余可解析为有限浮点数的单元格写为数字，空单元格留空。
pub fn render_xlsx(table: &Table) -> Result<Vec<u8>, IoError> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(SHEET_NAME)?;

    let text_columns: Vec<bool> = table
        .headers()
        .iter()
        .map(|header| TEXT_COLUMNS.contains(&header.trim()))
        .collect();
    for (column, header) in table.headers().iter().enumerate() {
        worksheet.write_string(0, column_number(column)?, header)?;
    }
    for (index, row) in table.rows().iter().enumerate() {
        let row_number = u32::try_from(index + 1)
            .map_err(|_| IoError::InvalidTable(format!("行数 {} 超出 xlsx 上限", index + 1)))?;
        for (column, cell) in row.iter().enumerate() {
            if cell.is_empty() {
                continue;
            }
            let numeric = !text_columns.get(column).copied().unwrap_or(false);
            let column = column_number(column)?;
            match cell.trim().parse::<f64>() {
                Ok(value) if numeric && value.is_finite() => {
                    worksheet.write_number(row_number, column, value)?;
                }
                _ => {
                    worksheet.write_string(row_number, column, cell)?;
                }
            }
        }
    }
    Ok(workbook.save_to_buffer()?)
}

fn column_number(index: usize) -> Result<u16, IoError> {
    u16::try_from(index)
        .map_err(|_| IoError::InvalidTable(format!("列数 {} 超出 xlsx 上限", index + 1)))
}

pub fn write_text(path: &Path, text: &str) -> Result<(), IoError> {
    write_bytes(path, text.as_bytes())
}

pub fn write_bytes(path: &Path, bytes: &[u8]) -> Result<(), IoError> {
    fs::write(path, bytes).map_err(|source| IoError::WriteError {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use calamine::{Data, Reader, Xlsx, open_workbook};

    #[derive(Serialize)]
    struct Row {
        #[serde(rename = "Room")]
        room: String,
        #[serde(rename = "X")]
        x: Option<f64>,
    }

    #[test]
    fn empty_records_still_write_headers() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("rooms.csv");
        write_records::<Row>(&path, &["Room", "X"], &[]).expect("write");
        assert_eq!(fs::read_to_string(&path).expect("read back"), "Room,X\n");
    }

    #[test]
    fn records_serialize_optional_fields_as_blank() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("rooms.csv");
        let rows = vec![
            Row {
                room: "Kitchen, North".to_string(),
                x: Some(12.5),
            },
            Row {
                room: "HATCH_2F".to_string(),
                x: None,
            },
        ];
        write_records(&path, &["Room", "X"], &rows).expect("write");
        assert_eq!(
            fs::read_to_string(&path).expect("read back"),
            "Room,X\n\"Kitchen, North\",12.5\nHATCH_2F,\n"
        );
    }

    #[test]
    fn ragged_rows_are_padded_to_header_width() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("ragged.csv");
        fs::write(&path, "Room,Area (sq ft),Note\nA,200\nB,0,x,extra\n").expect("seed");
        let table = read_table(&path).expect("read");
        assert_eq!(table.len(), 2);
        assert_eq!(table.rows()[0], vec!["A", "200", ""]);
        assert_eq!(table.rows()[1], vec!["B", "0", "x"]);
    }

    #[test]
    fn leading_byte_order_mark_is_dropped() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("excel.csv");
        fs::write(&path, "\u{feff}Room,Area (sq ft)\nA,200\n").expect("seed");
        let table = read_table(&path).expect("read");
        assert_eq!(table.headers(), ["Room", "Area (sq ft)"]);
        assert_eq!(table.column_index("Room"), Some(0));
    }

    #[test]
    fn csv_rendering_round_trips_through_reader() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("table.csv");
        let mut table = Table::new(["Room", "Area (sq ft)"]);
        table.push_row(vec!["Living \"Main\"".to_string(), "200.0".to_string()]);
        write_table(&path, &table).expect("write");
        assert_eq!(read_table(&path).expect("read"), table);
    }

    #[test]
    fn xlsx_cells_keep_numbers_numeric() {
        let mut table = Table::new(["Room", "Area (sq ft)", "Cement (bags)"]);
        table.push_row(vec!["A".to_string(), "200.0".to_string(), "16.0".to_string()]);
        table.push_row(vec!["B".to_string(), String::new(), "0.0".to_string()]);
        let bytes = render_xlsx(&table).expect("render");

        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("report.xlsx");
        fs::write(&path, bytes).expect("save");

        let mut workbook: Xlsx<_> = open_workbook(&path).expect("open xlsx");
        let range = workbook.worksheet_range(SHEET_NAME).expect("sheet exists");
        assert_eq!(range.get((0, 1)), Some(&Data::String("Area (sq ft)".to_string())));
        assert_eq!(range.get((1, 0)), Some(&Data::String("A".to_string())));
        assert_eq!(range.get((1, 2)), Some(&Data::Float(16.0)));
        assert_eq!(range.get((2, 1)), Some(&Data::Empty));
    }

    #[test]
    fn numeric_looking_room_labels_stay_text() {
        let mut table = Table::new(["Room", "Area (sq ft)"]);
        table.push_row(vec!["1E3".to_string(), "1E3".to_string()]);
        let bytes = render_xlsx(&table).expect("render");

        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("report.xlsx");
        fs::write(&path, bytes).expect("save");

        let mut workbook: Xlsx<_> = open_workbook(&path).expect("open xlsx");
        let range = workbook.worksheet_range(SHEET_NAME).expect("sheet exists");
        assert_eq!(range.get((1, 0)), Some(&Data::String("1E3".to_string())));
        assert_eq!(range.get((1, 1)), Some(&Data::Float(1000.0)));
    }
}
