// ==========================================
// 销售数据仓库 - 文件解析器实现
// ==========================================
// 依据: 铜层抽取文件（CRM / ERP 导出）
// 支持: Excel (.xlsx) / CSV (.csv)
// 红线: 只规整表头，单元格值原样保留（首尾空白属于待检测的质量问题）
//       Excel 日期单元格按 YYYY-MM-DD 渲染，不输出序列号
// ==========================================

use crate::cleansing::cleansing_trait::FileParser;
use crate::cleansing::error::{CleansingError, CleansingResult};
use calamine::{open_workbook, Data, Reader, Xlsx};
use chrono::Timelike;
use csv::ReaderBuilder;
use std::collections::HashMap;
use std::fs::File;
use std::path::Path;

/// 支持的扩展名（按优先级）
pub const SUPPORTED_EXTENSIONS: [&str; 2] = ["csv", "xlsx"];

fn normalize_header(header: &str) -> String {
    header.trim().trim_start_matches('\u{feff}').trim().to_lowercase()
}

/// Excel 单元格 → 文本
///
/// # 规则
/// - 日期格式单元格: 零点 → `%Y-%m-%d`，否则 `%Y-%m-%d %H:%M:%S`
/// - 其余单元格沿用 calamine 的文本形式
fn cell_text(cell: &Data) -> String {
    match cell {
        Data::DateTime(d) => match d.as_datetime() {
            Some(dt) if dt.num_seconds_from_midnight() == 0 => dt.format("%Y-%m-%d").to_string(),
            Some(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
            None => cell.to_string(),
        },
        other => other.to_string(),
    }
}

// ==========================================
// CSV Parser 实现
// ==========================================
pub struct CsvParser;

impl FileParser for CsvParser {
    fn parse_to_raw_records(
        &self,
        file_path: &Path,
    ) -> CleansingResult<Vec<HashMap<String, String>>> {
        let path = file_path;

        if !path.exists() {
            return Err(CleansingError::FileNotFound(path.display().to_string()));
        }

        if let Some(ext) = path.extension() {
            if !ext.eq_ignore_ascii_case("csv") {
                return Err(CleansingError::UnsupportedFormat(
                    ext.to_string_lossy().to_string(),
                ));
            }
        }

        let file = File::open(path)?;
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true) // 允许行长度不一致
            .trim(csv::Trim::None)
            .from_reader(file);

        // 表头统一小写，匹配时大小写不敏感
        let headers: Vec<String> = reader.headers()?.iter().map(normalize_header).collect();

        let mut records = Vec::new();
        for result in reader.records() {
            let record = result?;
            let mut row_map = HashMap::new();

            for (col_idx, value) in record.iter().enumerate() {
                if let Some(header) = headers.get(col_idx) {
                    row_map.insert(header.clone(), value.to_string());
                }
            }

            // 跳过完全空白的行
            if row_map.values().all(|v| v.trim().is_empty()) {
                continue;
            }

            records.push(row_map);
        }

        Ok(records)
    }
}

// ==========================================
// Excel Parser 实现
// ==========================================
pub struct ExcelParser;

impl FileParser for ExcelParser {
    fn parse_to_raw_records(
        &self,
        file_path: &Path,
    ) -> CleansingResult<Vec<HashMap<String, String>>> {
        let path = file_path;

        if !path.exists() {
            return Err(CleansingError::FileNotFound(path.display().to_string()));
        }

        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();
        if ext != "xlsx" {
            return Err(CleansingError::UnsupportedFormat(ext));
        }

        let mut workbook: Xlsx<_> = open_workbook(path)
            .map_err(|e: calamine::XlsxError| CleansingError::ExcelParseError(e.to_string()))?;

        // 只读第一个 sheet
        let sheet_name = workbook
            .sheet_names()
            .first()
            .cloned()
            .ok_or_else(|| CleansingError::ExcelParseError("Excel 文件无工作表".to_string()))?;

        let range = workbook
            .worksheet_range(&sheet_name)
            .map_err(|e| CleansingError::ExcelParseError(e.to_string()))?;

        let mut rows = range.rows();
        let header_row = rows
            .next()
            .ok_or_else(|| CleansingError::ExcelParseError("Excel 文件无数据行".to_string()))?;

        let headers: Vec<String> = header_row
            .iter()
            .map(|cell| normalize_header(&cell_text(cell)))
            .collect();

        let mut records = Vec::new();
        for data_row in rows {
            let mut row_map = HashMap::new();

            for (col_idx, cell) in data_row.iter().enumerate() {
                if let Some(header) = headers.get(col_idx) {
                    row_map.insert(header.clone(), cell_text(cell));
                }
            }

            if row_map.values().all(|v| v.trim().is_empty()) {
                continue;
            }

            records.push(row_map);
        }

        Ok(records)
    }
}

// ==========================================
// 通用文件解析器（根据扩展名自动选择）
// ==========================================
pub struct UniversalFileParser;

impl UniversalFileParser {
    pub fn parse<P: AsRef<Path>>(
        &self,
        file_path: P,
    ) -> CleansingResult<Vec<HashMap<String, String>>> {
        let path = file_path.as_ref();
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();

        match ext.as_str() {
            "csv" => CsvParser.parse_to_raw_records(path),
            "xlsx" => ExcelParser.parse_to_raw_records(path),
            _ => Err(CleansingError::UnsupportedFormat(ext)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::Builder;

    fn csv_file(lines: &[&str]) -> tempfile::NamedTempFile {
        let mut temp_file = Builder::new().suffix(".csv").tempfile().unwrap();
        for line in lines {
            writeln!(temp_file, "{}", line).unwrap();
        }
        temp_file
    }

    #[test]
    fn test_csv_parser_keeps_cell_padding() {
        let temp_file = csv_file(&[
            "cst_id,cst_key,cst_firstname",
            "11000,AW00011000,  Jon ",
        ]);

        let records = CsvParser.parse_to_raw_records(temp_file.path()).unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].get("cst_id"), Some(&"11000".to_string()));
        assert_eq!(records[0].get("cst_firstname"), Some(&"  Jon ".to_string()));
    }

    #[test]
    fn test_csv_parser_normalizes_headers() {
        let temp_file = csv_file(&[" CID ,CNTRY", "AW-00011000,DE"]);

        let records = CsvParser.parse_to_raw_records(temp_file.path()).unwrap();

        assert_eq!(records[0].get("cid"), Some(&"AW-00011000".to_string()));
        assert_eq!(records[0].get("cntry"), Some(&"DE".to_string()));
    }

    #[test]
    fn test_csv_parser_file_not_found() {
        let result = CsvParser.parse_to_raw_records(Path::new("non_existent.csv"));
        assert!(matches!(result, Err(CleansingError::FileNotFound(_))));
    }

    #[test]
    fn test_csv_parser_skip_empty_rows() {
        let temp_file = csv_file(&["id,cat", "AC_BR,Accessories", ",", "BI_MB,Bikes"]);

        let records = CsvParser.parse_to_raw_records(temp_file.path()).unwrap();

        assert_eq!(records.len(), 2);
    }

    #[test]
    fn test_excel_parser_renders_date_cells() {
        let fixture = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/cust_info.xlsx");

        let records = UniversalFileParser.parse(&fixture).unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].get("cst_id"), Some(&"11000".to_string()));
        assert_eq!(records[0].get("cst_key"), Some(&"AW00011000".to_string()));
        // 序列号 40909 (numFmtId 14)
        assert_eq!(records[0].get("cst_create_date"), Some(&"2012-01-01".to_string()));
        // 序列号 45937.5 (numFmtId 22)
        assert_eq!(
            records[1].get("cst_create_date"),
            Some(&"2025-10-07 12:00:00".to_string())
        );
    }

    #[test]
    fn test_universal_parser_rejects_unknown_extension() {
        let result = UniversalFileParser.parse("bronze/cust_info.json");
        assert!(matches!(result, Err(CleansingError::UnsupportedFormat(_))));
    }
}
