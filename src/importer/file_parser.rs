// ==========================================
// 饲料搅拌批次偏差分析系统 - 文件解析器实现
// ==========================================
// 支持: Excel (.xlsx/.xls/.ods) / CSV (.csv)
// 预处理: 跳过前导行 → 取表头 → 删除首列 → 删除指定列
// ==========================================

use crate::config::IngestOptions;
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::importer_trait::{FileParser, RawRow, RawTable};
use calamine::{open_workbook_auto, Data, DataType, Reader};
use csv::ReaderBuilder;
use std::collections::HashMap;
use std::path::Path;
use tracing::debug;

// ==========================================
// CSV Parser 实现
// ==========================================
pub struct CsvParser;

impl FileParser for CsvParser {
    fn parse(&self, file_path: &Path, options: &IngestOptions) -> ImportResult<RawTable> {
        let path = file_path;

        // 检查文件存在
        if !path.exists() {
            return Err(ImportError::FileNotFound(path.display().to_string()));
        }

        // 检查扩展名
        let ext = extension_of(path);
        if ext != "csv" {
            return Err(ImportError::UnsupportedFormat(ext));
        }

        // 称重系统导出的 CSV 可能不是 UTF-8，按有损方式解码
        let bytes = std::fs::read(path)?;
        let content = String::from_utf8_lossy(&bytes);
        let delimiter = detect_delimiter(&content, options.skip_rows);

        let mut reader = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true) // 允许行长度不一致
            .delimiter(delimiter)
            .from_reader(content.as_bytes());

        let mut grid = Vec::new();
        for result in reader.records() {
            let record = result?;
            grid.push(record.iter().map(|v| v.trim().to_string()).collect());
        }

        debug!(rows = grid.len(), delimiter = %(delimiter as char), "CSV 读取完成");
        build_table(grid, options)
    }
}

/// 在表头行上比较 ';' 与 ',' 的出现次数
fn detect_delimiter(content: &str, skip_rows: usize) -> u8 {
    let header_line = content.lines().nth(skip_rows).unwrap_or("");
    let semicolons = header_line.matches(';').count();
    let commas = header_line.matches(',').count();
    if semicolons > commas {
        b';'
    } else {
        b','
    }
}

// ==========================================
// Excel Parser 实现
// ==========================================
pub struct ExcelParser;

impl FileParser for ExcelParser {
    fn parse(&self, file_path: &Path, options: &IngestOptions) -> ImportResult<RawTable> {
        let path = file_path;

        // 检查文件存在
        if !path.exists() {
            return Err(ImportError::FileNotFound(path.display().to_string()));
        }

        // 检查扩展名
        let ext = extension_of(path);
        if !matches!(ext.as_str(), "xlsx" | "xls" | "xlsm" | "ods") {
            return Err(ImportError::UnsupportedFormat(ext));
        }

        // 打开工作簿
        let mut workbook = open_workbook_auto(path)?;

        // 默认读取第一个 sheet
        let sheet_names = workbook.sheet_names();
        let sheet_name = match &options.sheet_name {
            Some(name) => {
                if !sheet_names.iter().any(|s| s == name) {
                    return Err(ImportError::SheetNotFound(name.clone()));
                }
                name.clone()
            }
            None => sheet_names
                .first()
                .cloned()
                .ok_or_else(|| ImportError::ExcelParseError("Excel 文件无工作表".to_string()))?,
        };

        let range = workbook.worksheet_range(&sheet_name)?;

        let grid: Vec<Vec<String>> = range
            .rows()
            .map(|row| row.iter().map(cell_to_string).collect())
            .collect();

        debug!(sheet = %sheet_name, rows = grid.len(), "Excel 读取完成");
        build_table(grid, options)
    }
}

/// 单元格转文本；日期单元格统一为 "YYYY-MM-DD HH:MM:SS"
fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::DateTime(_) | Data::DateTimeIso(_) => cell
            .as_datetime()
            .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| cell.to_string()),
        _ => cell.to_string().trim().to_string(),
    }
}

// ==========================================
// 通用文件解析器（根据扩展名自动选择）
// ==========================================
pub struct UniversalFileParser;

impl FileParser for UniversalFileParser {
    fn parse(&self, file_path: &Path, options: &IngestOptions) -> ImportResult<RawTable> {
        match extension_of(file_path).as_str() {
            "csv" => CsvParser.parse(file_path, options),
            "xlsx" | "xls" | "xlsm" | "ods" => ExcelParser.parse(file_path, options),
            other => Err(ImportError::UnsupportedFormat(other.to_string())),
        }
    }
}

fn extension_of(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase()
}

// ==========================================
// 预处理：网格 → 原始表
// ==========================================
pub(crate) fn build_table(grid: Vec<Vec<String>>, options: &IngestOptions) -> ImportResult<RawTable> {
    let mut rows = grid.into_iter().skip(options.skip_rows);

    let header_row = rows.next().ok_or(ImportError::MissingHeader {
        skipped: options.skip_rows,
    })?;

    // 需要保留的列下标
    let first_col = usize::from(options.remove_first_column);
    let kept: Vec<(usize, String)> = header_row
        .into_iter()
        .enumerate()
        .skip(first_col)
        .map(|(idx, h)| (idx, h.trim().to_string()))
        .filter(|(_, h)| !options.columns_to_remove.iter().any(|c| c == h))
        .collect();

    let headers: Vec<String> = kept.iter().map(|(_, h)| h.clone()).collect();

    // 行号: 跳过行 + 表头行 + 数据行序号（从 1 开始）
    let first_data_row = options.skip_rows + 2;
    let mut records = Vec::new();
    for (offset, data_row) in rows.enumerate() {
        let mut cells = HashMap::new();
        for (idx, header) in &kept {
            if header.is_empty() {
                continue;
            }
            let value = data_row.get(*idx).map(|v| v.trim()).unwrap_or("");
            cells.insert(header.clone(), value.to_string());
        }

        // 跳过完全空白的行
        if cells.values().all(|v| v.is_empty()) {
            continue;
        }

        records.push(RawRow {
            row_number: first_data_row + offset,
            cells,
        });
    }

    Ok(RawTable {
        headers,
        rows: records,
    })
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
    fn test_csv_parser_valid_file() {
        let temp_file = csv_file(&[
            "COD. BATIDA,TIPO,PREVISTO (KG)",
            "1001,VOLUMOSO,100",
            "1001,CONCENTRADO,150.5",
        ]);

        let table = CsvParser
            .parse(temp_file.path(), &IngestOptions::default())
            .unwrap();

        assert_eq!(table.headers, vec!["COD. BATIDA", "TIPO", "PREVISTO (KG)"]);
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[1].get("PREVISTO (KG)"), Some("150.5"));
        assert_eq!(table.rows[0].row_number, 2);
    }

    #[test]
    fn test_csv_parser_file_not_found() {
        let result = CsvParser.parse(Path::new("non_existent.csv"), &IngestOptions::default());
        assert!(matches!(result, Err(ImportError::FileNotFound(_))));
    }

    #[test]
    fn test_csv_parser_semicolon_delimiter() {
        let temp_file = csv_file(&["A;B;C", "1;2,5;x"]);
        let table = CsvParser
            .parse(temp_file.path(), &IngestOptions::default())
            .unwrap();
        assert_eq!(table.headers, vec!["A", "B", "C"]);
        assert_eq!(table.rows[0].get("B"), Some("2,5"));
    }

    #[test]
    fn test_csv_parser_skip_empty_rows() {
        let temp_file = csv_file(&["A,B", "1,2", ",", "3,4"]);
        let table = CsvParser
            .parse(temp_file.path(), &IngestOptions::default())
            .unwrap();

        // 应跳过空行
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[1].row_number, 4);
    }

    #[test]
    fn test_preprocessing_skip_rows_and_remove_columns() {
        let grid = vec![
            vec!["Relatório de batidas".to_string()],
            vec!["".to_string()],
            vec!["#".into(), "A".into(), "LIXO".into(), "B".into()],
            vec!["1".into(), "a1".into(), "z".into(), "b1".into()],
        ];
        let options = IngestOptions {
            skip_rows: 2,
            remove_first_column: true,
            columns_to_remove: vec!["LIXO".to_string()],
            sheet_name: None,
        };

        let table = build_table(grid, &options).unwrap();
        assert_eq!(table.headers, vec!["A", "B"]);
        assert_eq!(table.rows.len(), 1);
        assert_eq!(table.rows[0].get("A"), Some("a1"));
        assert_eq!(table.rows[0].get("LIXO"), None);
        assert_eq!(table.rows[0].row_number, 4);
    }

    #[test]
    fn test_preprocessing_missing_header() {
        let options = IngestOptions {
            skip_rows: 3,
            ..Default::default()
        };
        let result = build_table(vec![vec!["A".to_string()]], &options);
        assert!(matches!(result, Err(ImportError::MissingHeader { skipped: 3 })));
    }

    #[test]
    fn test_universal_parser_rejects_unknown_extension() {
        let result = UniversalFileParser.parse(Path::new("dados.txt"), &IngestOptions::default());
        assert!(matches!(result, Err(ImportError::UnsupportedFormat(ext)) if ext == "txt"));
    }
}
