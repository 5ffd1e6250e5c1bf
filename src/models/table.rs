//! 数据表模型
//!
//! 以字符串表格形式持有数据集（表头 + 行），提供 CSV 读写能力。
//! 整个运行期间由编排层独占持有。

use crate::error::{AppError, AppResult, DataError};
use tokio::fs;

/// 单元状态
///
/// 每个 (行, 分析) 单元独立流转 Pending → Success | Failed；
/// 成功文本写入数据表，失败信息记入错误日志
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellState {
    Pending,
    Success,
    Failed,
}

/// 数据表
#[derive(Debug, Clone)]
pub struct DataTable {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl DataTable {
    /// 创建只有表头的空表
    pub fn new(headers: Vec<String>) -> Self {
        Self {
            headers,
            rows: Vec::new(),
        }
    }

    /// 从 CSV 文本解析数据表
    ///
    /// 行长度与表头不一致时补空/截断，而不是报错
    pub fn from_csv_str(content: &str, path: &str) -> AppResult<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(content.as_bytes());

        let headers: Vec<String> = reader
            .headers()
            .map_err(|e| AppError::csv_failed(path, e))?
            .iter()
            .map(|h| h.to_string())
            .collect();

        let width = headers.len();
        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record.map_err(|e| AppError::csv_failed(path, e))?;
            let mut row: Vec<String> = record.iter().map(|v| v.to_string()).collect();
            row.resize(width, String::new());
            rows.push(row);
        }

        Ok(Self { headers, rows })
    }

    /// 从 CSV 文件加载数据表
    pub async fn load_csv(path: &str) -> AppResult<Self> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| AppError::file_read_failed(path, e))?;
        Self::from_csv_str(&content, path)
    }

    /// 查找列索引
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// 查找列索引，不存在则返回错误
    pub fn require_column(&self, name: &str) -> AppResult<usize> {
        self.column_index(name)
            .ok_or_else(|| AppError::Data(DataError::ColumnNotFound {
                name: name.to_string(),
            }))
    }

    /// 确保列存在，不存在则追加空列，返回列索引
    pub fn ensure_column(&mut self, name: &str) -> usize {
        if let Some(index) = self.column_index(name) {
            return index;
        }
        self.headers.push(name.to_string());
        for row in &mut self.rows {
            row.push(String::new());
        }
        self.headers.len() - 1
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.headers.len()
    }

    /// 读取单元格
    pub fn get(&self, row: usize, column: usize) -> Option<&str> {
        self.rows.get(row).and_then(|r| r.get(column)).map(|v| v.as_str())
    }

    /// 写入单元格，越界时不做任何事
    pub fn set(&mut self, row: usize, column: usize, value: String) {
        if let Some(cell) = self.rows.get_mut(row).and_then(|r| r.get_mut(column)) {
            *cell = value;
        }
    }

    /// 追加一行，长度与表头对齐
    pub fn push_row(&mut self, mut row: Vec<String>) {
        row.resize(self.headers.len(), String::new());
        self.rows.push(row);
    }

    /// 序列化为 CSV 字节
    pub fn to_csv_bytes(&self) -> AppResult<Vec<u8>> {
        let mut buf = Vec::new();
        {
            let mut writer = csv::Writer::from_writer(&mut buf);
            writer
                .write_record(&self.headers)
                .map_err(|e| AppError::csv_failed("<memory>", e))?;
            for row in &self.rows {
                writer
                    .write_record(row)
                    .map_err(|e| AppError::csv_failed("<memory>", e))?;
            }
            writer
                .flush()
                .map_err(|e| AppError::csv_failed("<memory>", e))?;
        }
        Ok(buf)
    }

    /// 将整表写入 CSV 文件
    pub async fn save_csv(&self, path: &str) -> AppResult<()> {
        let bytes = self.to_csv_bytes()?;
        fs::write(path, bytes)
            .await
            .map_err(|e| AppError::file_write_failed(path, e))?;
        Ok(())
    }
}
