//! 错误日志服务 - 业务能力层
//!
//! 只负责"记录单元失败"能力，不关心流程

use chrono::{DateTime, Local};
use tokio::fs;
use tracing::debug;

use crate::error::{AppError, AppResult};

/// 单元失败记录
#[derive(Debug, Clone)]
pub struct ErrorRecord {
    /// 行索引（0 起）
    pub row_index: usize,
    /// 分析索引（0 起）
    pub analysis_index: usize,
    /// 失败原因
    pub message: String,
    /// 记录时间
    pub timestamp: DateTime<Local>,
}

impl ErrorRecord {
    /// 写入日志文件的单行文本，行/分析编号按 1 起显示
    pub fn log_line(&self) -> String {
        format!(
            "[{}] 行 {}, 分析 {}: {}",
            self.timestamp.format("%Y-%m-%d %H:%M:%S"),
            self.row_index + 1,
            self.analysis_index + 1,
            self.message
        )
    }
}

/// 错误日志
///
/// 职责：
/// - 在内存中按发生顺序累积失败记录
/// - 运行结束时一次性刷入文件
/// - 不出现在成功路径上
pub struct ErrorLog {
    path: String,
    records: Vec<ErrorRecord>,
}

impl ErrorLog {
    /// 创建新的错误日志
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            records: Vec::new(),
        }
    }

    /// 追加一条失败记录
    pub fn append(&mut self, row_index: usize, analysis_index: usize, message: String) {
        debug!(
            "记录失败: 行 {} | 分析 {} | {}",
            row_index + 1,
            analysis_index + 1,
            message
        );

        self.records.push(ErrorRecord {
            row_index,
            analysis_index,
            message,
            timestamp: Local::now(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn records(&self) -> &[ErrorRecord] {
        &self.records
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// 将全部记录刷入日志文件（无记录时写空文件）
    pub async fn flush(&self) -> AppResult<()> {
        let mut content = String::new();
        for record in &self.records {
            content.push_str(&record.log_line());
            content.push('\n');
        }

        fs::write(&self.path, content)
            .await
            .map_err(|e| AppError::file_write_failed(self.path.as_str(), e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_line_is_one_based() {
        let record = ErrorRecord {
            row_index: 1,
            analysis_index: 0,
            message: "API请求失败".to_string(),
            timestamp: Local::now(),
        };

        let line = record.log_line();
        assert!(line.contains("行 2, 分析 1: API请求失败"));
    }

    #[tokio::test]
    async fn test_flush_writes_records_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("error_log.txt");

        let mut log = ErrorLog::new(path.to_str().unwrap());
        log.append(0, 0, "primo".to_string());
        log.append(2, 1, "secondo".to_string());
        assert_eq!(log.len(), 2);

        log.flush().await.unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("行 1, 分析 1: primo"));
        assert!(lines[1].contains("行 3, 分析 2: secondo"));
    }
}
