use crate::error::{AppError, AppResult, DataError, FileError};
use crate::models::analysis::AnalysisSpec;
use serde::Deserialize;
use std::collections::HashSet;
use tokio::fs;

#[derive(Debug, Deserialize)]
struct AnalysisFile {
    #[serde(default)]
    analysis: Vec<AnalysisSpec>,
}

/// 从 TOML 文件加载按序排列的分析配置
///
/// 文件格式：
/// ```toml
/// [[analysis]]
/// column = "sentiment"
/// prompt = "Classifica il sentimento della recensione."
/// ```
pub async fn load_analysis_specs(path: &str) -> AppResult<Vec<AnalysisSpec>> {
    let content = fs::read_to_string(path)
        .await
        .map_err(|e| AppError::file_read_failed(path, e))?;

    let file: AnalysisFile = toml::from_str(&content).map_err(|e| {
        AppError::File(FileError::TomlParseFailed {
            path: path.to_string(),
            source: Box::new(e),
        })
    })?;

    if file.analysis.is_empty() {
        return Err(AppError::Data(DataError::NoAnalyses {
            path: path.to_string(),
        }));
    }

    // 输出列名必须互不相同，否则后面的分析会覆盖前面的结果
    let mut seen = HashSet::new();
    for spec in &file.analysis {
        if !seen.insert(spec.column.as_str()) {
            return Err(AppError::Data(DataError::DuplicateColumn {
                name: spec.column.clone(),
            }));
        }
    }

    tracing::info!("✓ 加载了 {} 个分析配置", file.analysis.len());

    Ok(file.analysis)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_load_analysis_specs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("analyses.toml");
        std::fs::write(
            &path,
            r#"
[[analysis]]
column = "sentiment"
prompt = "Classifica il sentimento."

[[analysis]]
column = "topic"
prompt = "Identifica il tema principale."
"#,
        )
        .unwrap();

        let specs = load_analysis_specs(path.to_str().unwrap()).await.unwrap();
        assert_eq!(specs.len(), 2);
        assert_eq!(specs[0].column, "sentiment");
        assert_eq!(specs[1].column, "topic");
    }

    #[tokio::test]
    async fn test_duplicate_column_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("analyses.toml");
        std::fs::write(
            &path,
            r#"
[[analysis]]
column = "sentiment"
prompt = "a"

[[analysis]]
column = "sentiment"
prompt = "b"
"#,
        )
        .unwrap();

        let result = load_analysis_specs(path.to_str().unwrap()).await;
        assert!(result.is_err());
    }
}
