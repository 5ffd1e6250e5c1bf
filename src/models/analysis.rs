//! 分析配置模型

use serde::Deserialize;

/// 单个分析配置
///
/// 一次运行中按声明顺序执行，运行期间不可变
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AnalysisSpec {
    /// 结果写入的输出列名
    pub column: String,
    /// 基础提示词，与评论文本拼接后发送
    pub prompt: String,
}
