//! 客户端层
//!
//! 负责所有与外部服务的交互：生成服务（含 token 计数）和代理列表服务

pub mod gemini_client;
pub mod webshare_client;

pub use gemini_client::{probe_via_proxy, ContentGenerator, GeminiClient};
pub use webshare_client::WebshareClient;
