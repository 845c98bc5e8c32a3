/*
 * @Author       : 老董
 * @Description  : 服务配置：可选的TOML文件 + 环境变量 + 命令行覆盖
 *
 * 示例：
 * ```toml
 * [server]
 * port = 8000
 * bind = "0.0.0.0"
 * upload_dir = "uploads"
 *
 * [md_viewer]
 * port = 3000
 * default_root = "/data/notes"
 *
 * [logging]
 * level = "debug"
 * ```
 */

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// 总配置
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct Config {
    /// 模型可视化服务
    pub server: ServerConfig,
    /// Markdown浏览服务
    pub md_viewer: MdViewerConfig,
    /// 日志
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    pub port: u16,
    /// 上传模型的存放目录
    pub upload_dir: PathBuf,
    /// 推理时作为CNN输入的示例图片，不存在时改用随机输入
    pub image_path: PathBuf,
    /// 唯一允许的跨域来源
    pub cors_origin: String,
    /// multipart上传的最大字节数
    pub max_upload_bytes: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".to_string(),
            port: 8000,
            upload_dir: PathBuf::from("uploads"),
            image_path: PathBuf::from("src/image.png"),
            cors_origin: "http://localhost:3000".to_string(),
            max_upload_bytes: 64 * 1024 * 1024,
        }
    }
}

impl ServerConfig {
    /// `cors_origin`须为`scheme://host[:port]`，不带路径
    pub fn checked_cors_origin(&self) -> Result<&str, ConfigError> {
        let invalid = || ConfigError::InvalidOrigin(self.cors_origin.clone());
        let uri: warp::http::Uri = self.cors_origin.parse().map_err(|_| invalid())?;
        let bare = uri.path() == "/" && uri.query().is_none() && !self.cors_origin.ends_with('/');
        if uri.scheme().is_some() && uri.authority().is_some() && bare {
            Ok(&self.cors_origin)
        } else {
            Err(invalid())
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MdViewerConfig {
    pub port: u16,
    /// `/api/files`缺省列出的目录
    pub default_root: PathBuf,
    /// `/api/browse`缺省浏览的目录
    pub browse_root: PathBuf,
    /// 静态页面目录
    pub public_dir: PathBuf,
}

impl Default for MdViewerConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            default_root: PathBuf::from("."),
            browse_root: PathBuf::from("."),
            public_dir: PathBuf::from("public"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// trace / debug / info / warn / error
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl LoggingConfig {
    /// 无法识别的级别按`info`处理
    pub fn tracing_level(&self) -> tracing::Level {
        self.level
            .trim()
            .parse::<tracing::Level>()
            .unwrap_or(tracing::Level::INFO)
    }
}

impl Config {
    /// 从TOML文件加载
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::IoError(path.to_path_buf(), e.to_string()))?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// 读取`PORT`、`MD_ROOT`、`BROWSE_ROOT`环境变量覆盖Markdown浏览服务的配置
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_env_with(|key| std::env::var(key).ok())
    }

    pub fn apply_env_with<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(port) = lookup("PORT") {
            self.md_viewer.port = port
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidEnv("PORT", port.clone()))?;
        }
        if let Some(root) = lookup("MD_ROOT") {
            self.md_viewer.default_root = PathBuf::from(root);
        }
        if let Some(root) = lookup("BROWSE_ROOT") {
            self.md_viewer.browse_root = PathBuf::from(root);
        }
        Ok(())
    }

    pub fn to_toml(&self) -> String {
        toml::to_string_pretty(self).unwrap_or_default()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("读取配置文件{0}失败: {1}")]
    IoError(PathBuf, String),

    #[error("配置解析失败: {0}")]
    ParseError(String),

    #[error("环境变量{0}的值无效: {1}")]
    InvalidEnv(&'static str, String),

    #[error("跨域来源无效（应形如 http://host:port）: {0}")]
    InvalidOrigin(String),
}
