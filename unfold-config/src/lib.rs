use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

/// 指定配置文件路径的环境变量。
pub const CONFIG_ENV: &str = "UNFOLD_CONFIG";

/// 应用配置的根结构。
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub stretch: StretchConfig,
    #[serde(default)]
    pub width: WidthConfig,
    #[serde(default)]
    pub naming: NamingConfig,
}

impl AppConfig {
    /// 从显式路径加载配置。
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate(path)?;
        Ok(config)
    }

    /// 自动发现配置文件：优先读取环境变量 `UNFOLD_CONFIG`，否则寻找 `./config/default.toml`。
    /// 若文件缺失，则返回默认配置。
    pub fn discover() -> Result<Self, ConfigError> {
        if let Some(path) = env::var_os(CONFIG_ENV) {
            return Self::from_file(PathBuf::from(path));
        }

        let default_path = env::current_dir()
            .map(|dir| dir.join("config").join("default.toml"))
            .map_err(|source| ConfigError::Context {
                message: "获取当前工作目录失败".to_string(),
                source,
            })?;

        if default_path.exists() {
            Self::from_file(default_path)
        } else {
            Ok(Self::default())
        }
    }

    fn validate(&self, path: &Path) -> Result<(), ConfigError> {
        let invalid = |field: &'static str, message: String| ConfigError::Invalid {
            path: path.to_path_buf(),
            field,
            message,
        };
        if !(self.width.tolerance.is_finite() && self.width.tolerance >= 0.0) {
            return Err(invalid(
                "width.tolerance",
                format!("必须为非负数，实际为 {}", self.width.tolerance),
            ));
        }
        if !(self.stretch.min_batch_delta.is_finite() && self.stretch.min_batch_delta >= 0.0) {
            return Err(invalid(
                "stretch.min_batch_delta",
                format!("必须为非负数，实际为 {}", self.stretch.min_batch_delta),
            ));
        }
        if self.stretch.output_suffix.is_empty() {
            return Err(invalid("stretch.output_suffix", "不能为空".to_string()));
        }
        let markers = [
            ("naming.reference_marker", &self.naming.reference_marker),
            ("naming.assembly_marker", &self.naming.assembly_marker),
            ("naming.outer_marker", &self.naming.outer_marker),
            ("naming.inner_marker", &self.naming.inner_marker),
        ];
        for (field, value) in markers {
            if value.trim().is_empty() {
                return Err(invalid(field, "不能为空".to_string()));
            }
        }
        Ok(())
    }
}

/// 日志配置，支持设置默认等级。
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "LoggingConfig::default_level")]
    pub level: String,
}

impl LoggingConfig {
    fn default_level() -> String {
        "info".to_string()
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Self::default_level(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StretchConfig {
    /// `start`、`center` 或 `end`，由调用方解析。
    #[serde(default = "StretchConfig::default_anchor")]
    pub default_anchor: String,
    #[serde(default = "StretchConfig::default_output_suffix")]
    pub output_suffix: String,
    /// 批处理中长度差低于该值的文件视为已符合要求。
    #[serde(default = "StretchConfig::default_min_batch_delta")]
    pub min_batch_delta: f64,
}

impl StretchConfig {
    fn default_anchor() -> String {
        "start".to_string()
    }

    fn default_output_suffix() -> String {
        "_stretch".to_string()
    }

    fn default_min_batch_delta() -> f64 {
        0.01
    }
}

impl Default for StretchConfig {
    fn default() -> Self {
        Self {
            default_anchor: Self::default_anchor(),
            output_suffix: Self::default_output_suffix(),
            min_batch_delta: Self::default_min_batch_delta(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct WidthConfig {
    #[serde(default = "WidthConfig::default_tolerance")]
    pub tolerance: f64,
}

impl WidthConfig {
    fn default_tolerance() -> f64 {
        0.1
    }
}

impl Default for WidthConfig {
    fn default() -> Self {
        Self {
            tolerance: Self::default_tolerance(),
        }
    }
}

/// 文件夹命名约定。
#[derive(Debug, Clone, Deserialize)]
pub struct NamingConfig {
    #[serde(default = "NamingConfig::default_reference_marker")]
    pub reference_marker: String,
    #[serde(default = "NamingConfig::default_assembly_marker")]
    pub assembly_marker: String,
    #[serde(default = "NamingConfig::default_outer_marker")]
    pub outer_marker: String,
    #[serde(default = "NamingConfig::default_inner_marker")]
    pub inner_marker: String,
    #[serde(default = "NamingConfig::default_processed_suffixes")]
    pub processed_suffixes: Vec<String>,
    #[serde(default = "NamingConfig::default_derived_suffix")]
    pub derived_suffix: String,
}

impl NamingConfig {
    fn default_reference_marker() -> String {
        "Основание".to_string()
    }

    fn default_assembly_marker() -> String {
        "корп".to_string()
    }

    fn default_outer_marker() -> String {
        "Внешний".to_string()
    }

    fn default_inner_marker() -> String {
        "Внутренний".to_string()
    }

    fn default_processed_suffixes() -> Vec<String> {
        vec!["_stretch".to_string(), "_shrink".to_string()]
    }

    fn default_derived_suffix() -> String {
        "_from_inner".to_string()
    }
}

impl Default for NamingConfig {
    fn default() -> Self {
        Self {
            reference_marker: Self::default_reference_marker(),
            assembly_marker: Self::default_assembly_marker(),
            outer_marker: Self::default_outer_marker(),
            inner_marker: Self::default_inner_marker(),
            processed_suffixes: Self::default_processed_suffixes(),
            derived_suffix: Self::default_derived_suffix(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("读取配置文件 {path:?} 失败: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("解析配置文件 {path:?} 失败: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("配置文件 {path:?} 中 {field} 无效: {message}")]
    Invalid {
        path: PathBuf,
        field: &'static str,
        message: String,
    },
    #[error("{message}")]
    Context {
        message: String,
        #[source]
        source: std::io::Error,
    },
}
