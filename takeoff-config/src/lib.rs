use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use takeoff_core::materials::MaterialRates;
use thiserror::Error;

pub const CONFIG_ENV: &str = "TAKEOFF_CONFIG";

/// 应用配置的根结构。
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub tools: ToolsConfig,
    #[serde(default)]
    pub materials: MaterialRates,
}

impl AppConfig {
    /// 从显式路径加载配置，并做基本校验。
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
        config.validate()?;
        Ok(config)
    }

    /// 自动发现配置文件：优先读取环境变量 `TAKEOFF_CONFIG`，否则寻找 `./config/default.toml`。
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

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.paths.project.trim().is_empty() {
            return Err(ConfigError::Invalid {
                message: "paths.project 不能为空".to_string(),
            });
        }
        if self.tools.timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                message: "tools.timeout_secs 必须大于 0".to_string(),
            });
        }
        if self.materials.is_empty() {
            return Err(ConfigError::Invalid {
                message: "materials 至少需要一种材料".to_string(),
            });
        }
        if let Some((name, rate)) = self
            .materials
            .iter()
            .find(|(_, rate)| !rate.is_finite() || *rate < 0.0)
        {
            return Err(ConfigError::Invalid {
                message: format!("材料 {name} 的消耗率 {rate} 无效"),
            });
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

/// 目录约定：输入目录、输出目录，以及汇总文件使用的项目名前缀。
#[derive(Debug, Clone, Deserialize)]
pub struct PathsConfig {
    #[serde(default = "PathsConfig::default_input_dir")]
    pub input_dir: PathBuf,
    #[serde(default = "PathsConfig::default_output_dir")]
    pub output_dir: PathBuf,
    #[serde(default = "PathsConfig::default_project")]
    pub project: String,
}

impl PathsConfig {
    fn default_input_dir() -> PathBuf {
        PathBuf::from("data")
    }

    fn default_output_dir() -> PathBuf {
        PathBuf::from("extracted_data")
    }

    fn default_project() -> String {
        "sample".to_string()
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            input_dir: Self::default_input_dir(),
            output_dir: Self::default_output_dir(),
            project: Self::default_project(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ToolsConfig {
    #[serde(default = "ToolsConfig::default_inkscape")]
    pub inkscape: String,
    #[serde(default = "ToolsConfig::default_pdftoppm")]
    pub pdftoppm: String,
    #[serde(default = "ToolsConfig::default_tesseract")]
    pub tesseract: String,
    #[serde(default = "ToolsConfig::default_ocr_dpi")]
    pub ocr_dpi: u32,
    /// 目标检测命令及参数；图片路径追加在末尾。为空表示未配置。
    #[serde(default)]
    pub detector: Vec<String>,
    #[serde(default = "ToolsConfig::default_timeout_secs")]
    pub timeout_secs: u64,
}

impl ToolsConfig {
    fn default_inkscape() -> String {
        "inkscape".to_string()
    }

    fn default_pdftoppm() -> String {
        "pdftoppm".to_string()
    }

    fn default_tesseract() -> String {
        "tesseract".to_string()
    }

    fn default_ocr_dpi() -> u32 {
        300
    }

    fn default_timeout_secs() -> u64 {
        300
    }
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            inkscape: Self::default_inkscape(),
            pdftoppm: Self::default_pdftoppm(),
            tesseract: Self::default_tesseract(),
            ocr_dpi: Self::default_ocr_dpi(),
            detector: Vec::new(),
            timeout_secs: Self::default_timeout_secs(),
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
    #[error("配置无效: {message}")]
    Invalid { message: String },
    #[error("{message}")]
    Context {
        message: String,
        #[source]
        source: std::io::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_follow_directory_contract() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.logging.level, "info");
        assert_eq!(cfg.paths.input_dir, PathBuf::from("data"));
        assert_eq!(cfg.paths.output_dir, PathBuf::from("extracted_data"));
        assert_eq!(cfg.paths.project, "sample");
        assert_eq!(cfg.tools.timeout_secs, 300);
        assert!(cfg.tools.detector.is_empty());
        assert_eq!(cfg.materials, MaterialRates::standard());
        cfg.validate().expect("defaults are valid");
    }

    #[test]
    fn load_from_temp_file() {
        let mut file = tempfile::NamedTempFile::new().expect("create temp file");
        writeln!(
            file,
            r#"
            [logging]
            level = "debug"

            [paths]
            input_dir = "drawings"
            output_dir = "out"
            project = "tower"

            [tools]
            inkscape = "/opt/inkscape/bin/inkscape"
            detector = ["python3", "detect.py"]
            timeout_secs = 30

            [materials]
            "Cement (bags)" = 9.5
            "Steel (kg)" = 12
            "#
        )
        .unwrap();

        let cfg = AppConfig::from_file(file.path()).expect("load config");
        assert_eq!(cfg.logging.level, "debug");
        assert_eq!(cfg.paths.input_dir, PathBuf::from("drawings"));
        assert_eq!(cfg.paths.project, "tower");
        assert_eq!(cfg.tools.inkscape, "/opt/inkscape/bin/inkscape");
        assert_eq!(cfg.tools.tesseract, "tesseract");
        assert_eq!(cfg.tools.detector, vec!["python3", "detect.py"]);
        assert_eq!(cfg.tools.timeout_secs, 30);
        let names: Vec<&str> = cfg.materials.names().collect();
        assert_eq!(names, vec!["Cement (bags)", "Steel (kg)"]);
        assert_eq!(cfg.materials.get("Steel (kg)"), Some(12.0));
    }

    #[test]
    fn shipped_default_file_matches_builtin_defaults() {
        let cfg: AppConfig = toml::from_str(include_str!("../../config/default.toml"))
            .expect("shipped config parses");
        cfg.validate().expect("shipped config is valid");
        assert_eq!(cfg.paths.project, PathsConfig::default().project);
        assert_eq!(cfg.materials, MaterialRates::standard());
    }

    #[test]
    fn negative_rate_is_rejected() {
        let mut file = tempfile::NamedTempFile::new().expect("create temp file");
        writeln!(
            file,
            r#"
            [materials]
            "Sand (cubic meters)" = -0.6
            "#
        )
        .unwrap();

        let err = AppConfig::from_file(file.path()).expect_err("negative rate must fail");
        assert!(matches!(err, ConfigError::Invalid { .. }));
    }

    #[test]
    fn missing_file_reports_io_error() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let err = AppConfig::from_file(dir.path().join("absent.toml")).expect_err("file is absent");
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
