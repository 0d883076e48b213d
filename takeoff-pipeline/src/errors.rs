use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use takeoff_io::{IoError, ToolError};
use thiserror::Error;

/// 失败分类，用于汇总与退出码判断。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    MissingInput,
    MalformedInput,
    ExternalToolFailure,
    Persistence,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ErrorKind::MissingInput => "missing input",
            ErrorKind::MalformedInput => "malformed input",
            ErrorKind::ExternalToolFailure => "external tool failure",
            ErrorKind::Persistence => "persistence",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("missing input {path:?}")]
    MissingInput { path: PathBuf },
    #[error("malformed input {path:?}: {reason}")]
    MalformedInput { path: PathBuf, reason: String },
    #[error("external tool failed on {path:?}: {source}")]
    ExternalTool {
        path: PathBuf,
        #[source]
        source: ToolError,
    },
    #[error(transparent)]
    Persistence(#[from] IoError),
}

impl PipelineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PipelineError::MissingInput { .. } => ErrorKind::MissingInput,
            PipelineError::MalformedInput { .. } => ErrorKind::MalformedInput,
            PipelineError::ExternalTool { .. } => ErrorKind::ExternalToolFailure,
            PipelineError::Persistence(_) => ErrorKind::Persistence,
        }
    }

    pub fn missing(path: &Path) -> Self {
        PipelineError::MissingInput {
            path: path.to_path_buf(),
        }
    }

    pub fn malformed(path: &Path, reason: impl fmt::Display) -> Self {
        PipelineError::MalformedInput {
            path: path.to_path_buf(),
            reason: reason.to_string(),
        }
    }

    pub fn tool(path: &Path, source: ToolError) -> Self {
        PipelineError::ExternalTool {
            path: path.to_path_buf(),
            source,
        }
    }

    /// 读取输入时的错误按成因归类：文件缺失、内容无法解析，其余视为持久化问题。
    pub fn reading(path: &Path, error: IoError) -> Self {
        match error {
            IoError::ReadError { source, .. } if source.kind() == io::ErrorKind::NotFound => {
                Self::missing(path)
            }
            IoError::UnsupportedFeature(reason) | IoError::InvalidDocument(reason) => {
                Self::malformed(path, reason)
            }
            IoError::CsvRead { source, .. } => Self::malformed(path, source),
            other => PipelineError::Persistence(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_errors_are_classified_by_cause() {
        let path = Path::new("plan.dxf");
        let missing = PipelineError::reading(
            path,
            IoError::ReadError {
                path: path.to_path_buf(),
                source: io::Error::from(io::ErrorKind::NotFound),
            },
        );
        assert_eq!(missing.kind(), ErrorKind::MissingInput);

        let invalid = PipelineError::reading(path, IoError::InvalidDocument("bad".to_string()));
        assert_eq!(invalid.kind(), ErrorKind::MalformedInput);

        let denied = PipelineError::reading(
            path,
            IoError::ReadError {
                path: path.to_path_buf(),
                source: io::Error::from(io::ErrorKind::PermissionDenied),
            },
        );
        assert_eq!(denied.kind(), ErrorKind::Persistence);

        let tool = PipelineError::tool(path, ToolError::NotConfigured("tools.detector"));
        assert_eq!(tool.kind(), ErrorKind::ExternalToolFailure);
    }
}
