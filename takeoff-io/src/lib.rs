use std::fs;
use std::path::Path;

use takeoff_core::document::Document;
use thiserror::Error;
use tracing::debug;

mod dxf;
pub mod pdf;
pub mod tables;
pub mod tools;

pub use pdf::{LopdfExtractor, PaintKind, PathSegment, PdfExtractor, VectorPath};
pub use tools::{
    CommandDetector, CommandRunner, Detection, DrawingConverter, InkscapeConverter,
    ObjectDetector, OcrEngine, TesseractOcr, ToolError,
};

const BINARY_DXF_SENTINEL: &[u8] = b"AutoCAD Binary DXF";

#[derive(Debug, Error)]
pub enum IoError {
    #[error("unsupported feature: {0}")]
    UnsupportedFeature(String),
    #[error("failed to read file {path:?}: {source}")]
    ReadError {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write file {path:?}: {source}")]
    WriteError {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid document structure: {0}")]
    InvalidDocument(String),
    #[error("failed to read table {path:?}: {source}")]
    CsvRead {
        path: std::path::PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("failed to encode csv: {0}")]
    CsvEncode(#[source] csv::Error),
    #[error("failed to build spreadsheet: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),
    #[error("table cannot be written: {0}")]
    InvalidTable(String),
}

/// 图纸读取入口，便于测试替换为内存实现。
pub trait DocumentLoader {
    fn load(&self, path: &Path) -> Result<Document, IoError>;
}

pub struct DxfFacade;

impl DxfFacade {
    pub fn new() -> Self {
        Self
    }
}

impl Default for DxfFacade {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentLoader for DxfFacade {
    fn load(&self, path: &Path) -> Result<Document, IoError> {
        let data = fs::read(path).map_err(|source| IoError::ReadError {
            path: path.to_path_buf(),
            source,
        })?;
        if data.starts_with(BINARY_DXF_SENTINEL) {
            return Err(IoError::UnsupportedFeature(format!(
                "二进制 DXF {:?} 暂不支持",
                path
            )));
        }
        let text = String::from_utf8_lossy(&data);
        let document = dxf::parse_document(&text).map_err(|err| match err {
            dxf::DxfError::Invalid { message } => IoError::InvalidDocument(message),
        })?;
        debug!(
            path = %path.display(),
            entity_count = document.entity_count(),
            units = ?document.units(),
            "DXF 解析完成"
        );
        Ok(document)
    }
}
