use std::time::Duration;

use takeoff_config::ToolsConfig;
use takeoff_io::{
    CommandDetector, CommandRunner, DocumentLoader, DrawingConverter, DxfFacade,
    InkscapeConverter, LopdfExtractor, ObjectDetector, OcrEngine, PdfExtractor, TesseractOcr,
};

/// 各阶段使用的外部协作者；测试中可整体替换为内存实现。
pub struct Toolkit {
    pub loader: Box<dyn DocumentLoader>,
    pub pdf: Box<dyn PdfExtractor>,
    pub ocr: Box<dyn OcrEngine>,
    pub converter: Box<dyn DrawingConverter>,
    pub detector: Box<dyn ObjectDetector>,
}

impl Toolkit {
    pub fn from_config(tools: &ToolsConfig) -> Self {
        let runner = CommandRunner::new(Duration::from_secs(tools.timeout_secs));
        Self {
            loader: Box::new(DxfFacade::new()),
            pdf: Box::new(LopdfExtractor::new()),
            ocr: Box::new(TesseractOcr::new(
                tools.pdftoppm.clone(),
                tools.tesseract.clone(),
                tools.ocr_dpi,
                runner,
            )),
            converter: Box::new(InkscapeConverter::new(tools.inkscape.clone(), runner)),
            detector: Box::new(CommandDetector::new(tools.detector.clone(), runner)),
        }
    }
}
