use std::fs;
use std::path::{Path, PathBuf};

use takeoff_config::AppConfig;
use takeoff_core::materials::MaterialRates;
use takeoff_core::table::{Table, format_float};
use takeoff_engine::estimate::{self, Estimator};
use takeoff_engine::extract::{
    self, AreaRecord, LayerMaterialRecord, RoomAreaRecord, RoomRecord,
};
use takeoff_engine::tables::detect_table;
use takeoff_engine::units::UnitScale;
use takeoff_io::tables::{read_table, render_csv, write_bytes, write_records, write_table, write_text};
use takeoff_io::{IoError, VectorPath};
use tracing::{debug, info, warn};

use crate::errors::PipelineError;
use crate::inputs::{self, DXF_EXTENSIONS, IMAGE_EXTENSIONS, PDF_EXTENSIONS};
use crate::toolkit::Toolkit;

pub const VECTOR_HEADERS: [&str; 6] = [
    "Page",
    "Type",
    "Color",
    "Fill Color",
    "Stroke Width",
    "Coordinates",
];
pub const DETECTION_HEADERS: [&str; 6] = ["Label", "Confidence", "X1", "Y1", "X2", "Y2"];
const NONE_CELL: &str = "None";

/// 阶段运行所需的目录约定、材料消耗率与外部协作者。
pub struct StageContext {
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    pub project: String,
    pub materials: MaterialRates,
    pub toolkit: Toolkit,
}

impl StageContext {
    pub fn new(config: &AppConfig, toolkit: Toolkit) -> Self {
        Self {
            input_dir: config.paths.input_dir.clone(),
            output_dir: config.paths.output_dir.clone(),
            project: config.paths.project.clone(),
            materials: config.materials.clone(),
            toolkit,
        }
    }

    pub fn output_path(&self, file_name: impl AsRef<Path>) -> PathBuf {
        self.output_dir.join(file_name)
    }

    /// 项目级汇总文件：`<project>_<suffix>`。
    pub fn project_file(&self, suffix: &str) -> PathBuf {
        self.output_path(format!("{}_{suffix}", self.project))
    }

    pub fn ensure_output_dir(&self) -> Result<(), PipelineError> {
        fs::create_dir_all(&self.output_dir).map_err(|source| {
            PipelineError::Persistence(IoError::WriteError {
                path: self.output_dir.clone(),
                source,
            })
        })
    }

    fn inputs(&self, extensions: &[&str]) -> Vec<PathBuf> {
        inputs::discover(&self.input_dir, extensions)
    }
}

#[derive(Debug)]
pub struct FileFailure {
    pub path: PathBuf,
    pub error: PipelineError,
}

/// 单个阶段的产出：写出的文件与逐文件失败。
#[derive(Debug, Default)]
pub struct StageReport {
    pub outputs: Vec<PathBuf>,
    pub failures: Vec<FileFailure>,
}

impl StageReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    /// 逐文件处理：失败记录后继续下一个文件。
    fn process_each<F>(&mut self, inputs: &[PathBuf], mut process: F)
    where
        F: FnMut(&Path) -> Result<Vec<PathBuf>, PipelineError>,
    {
        for path in inputs {
            match process(path) {
                Ok(outputs) => self.outputs.extend(outputs),
                Err(error) => self.failures.push(FileFailure {
                    path: path.clone(),
                    error,
                }),
            }
        }
    }
}

pub trait Stage {
    fn name(&self) -> &'static str;
    fn run(&self, context: &StageContext) -> Result<StageReport, PipelineError>;
}

/// PDF → `<base>.txt`，页间以换行分隔。
pub struct TextStage;

impl Stage for TextStage {
    fn name(&self) -> &'static str {
        "text"
    }

    fn run(&self, context: &StageContext) -> Result<StageReport, PipelineError> {
        context.ensure_output_dir()?;
        let mut report = StageReport::default();
        report.process_each(&context.inputs(PDF_EXTENSIONS), |pdf| {
            let pages = context
                .toolkit
                .pdf
                .page_texts(pdf)
                .map_err(|err| PipelineError::tool(pdf, err))?;
            let output = context.output_path(format!("{}.txt", inputs::base_name(pdf)));
            write_text(&output, &pages.join("\n"))?;
            info!(path = %output.display(), pages = pages.len(), "文本已保存");
            Ok(vec![output])
        });
        Ok(report)
    }
}

/// PDF → `<base>_table_<n>.csv`，每页至多一张表。
pub struct TablesStage;

impl Stage for TablesStage {
    fn name(&self) -> &'static str {
        "tables"
    }

    fn run(&self, context: &StageContext) -> Result<StageReport, PipelineError> {
        context.ensure_output_dir()?;
        let mut report = StageReport::default();
        report.process_each(&context.inputs(PDF_EXTENSIONS), |pdf| {
            let pages = context
                .toolkit
                .pdf
                .page_texts(pdf)
                .map_err(|err| PipelineError::tool(pdf, err))?;
            let base = inputs::base_name(pdf);
            let mut outputs = Vec::new();
            for table in pages.iter().filter_map(|page| detect_table(page)) {
                let output = context.output_path(format!("{base}_table_{}.csv", outputs.len()));
                write_table(&output, &table)?;
                info!(path = %output.display(), rows = table.len(), "表格已保存");
                outputs.push(output);
            }
            if outputs.is_empty() {
                info!(path = %pdf.display(), "未检测到表格");
            }
            Ok(outputs)
        });
        Ok(report)
    }
}

/// PDF → `<base>_ocr.txt`。
pub struct OcrStage;

impl Stage for OcrStage {
    fn name(&self) -> &'static str {
        "ocr"
    }

    fn run(&self, context: &StageContext) -> Result<StageReport, PipelineError> {
        context.ensure_output_dir()?;
        let mut report = StageReport::default();
        report.process_each(&context.inputs(PDF_EXTENSIONS), |pdf| {
            let text = context
                .toolkit
                .ocr
                .recognize(pdf)
                .map_err(|err| PipelineError::tool(pdf, err))?;
            let output = context.output_path(format!("{}_ocr.txt", inputs::base_name(pdf)));
            write_text(&output, &text)?;
            info!(path = %output.display(), "OCR 文本已保存");
            Ok(vec![output])
        });
        Ok(report)
    }
}

/// PDF → `<base>_vector_data.csv`，无图形的页输出一行 `None`。
pub struct VectorStage;

impl VectorStage {
    pub fn vector_table(drawings: &[Vec<VectorPath>]) -> Table {
        let mut table = Table::new(VECTOR_HEADERS);
        for (index, paths) in drawings.iter().enumerate() {
            let page = (index + 1).to_string();
            if paths.is_empty() {
                let mut row = vec![page];
                row.extend(std::iter::repeat_n(NONE_CELL.to_string(), VECTOR_HEADERS.len() - 1));
                table.push_row(row);
                continue;
            }
            for path in paths {
                table.push_row(vec![
                    page.clone(),
                    path.paint.as_str().to_string(),
                    optional_cell(path.stroke_color.as_ref()),
                    optional_cell(path.fill_color.as_ref()),
                    optional_cell(path.stroke_width.as_ref()),
                    path.coordinates(),
                ]);
            }
        }
        table
    }
}

fn optional_cell<T: ToString>(value: Option<&T>) -> String {
    value.map_or_else(|| NONE_CELL.to_string(), ToString::to_string)
}

impl Stage for VectorStage {
    fn name(&self) -> &'static str {
        "vector"
    }

    fn run(&self, context: &StageContext) -> Result<StageReport, PipelineError> {
        context.ensure_output_dir()?;
        let mut report = StageReport::default();
        report.process_each(&context.inputs(PDF_EXTENSIONS), |pdf| {
            let drawings = context
                .toolkit
                .pdf
                .page_drawings(pdf)
                .map_err(|err| PipelineError::tool(pdf, err))?;
            let table = Self::vector_table(&drawings);
            let output =
                context.output_path(format!("{}_vector_data.csv", inputs::base_name(pdf)));
            write_table(&output, &table)?;
            info!(path = %output.display(), rows = table.len(), "矢量数据已保存");
            Ok(vec![output])
        });
        Ok(report)
    }
}

/// 缺少 DXF 的 PDF 先转换，再从全部 DXF 提取房间、面积与图层材料。
pub struct CadStage;

impl CadStage {
    fn convert_missing(&self, context: &StageContext, report: &mut StageReport) {
        // 输入或输出目录中已有同名 DXF 的 PDF 不再转换
        let existing: Vec<String> = context
            .inputs(DXF_EXTENSIONS)
            .iter()
            .chain(&inputs::discover(&context.output_dir, DXF_EXTENSIONS))
            .map(|path| inputs::base_name(path))
            .collect();
        report.process_each(&context.inputs(PDF_EXTENSIONS), |pdf| {
            let base = inputs::base_name(pdf);
            if existing.contains(&base) {
                debug!(pdf = %pdf.display(), "已有同名 DXF，跳过转换");
                return Ok(Vec::new());
            }
            let dxf = context.output_path(format!("{base}.dxf"));
            info!(pdf = %pdf.display(), dxf = %dxf.display(), "转换 PDF 为 DXF");
            context
                .toolkit
                .converter
                .convert(pdf, &dxf)
                .map_err(|err| PipelineError::tool(pdf, err))?;
            Ok(vec![dxf])
        });
    }

    fn extract(&self, context: &StageContext, dxf: &Path) -> Result<Vec<PathBuf>, PipelineError> {
        let document = context
            .toolkit
            .loader
            .load(dxf)
            .map_err(|err| PipelineError::reading(dxf, err))?;
        info!(path = %dxf.display(), layers = ?extract::list_layers(&document), "图层列表");

        let scale = UnitScale::resolve(&document);
        let rooms = extract::extract_rooms(&document);
        let areas = extract::extract_areas(&document, scale.factor);
        let room_areas = extract::join_room_areas(&document, &rooms, scale.factor);
        let materials = extract::classify_layer_materials(&document);

        let base = inputs::base_name(dxf);
        let room_path = context.output_path(format!("{base}_room_data.csv"));
        let area_path = context.output_path(format!("{base}_cad_area.csv"));
        let room_area_path = context.output_path(format!("{base}_room_area.csv"));
        let material_path = context.output_path(format!("{base}_material_data.csv"));
        write_records(&room_path, &RoomRecord::HEADERS, &rooms)?;
        write_records(&area_path, &AreaRecord::HEADERS, &areas)?;
        write_records(&room_area_path, &RoomAreaRecord::HEADERS, &room_areas)?;
        write_records(&material_path, &LayerMaterialRecord::HEADERS, &materials)?;
        info!(
            path = %dxf.display(),
            rooms = rooms.len(),
            areas = areas.len(),
            room_areas = room_areas.len(),
            "CAD 数据已保存"
        );
        Ok(vec![room_path, area_path, room_area_path, material_path])
    }
}

impl Stage for CadStage {
    fn name(&self) -> &'static str {
        "cad"
    }

    fn run(&self, context: &StageContext) -> Result<StageReport, PipelineError> {
        context.ensure_output_dir()?;
        let mut report = StageReport::default();
        self.convert_missing(context, &mut report);

        let dxfs = inputs::dedupe_by_file_name(
            context
                .inputs(DXF_EXTENSIONS)
                .into_iter()
                .chain(inputs::discover(&context.output_dir, DXF_EXTENSIONS)),
        );
        if dxfs.is_empty() {
            warn!(
                input = %context.input_dir.display(),
                output = %context.output_dir.display(),
                "未找到 DXF 文件"
            );
        }
        report.process_each(&dxfs, |dxf| self.extract(context, dxf));
        Ok(report)
    }
}

/// 总量估算与逐房间估算，两者互不影响。
pub struct EstimateStage;

impl EstimateStage {
    fn total_run(&self, context: &StageContext, input: &Path) -> Result<Vec<PathBuf>, PipelineError> {
        let table = read_input_table(input)?;
        let area = estimate::total_area(&table).map_err(|err| PipelineError::malformed(input, err))?;
        let output = context.project_file("material_estimation.csv");
        write_table(&output, &Estimator::new(&context.materials).total_table(area))?;
        info!(path = %output.display(), total_area = area, "总量估算已保存");
        Ok(vec![output])
    }

    fn roomwise_run(
        &self,
        context: &StageContext,
        input: &Path,
    ) -> Result<Vec<PathBuf>, PipelineError> {
        let table = read_input_table(input)?;
        let rooms = estimate::room_areas(&table).map_err(|err| PipelineError::malformed(input, err))?;
        let estimator = Estimator::new(&context.materials);
        let roomwise = render_csv(&estimator.roomwise_table(&rooms))?;
        let room_material = render_csv(&estimator.room_material_table(&rooms))?;

        let roomwise_path = context.project_file("roomwise_material_estimation.csv");
        let room_material_path = context.project_file("room_material_estimation.csv");
        write_bytes(&roomwise_path, &roomwise)?;
        write_bytes(&room_material_path, &room_material)?;
        info!(path = %roomwise_path.display(), rooms = rooms.len(), "逐房间估算已保存");
        Ok(vec![roomwise_path, room_material_path])
    }
}

impl Stage for EstimateStage {
    fn name(&self) -> &'static str {
        "estimate"
    }

    fn run(&self, context: &StageContext) -> Result<StageReport, PipelineError> {
        context.ensure_output_dir()?;
        let mut report = StageReport::default();
        let total_input = context.project_file("cad_area.csv");
        let room_input = context.project_file("room_area.csv");
        report.process_each(std::slice::from_ref(&total_input), |input| {
            self.total_run(context, input)
        });
        report.process_each(std::slice::from_ref(&room_input), |input| {
            self.roomwise_run(context, input)
        });
        Ok(report)
    }
}

/// 估算输入必须存在且可解析；缺失与格式错误分别归类。
pub(crate) fn read_input_table(path: &Path) -> Result<Table, PipelineError> {
    if !path.is_file() {
        return Err(PipelineError::missing(path));
    }
    read_table(path).map_err(|err| PipelineError::reading(path, err))
}

/// 图像 → `<base>_detections.csv`；不在默认流程中，可单独运行。
pub struct DetectStage;

impl Stage for DetectStage {
    fn name(&self) -> &'static str {
        "detect"
    }

    fn run(&self, context: &StageContext) -> Result<StageReport, PipelineError> {
        context.ensure_output_dir()?;
        let mut report = StageReport::default();
        report.process_each(&context.inputs(IMAGE_EXTENSIONS), |image| {
            let detections = context
                .toolkit
                .detector
                .detect(image)
                .map_err(|err| PipelineError::tool(image, err))?;
            let mut table = Table::new(DETECTION_HEADERS);
            for detection in &detections {
                let [x1, y1, x2, y2] = detection.bbox;
                table.push_row(vec![
                    detection.label.clone(),
                    format_float(detection.confidence),
                    format_float(x1),
                    format_float(y1),
                    format_float(x2),
                    format_float(y2),
                ]);
            }
            if detections.is_empty() {
                warn!(path = %image.display(), "未检测到目标");
            }
            let output = context.output_path(format!("{}_detections.csv", inputs::base_name(image)));
            write_table(&output, &table)?;
            Ok(vec![output])
        });
        Ok(report)
    }
}
