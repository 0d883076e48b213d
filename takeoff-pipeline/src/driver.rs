use std::fmt;

use tracing::{error, info, warn};

use crate::errors::{ErrorKind, PipelineError};
use crate::report::ReportStage;
use crate::stages::{
    CadStage, DetectStage, EstimateStage, OcrStage, Stage, StageContext, StageReport, TablesStage,
    TextStage, VectorStage,
};

/// 默认流程中各阶段的顺序。
pub const STAGE_ORDER: [&str; 7] = ["text", "tables", "ocr", "vector", "cad", "estimate", "report"];

/// 单个阶段的结果：成功的产出，或阶段级错误。
#[derive(Debug)]
pub struct StageOutcome {
    pub stage: &'static str,
    pub result: Result<StageReport, PipelineError>,
}

impl StageOutcome {
    pub fn failed(&self) -> bool {
        match &self.result {
            Ok(report) => !report.is_success(),
            Err(_) => true,
        }
    }

    pub fn failure_count(&self) -> usize {
        match &self.result {
            Ok(report) => report.failures.len(),
            Err(_) => 1,
        }
    }

    /// 该阶段所有失败的分类。
    pub fn error_kinds(&self) -> Vec<ErrorKind> {
        match &self.result {
            Ok(report) => report.failures.iter().map(|f| f.error.kind()).collect(),
            Err(err) => vec![err.kind()],
        }
    }
}

impl fmt::Display for StageOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.result {
            Ok(report) if report.is_success() => {
                write!(f, "{:<8} ok ({} outputs)", self.stage, report.outputs.len())
            }
            Ok(report) => write!(
                f,
                "{:<8} failed ({} outputs, {} failures)",
                self.stage,
                report.outputs.len(),
                report.failures.len()
            ),
            Err(err) => write!(f, "{:<8} failed: {err}", self.stage),
        }
    }
}

#[derive(Debug, Default)]
pub struct RunSummary {
    pub outcomes: Vec<StageOutcome>,
}

impl RunSummary {
    pub fn is_success(&self) -> bool {
        self.outcomes.iter().all(|outcome| !outcome.failed())
    }

    pub fn failure_count(&self) -> usize {
        self.outcomes.iter().map(StageOutcome::failure_count).sum()
    }

    pub fn failed_stages(&self) -> Vec<&'static str> {
        self.outcomes
            .iter()
            .filter(|outcome| outcome.failed())
            .map(|outcome| outcome.stage)
            .collect()
    }

    pub fn outcome(&self, stage: &str) -> Option<&StageOutcome> {
        self.outcomes.iter().find(|outcome| outcome.stage == stage)
    }
}

/// 按注册顺序依次运行阶段；任何阶段失败都不会中断后续阶段。
pub struct Pipeline {
    stages: Vec<Box<dyn Stage>>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self { stages: Vec::new() }
    }

    /// text → tables → ocr → vector → cad → estimate → report。
    pub fn standard() -> Self {
        let mut pipeline = Self::new();
        for name in STAGE_ORDER {
            if let Some(stage) = stage_by_name(name) {
                pipeline.register(stage);
            }
        }
        pipeline
    }

    /// 仅包含单个阶段的流程，名称未知时返回 `None`。
    pub fn single(name: &str) -> Option<Self> {
        let mut pipeline = Self::new();
        pipeline.register(stage_by_name(name)?);
        Some(pipeline)
    }

    pub fn register(&mut self, stage: Box<dyn Stage>) -> &mut Self {
        self.stages.push(stage);
        self
    }

    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|stage| stage.name()).collect()
    }

    pub fn run(&self, context: &StageContext) -> RunSummary {
        let mut summary = RunSummary::default();
        for stage in &self.stages {
            let name = stage.name();
            info!(stage = name, "开始阶段");
            let result = stage.run(context);
            match &result {
                Ok(report) => {
                    for failure in &report.failures {
                        error!(
                            stage = name,
                            path = %failure.path.display(),
                            kind = %failure.error.kind(),
                            error = %failure.error,
                            "文件处理失败"
                        );
                    }
                    if report.outputs.is_empty() && report.is_success() {
                        warn!(stage = name, "阶段没有产出");
                    }
                    info!(
                        stage = name,
                        outputs = report.outputs.len(),
                        failures = report.failures.len(),
                        "阶段完成"
                    );
                }
                Err(err) => {
                    error!(stage = name, kind = %err.kind(), error = %err, "阶段失败");
                }
            }
            summary.outcomes.push(StageOutcome {
                stage: name,
                result,
            });
        }
        summary
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::standard()
    }
}

/// 按名称构造阶段；`detect` 可单独运行，但不在默认流程中。
pub fn stage_by_name(name: &str) -> Option<Box<dyn Stage>> {
    let stage: Box<dyn Stage> = match name {
        "text" => Box::new(TextStage),
        "tables" => Box::new(TablesStage),
        "ocr" => Box::new(OcrStage),
        "vector" => Box::new(VectorStage),
        "cad" => Box::new(CadStage),
        "estimate" => Box::new(EstimateStage),
        "report" => Box::new(ReportStage),
        "detect" => Box::new(DetectStage),
        _ => return None,
    };
    Some(stage)
}
