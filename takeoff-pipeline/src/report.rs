use takeoff_io::tables::{render_csv, render_xlsx, write_bytes};
use tracing::info;

use crate::errors::PipelineError;
use crate::stages::{Stage, StageContext, StageReport, read_input_table};

pub const REPORT_CSV: &str = "final_project_report.csv";
pub const REPORT_XLSX: &str = "final_project_report.xlsx";

/// 将逐房间估算表重新输出为最终报告（CSV 与 XLSX）。
pub struct ReportStage;

impl Stage for ReportStage {
    fn name(&self) -> &'static str {
        "report"
    }

    fn run(&self, context: &StageContext) -> Result<StageReport, PipelineError> {
        let input = context.project_file("roomwise_material_estimation.csv");
        let table = read_input_table(&input)?;
        // 两份输出都在内存中生成成功后才落盘。
        let csv = render_csv(&table)?;
        let xlsx = render_xlsx(&table)?;

        context.ensure_output_dir()?;
        let csv_path = context.output_path(REPORT_CSV);
        let xlsx_path = context.output_path(REPORT_XLSX);
        write_bytes(&csv_path, &csv)?;
        write_bytes(&xlsx_path, &xlsx)?;
        info!(
            csv = %csv_path.display(),
            xlsx = %xlsx_path.display(),
            rows = table.len(),
            "最终报告已生成"
        );
        Ok(StageReport {
            outputs: vec![csv_path, xlsx_path],
            failures: Vec::new(),
        })
    }
}
