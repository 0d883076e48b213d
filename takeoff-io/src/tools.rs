use std::ffi::{OsStr, OsString};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::process::Command;
use tokio::time;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("external tool `{program}` not found")]
    NotFound { program: String },
    #[error("failed to run `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("`{program}` timed out after {seconds}s")]
    Timeout { program: String, seconds: u64 },
    #[error("`{program}` exited with {status}: {stderr}")]
    Failed {
        program: String,
        status: String,
        stderr: String,
    },
    #[error("failed to read pdf {path:?}: {source}")]
    Pdf {
        path: PathBuf,
        #[source]
        source: lopdf::Error,
    },
    #[error("unexpected output from `{program}`: {reason}")]
    InvalidOutput { program: String, reason: String },
    #[error("{0} is not configured")]
    NotConfigured(&'static str),
    #[error("filesystem error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// 带超时的子进程执行器；超时后子进程随 future 一起被杀掉。
#[derive(Debug, Clone, Copy)]
pub struct CommandRunner {
    timeout: Duration,
}

impl CommandRunner {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// 执行命令并返回标准输出；非零退出码视为失败。
    pub fn run<I, S>(&self, program: &str, args: I) -> Result<Vec<u8>, ToolError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let args: Vec<OsString> = args
            .into_iter()
            .map(|arg| arg.as_ref().to_os_string())
            .collect();
        debug!(program, args = ?args, timeout = ?self.timeout, "启动外部工具");

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|source| ToolError::Spawn {
                program: program.to_string(),
                source,
            })?;

        runtime.block_on(async {
            let child = Command::new(program)
                .args(&args)
                .stdin(Stdio::null())
                .stdout(Stdio::piped())
                .stderr(Stdio::piped())
                .kill_on_drop(true)
                .spawn()
                .map_err(|source| {
                    if source.kind() == ErrorKind::NotFound {
                        ToolError::NotFound {
                            program: program.to_string(),
                        }
                    } else {
                        ToolError::Spawn {
                            program: program.to_string(),
                            source,
                        }
                    }
                })?;

            match time::timeout(self.timeout, child.wait_with_output()).await {
                Ok(Ok(output)) if output.status.success() => Ok(output.stdout),
                Ok(Ok(output)) => Err(ToolError::Failed {
                    program: program.to_string(),
                    status: output.status.to_string(),
                    stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
                }),
                Ok(Err(source)) => Err(ToolError::Spawn {
                    program: program.to_string(),
                    source,
                }),
                Err(_) => Err(ToolError::Timeout {
                    program: program.to_string(),
                    seconds: self.timeout.as_secs(),
                }),
            }
        })
    }
}

/// PDF → DXF 矢量转换。
pub trait DrawingConverter {
    fn convert(&self, pdf: &Path, dxf: &Path) -> Result<(), ToolError>;
}

pub struct InkscapeConverter {
    program: String,
    runner: CommandRunner,
}

impl InkscapeConverter {
    pub fn new(program: impl Into<String>, runner: CommandRunner) -> Self {
        Self {
            program: program.into(),
            runner,
        }
    }
}

impl DrawingConverter for InkscapeConverter {
    fn convert(&self, pdf: &Path, dxf: &Path) -> Result<(), ToolError> {
        let mut export = OsString::from("--export-filename=");
        export.push(dxf.as_os_str());
        self.runner
            .run(&self.program, [pdf.as_os_str().to_os_string(), export])?;
        if !dxf.exists() {
            return Err(ToolError::InvalidOutput {
                program: self.program.clone(),
                reason: format!("未生成 {}", dxf.display()),
            });
        }
        Ok(())
    }
}

/// PDF → 识别文本，页与页之间以换行分隔。
pub trait OcrEngine {
    fn recognize(&self, pdf: &Path) -> Result<String, ToolError>;
}

pub struct TesseractOcr {
    pdftoppm: String,
    tesseract: String,
    dpi: u32,
    runner: CommandRunner,
}

impl TesseractOcr {
    pub fn new(
        pdftoppm: impl Into<String>,
        tesseract: impl Into<String>,
        dpi: u32,
        runner: CommandRunner,
    ) -> Self {
        Self {
            pdftoppm: pdftoppm.into(),
            tesseract: tesseract.into(),
            dpi,
            runner,
        }
    }

    fn rasterize(&self, pdf: &Path, workdir: &Path) -> Result<Vec<PathBuf>, ToolError> {
        let prefix = workdir.join("page");
        self.runner.run(
            &self.pdftoppm,
            [
                OsString::from("-r"),
                OsString::from(self.dpi.to_string()),
                OsString::from("-png"),
                pdf.as_os_str().to_os_string(),
                prefix.into_os_string(),
            ],
        )?;

        let entries = fs::read_dir(workdir).map_err(|source| ToolError::Io {
            path: workdir.to_path_buf(),
            source,
        })?;
        let mut images: Vec<PathBuf> = entries
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|path| path.extension().is_some_and(|ext| ext == "png"))
            .collect();
        // pdftoppm 按页数位数补零，字典序即页序
        images.sort();
        if images.is_empty() {
            return Err(ToolError::InvalidOutput {
                program: self.pdftoppm.clone(),
                reason: "未生成任何页面图像".to_string(),
            });
        }
        Ok(images)
    }
}

impl OcrEngine for TesseractOcr {
    fn recognize(&self, pdf: &Path) -> Result<String, ToolError> {
        let workdir = tempfile::tempdir().map_err(|source| ToolError::Io {
            path: std::env::temp_dir(),
            source,
        })?;
        let images = self.rasterize(pdf, workdir.path())?;

        let mut pages = Vec::with_capacity(images.len());
        for image in &images {
            let stdout = self
                .runner
                .run(&self.tesseract, [image.as_os_str(), OsStr::new("stdout")])?;
            pages.push(String::from_utf8_lossy(&stdout).into_owned());
        }
        debug!(pdf = %pdf.display(), pages = pages.len(), "OCR 完成");
        Ok(pages.join("\n"))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub label: String,
    pub confidence: f64,
    /// `[x1, y1, x2, y2]`，像素坐标。
    pub bbox: [f64; 4],
}

/// 图像目标检测。
pub trait ObjectDetector {
    fn detect(&self, image: &Path) -> Result<Vec<Detection>, ToolError>;
}

/// 调用外部检测命令，命令须在标准输出打印 `Detection` 的 JSON 数组。
pub struct CommandDetector {
    command: Vec<String>,
    runner: CommandRunner,
}

impl CommandDetector {
    pub fn new(command: Vec<String>, runner: CommandRunner) -> Self {
        Self { command, runner }
    }
}

impl ObjectDetector for CommandDetector {
    fn detect(&self, image: &Path) -> Result<Vec<Detection>, ToolError> {
        let (program, fixed_args) = self
            .command
            .split_first()
            .ok_or(ToolError::NotConfigured("tools.detector"))?;
        let args = fixed_args
            .iter()
            .map(OsString::from)
            .chain(std::iter::once(image.as_os_str().to_os_string()));
        let stdout = self.runner.run(program, args)?;
        serde_json::from_slice(&stdout).map_err(|err| ToolError::InvalidOutput {
            program: program.clone(),
            reason: err.to_string(),
        })
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn runner(millis: u64) -> CommandRunner {
        CommandRunner::new(Duration::from_millis(millis))
    }

    #[test]
    fn stdout_is_returned_on_success() {
        let stdout = runner(5_000)
            .run("sh", ["-c", "printf 'plan'"])
            .expect("sh runs");
        assert_eq!(stdout, b"plan");
    }

    #[test]
    fn slow_tool_times_out() {
        let err = runner(200)
            .run("sh", ["-c", "sleep 5"])
            .expect_err("must time out");
        assert!(matches!(err, ToolError::Timeout { .. }), "{err}");
    }

    #[test]
    fn missing_program_and_bad_exit_are_distinguished() {
        let err = runner(5_000)
            .run("takeoff-no-such-tool", ["--version"])
            .expect_err("program is absent");
        assert!(matches!(err, ToolError::NotFound { .. }));

        let err = runner(5_000)
            .run("sh", ["-c", "echo broken >&2; exit 3"])
            .expect_err("non-zero exit");
        match err {
            ToolError::Failed { stderr, .. } => assert_eq!(stderr, "broken"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn detector_parses_json_and_appends_image_path() {
        let script = r#"printf '[{"label":"door","confidence":0.9,"bbox":[1,2,3,4]}]'; test -n "$1""#;
        let detector = CommandDetector::new(
            vec![
                "sh".to_string(),
                "-c".to_string(),
                script.to_string(),
                "detector".to_string(),
            ],
            runner(5_000),
        );
        let detections = detector
            .detect(Path::new("plan.png"))
            .expect("detector output parses");
        assert_eq!(
            detections,
            vec![Detection {
                label: "door".to_string(),
                confidence: 0.9,
                bbox: [1.0, 2.0, 3.0, 4.0],
            }]
        );
    }

    #[test]
    fn unconfigured_detector_is_reported() {
        let detector = CommandDetector::new(Vec::new(), runner(5_000));
        let err = detector
            .detect(Path::new("plan.png"))
            .expect_err("no command configured");
        assert!(matches!(err, ToolError::NotConfigured("tools.detector")));
    }
}
