use std::fmt;
use std::path::Path;

use lopdf::content::{Content, Operation};
use lopdf::{Document, Object};
use tracing::{debug, warn};

use crate::tools::ToolError;

/// PDF 读取入口：逐页文本与逐页矢量路径。
pub trait PdfExtractor {
    fn page_texts(&self, path: &Path) -> Result<Vec<String>, ToolError>;
    fn page_drawings(&self, path: &Path) -> Result<Vec<Vec<VectorPath>>, ToolError>;
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PagePoint {
    pub x: f32,
    pub y: f32,
}

impl PagePoint {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

impl fmt::Display for PagePoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PathSegment {
    Line(PagePoint, PagePoint),
    Curve(PagePoint, PagePoint, PagePoint, PagePoint),
    Rect { x: f32, y: f32, width: f32, height: f32 },
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathSegment::Line(from, to) => write!(f, "l {from} {to}"),
            PathSegment::Curve(p0, p1, p2, p3) => write!(f, "c {p0} {p1} {p2} {p3}"),
            PathSegment::Rect {
                x,
                y,
                width,
                height,
            } => write!(f, "re ({x}, {y}, {width}, {height})"),
        }
    }
}

/// 绘制方式：仅描边、仅填充、填充并描边。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaintKind {
    Stroke,
    Fill,
    FillStroke,
}

impl PaintKind {
    pub fn as_str(self) -> &'static str {
        match self {
            PaintKind::Stroke => "s",
            PaintKind::Fill => "f",
            PaintKind::FillStroke => "fs",
        }
    }

    fn strokes(self) -> bool {
        matches!(self, PaintKind::Stroke | PaintKind::FillStroke)
    }

    fn fills(self) -> bool {
        matches!(self, PaintKind::Fill | PaintKind::FillStroke)
    }
}

/// 颜色分量，长度随色彩空间变化（灰度 1、RGB 3、CMYK 4）。
#[derive(Debug, Clone, PartialEq)]
pub struct PathColor(pub Vec<f32>);

impl fmt::Display for PathColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(f32::to_string).collect();
        write!(f, "({})", parts.join(", "))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct VectorPath {
    pub paint: PaintKind,
    pub stroke_color: Option<PathColor>,
    pub fill_color: Option<PathColor>,
    pub stroke_width: Option<f32>,
    pub segments: Vec<PathSegment>,
}

impl VectorPath {
    /// 坐标列的文本形式，各段以 `; ` 分隔。
    pub fn coordinates(&self) -> String {
        self.segments
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; ")
    }
}

pub struct LopdfExtractor;

impl LopdfExtractor {
    pub fn new() -> Self {
        Self
    }

    fn open(path: &Path) -> Result<Document, ToolError> {
        Document::load(path).map_err(|source| ToolError::Pdf {
            path: path.to_path_buf(),
            source,
        })
    }
}

impl Default for LopdfExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl PdfExtractor for LopdfExtractor {
    fn page_texts(&self, path: &Path) -> Result<Vec<String>, ToolError> {
        let document = Self::open(path)?;
        let pages = document.get_pages();
        let mut texts = Vec::with_capacity(pages.len());
        for page_number in pages.keys() {
            match document.extract_text(&[*page_number]) {
                Ok(text) => texts.push(text),
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        page = page_number,
                        error = %err,
                        "页面文本提取失败，按空页处理"
                    );
                    texts.push(String::new());
                }
            }
        }
        debug!(path = %path.display(), pages = texts.len(), "PDF 文本提取完成");
        Ok(texts)
    }

    fn page_drawings(&self, path: &Path) -> Result<Vec<Vec<VectorPath>>, ToolError> {
        let document = Self::open(path)?;
        let pages = document.get_pages();
        let mut drawings = Vec::with_capacity(pages.len());
        for (page_number, page_id) in pages {
            let decoded = document
                .get_page_content(page_id)
                .and_then(|data| Content::decode(&data));
            match decoded {
                Ok(content) => drawings.push(interpret_paths(&content.operations)),
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        page = page_number,
                        error = %err,
                        "页面内容流解析失败，按无图形处理"
                    );
                    drawings.push(Vec::new());
                }
            }
        }
        Ok(drawings)
    }
}

#[derive(Debug, Clone)]
struct GraphicsState {
    stroke_color: PathColor,
    fill_color: PathColor,
    line_width: f32,
}

impl Default for GraphicsState {
    fn default() -> Self {
        Self {
            stroke_color: PathColor(vec![0.0]),
            fill_color: PathColor(vec![0.0]),
            line_width: 1.0,
        }
    }
}

/// 解释内容流中的路径构造与绘制操作符，输出已绘制的路径。
/// 只跟踪颜色与线宽，不处理变换矩阵；坐标为用户空间原值。
pub(crate) fn interpret_paths(operations: &[Operation]) -> Vec<VectorPath> {
    let mut state = GraphicsState::default();
    let mut stack: Vec<GraphicsState> = Vec::new();
    let mut segments: Vec<PathSegment> = Vec::new();
    let mut current: Option<PagePoint> = None;
    let mut subpath_start: Option<PagePoint> = None;
    let mut paths = Vec::new();

    for operation in operations {
        let operands = numbers(&operation.operands);
        match operation.operator.as_str() {
            "q" => stack.push(state.clone()),
            "Q" => {
                if let Some(saved) = stack.pop() {
                    state = saved;
                }
            }
            "w" => {
                if let Some(width) = operands.first() {
                    state.line_width = *width;
                }
            }
            "RG" | "G" | "K" | "SC" | "SCN" => {
                if !operands.is_empty() {
                    state.stroke_color = PathColor(operands);
                }
            }
            "rg" | "g" | "k" | "sc" | "scn" => {
                if !operands.is_empty() {
                    state.fill_color = PathColor(operands);
                }
            }
            "m" => {
                if let [x, y, ..] = operands[..] {
                    let point = PagePoint::new(x, y);
                    current = Some(point);
                    subpath_start = Some(point);
                }
            }
            "l" => {
                if let ([x, y, ..], Some(from)) = (&operands[..], current) {
                    let to = PagePoint::new(*x, *y);
                    segments.push(PathSegment::Line(from, to));
                    current = Some(to);
                }
            }
            "c" => {
                if let ([x1, y1, x2, y2, x3, y3, ..], Some(from)) = (&operands[..], current) {
                    let end = PagePoint::new(*x3, *y3);
                    segments.push(PathSegment::Curve(
                        from,
                        PagePoint::new(*x1, *y1),
                        PagePoint::new(*x2, *y2),
                        end,
                    ));
                    current = Some(end);
                }
            }
            "v" => {
                if let ([x2, y2, x3, y3, ..], Some(from)) = (&operands[..], current) {
                    let end = PagePoint::new(*x3, *y3);
                    segments.push(PathSegment::Curve(
                        from,
                        from,
                        PagePoint::new(*x2, *y2),
                        end,
                    ));
                    current = Some(end);
                }
            }
            "y" => {
                if let ([x1, y1, x3, y3, ..], Some(from)) = (&operands[..], current) {
                    let end = PagePoint::new(*x3, *y3);
                    segments.push(PathSegment::Curve(from, PagePoint::new(*x1, *y1), end, end));
                    current = Some(end);
                }
            }
            "re" => {
                if let [x, y, width, height, ..] = operands[..] {
                    segments.push(PathSegment::Rect {
                        x,
                        y,
                        width,
                        height,
                    });
                    let origin = PagePoint::new(x, y);
                    current = Some(origin);
                    subpath_start = Some(origin);
                }
            }
            "h" => close_subpath(&mut segments, &mut current, subpath_start),
            "S" => paint(&mut paths, &mut segments, &state, PaintKind::Stroke),
            "s" => {
                close_subpath(&mut segments, &mut current, subpath_start);
                paint(&mut paths, &mut segments, &state, PaintKind::Stroke);
            }
            "f" | "F" | "f*" => paint(&mut paths, &mut segments, &state, PaintKind::Fill),
            "B" | "B*" => paint(&mut paths, &mut segments, &state, PaintKind::FillStroke),
            "b" | "b*" => {
                close_subpath(&mut segments, &mut current, subpath_start);
                paint(&mut paths, &mut segments, &state, PaintKind::FillStroke);
            }
            "n" => segments.clear(),
            _ => {}
        }
    }
    paths
}

fn close_subpath(
    segments: &mut Vec<PathSegment>,
    current: &mut Option<PagePoint>,
    subpath_start: Option<PagePoint>,
) {
    if let (Some(from), Some(start)) = (*current, subpath_start) {
        if from != start {
            segments.push(PathSegment::Line(from, start));
        }
        *current = Some(start);
    }
}

fn paint(
    paths: &mut Vec<VectorPath>,
    segments: &mut Vec<PathSegment>,
    state: &GraphicsState,
    kind: PaintKind,
) {
    if segments.is_empty() {
        return;
    }
    paths.push(VectorPath {
        paint: kind,
        stroke_color: kind.strokes().then(|| state.stroke_color.clone()),
        fill_color: kind.fills().then(|| state.fill_color.clone()),
        stroke_width: kind.strokes().then_some(state.line_width),
        segments: std::mem::take(segments),
    });
}

fn numbers(operands: &[Object]) -> Vec<f32> {
    operands
        .iter()
        .filter_map(|operand| match operand {
            Object::Integer(value) => Some(*value as f32),
            Object::Real(value) => Some(*value as f32),
            _ => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn op(operator: &str, operands: Vec<Object>) -> Operation {
        Operation::new(operator, operands)
    }

    #[test]
    fn stroked_rectangle_keeps_color_and_width() {
        let operations = vec![
            op("q", vec![]),
            op("w", vec![2.into()]),
            op("RG", vec![1.into(), 0.into(), 0.into()]),
            op("re", vec![10.into(), 20.into(), 30.into(), 40.into()]),
            op("S", vec![]),
            op("Q", vec![]),
            op("m", vec![0.into(), 0.into()]),
            op("l", vec![5.into(), 0.into()]),
            op("S", vec![]),
        ];

        let paths = interpret_paths(&operations);
        assert_eq!(paths.len(), 2);
        assert_eq!(paths[0].paint, PaintKind::Stroke);
        assert_eq!(paths[0].stroke_color, Some(PathColor(vec![1.0, 0.0, 0.0])));
        assert_eq!(paths[0].fill_color, None);
        assert_eq!(paths[0].stroke_width, Some(2.0));
        assert_eq!(paths[0].coordinates(), "re (10, 20, 30, 40)");

        // Q 恢复默认线宽与颜色
        assert_eq!(paths[1].stroke_width, Some(1.0));
        assert_eq!(paths[1].stroke_color, Some(PathColor(vec![0.0])));
        assert_eq!(paths[1].coordinates(), "l (0, 0) (5, 0)");
    }

    #[test]
    fn close_and_fill_adds_closing_edge() {
        let operations = vec![
            op("rg", vec![Object::Real(0.5)]),
            op("m", vec![0.into(), 0.into()]),
            op("l", vec![4.into(), 0.into()]),
            op("l", vec![4.into(), 3.into()]),
            op("b", vec![]),
        ];
        let paths = interpret_paths(&operations);
        assert_eq!(paths.len(), 1);
        assert_eq!(paths[0].paint, PaintKind::FillStroke);
        assert_eq!(paths[0].fill_color, Some(PathColor(vec![0.5])));
        assert_eq!(paths[0].segments.len(), 3);
        assert_eq!(
            paths[0].segments[2],
            PathSegment::Line(PagePoint::new(4.0, 3.0), PagePoint::new(0.0, 0.0))
        );
    }

    #[test]
    fn discarded_paths_are_not_reported() {
        let operations = vec![
            op("re", vec![0.into(), 0.into(), 1.into(), 1.into()]),
            op("W", vec![]),
            op("n", vec![]),
            op("f", vec![]),
        ];
        assert!(interpret_paths(&operations).is_empty());
    }
}
