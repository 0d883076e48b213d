use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

pub const PDF_EXTENSIONS: &[&str] = &["pdf"];
pub const DXF_EXTENSIONS: &[&str] = &["dxf"];
pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg"];

/// 列出目录下匹配扩展名（不区分大小写）的文件，按路径排序；目录不存在时返回空列表。
pub fn discover(dir: &Path, extensions: &[&str]) -> Vec<PathBuf> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) => {
            warn!(dir = %dir.display(), error = %err, "无法读取输入目录");
            return Vec::new();
        }
    };

    let mut paths: Vec<PathBuf> = entries
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && has_extension(path, extensions))
        .collect();
    paths.sort();
    debug!(dir = %dir.display(), count = paths.len(), "发现输入文件");
    paths
}

fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            extensions
                .iter()
                .any(|candidate| ext.eq_ignore_ascii_case(candidate))
        })
}

/// 输出文件名使用的基名（去掉扩展名）。
pub fn base_name(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// 按文件名去重，保留先出现的路径，结果按文件名排序。
pub fn dedupe_by_file_name(paths: impl IntoIterator<Item = PathBuf>) -> Vec<PathBuf> {
    let mut deduped: Vec<PathBuf> = Vec::new();
    for path in paths {
        let duplicate = deduped
            .iter()
            .any(|existing| existing.file_name() == path.file_name());
        if !duplicate {
            deduped.push(path);
        }
    }
    deduped.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    deduped
}
