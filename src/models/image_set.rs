use std::path::{Path, PathBuf};

/// 校验通过的图像集合
///
/// 只能由图像校验器创建；重新选择目录时整体替换，不做局部修改。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageSet {
    directory: PathBuf,
    file_names: Vec<String>,
}

impl ImageSet {
    pub(crate) fn new(directory: PathBuf, file_names: Vec<String>) -> Self {
        Self {
            directory,
            file_names,
        }
    }

    /// 图像目录（绝对路径）
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// 文件名，顺序与目录列举顺序一致
    pub fn file_names(&self) -> &[String] {
        &self.file_names
    }

    pub fn len(&self) -> usize {
        self.file_names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.file_names.is_empty()
    }
}
