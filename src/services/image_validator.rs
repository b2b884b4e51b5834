//! 图像目录校验服务 - 业务能力层
//!
//! 只回答"这个目录能不能作为重建输入"，不修改工作区

use crate::error::ValidationError;
use crate::models::ImageSet;
use image::ImageFormat;
use std::fs::{self, File};
use std::io::{self, Read};
use std::path::Path;
use tracing::{debug, info};

/// 判断格式时读取的文件头字节数
const SNIFF_BYTES: u64 = 64;

/// 校验图像目录
///
/// 规则：
/// - 路径必须存在且是目录
/// - 目录不能为空
/// - 每个条目都必须是可识别的图像文件（按内容判断，不看扩展名）
///
/// 按 `read_dir` 的顺序检查，遇到第一个非图像条目即返回错误。
pub fn validate(path: &Path) -> Result<ImageSet, ValidationError> {
    let metadata = match fs::metadata(path) {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(ValidationError::NotFound {
                path: path.to_path_buf(),
            })
        }
        Err(source) => {
            return Err(ValidationError::Unreadable {
                path: path.to_path_buf(),
                source,
            })
        }
    };
    if !metadata.is_dir() {
        return Err(ValidationError::NotADirectory {
            path: path.to_path_buf(),
        });
    }

    let directory = path.canonicalize().map_err(|source| ValidationError::Unreadable {
        path: path.to_path_buf(),
        source,
    })?;
    let entries = fs::read_dir(&directory).map_err(|source| ValidationError::Unreadable {
        path: directory.clone(),
        source,
    })?;

    let mut file_names = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| ValidationError::Unreadable {
            path: directory.clone(),
            source,
        })?;
        let file_name = entry.file_name().to_string_lossy().into_owned();

        match sniff_format(&entry.path()) {
            Some(format) => debug!("  {} -> {:?}", file_name, format),
            None => return Err(ValidationError::NotAnImage { file_name }),
        }
        file_names.push(file_name);
    }

    if file_names.is_empty() {
        return Err(ValidationError::Empty { path: directory });
    }

    info!("🖼️ 图像目录校验通过: {} ({} 张)", directory.display(), file_names.len());
    Ok(ImageSet::new(directory, file_names))
}

/// 按文件头识别图像格式
///
/// 目录、无法打开的文件、无法识别的内容都返回 None。
pub fn sniff_format(path: &Path) -> Option<ImageFormat> {
    if !path.is_file() {
        return None;
    }
    let mut header = Vec::with_capacity(SNIFF_BYTES as usize);
    File::open(path)
        .ok()?
        .take(SNIFF_BYTES)
        .read_to_end(&mut header)
        .ok()?;
    image::guess_format(&header).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_MAGIC: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR";
    const JPEG_MAGIC: &[u8] = b"\xFF\xD8\xFF\xE0\0\x10JFIF\0";

    #[test]
    fn sniffs_by_content_not_extension() {
        let tmp = tempfile::tempdir().unwrap();
        let disguised = tmp.path().join("photo.txt");
        std::fs::write(&disguised, JPEG_MAGIC).unwrap();
        let fake = tmp.path().join("photo.png");
        std::fs::write(&fake, b"hello").unwrap();

        assert_eq!(sniff_format(&disguised), Some(ImageFormat::Jpeg));
        assert_eq!(sniff_format(&fake), None);
        assert_eq!(sniff_format(tmp.path()), None);
    }

    #[test]
    fn accepts_directory_of_images() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("IMG_0001.png"), PNG_MAGIC).unwrap();
        std::fs::write(tmp.path().join("IMG_0002.jpg"), JPEG_MAGIC).unwrap();

        let set = validate(tmp.path()).unwrap();
        assert_eq!(set.len(), 2);
        assert_eq!(set.directory(), tmp.path().canonicalize().unwrap());
    }

    #[test]
    fn missing_path_is_not_found() {
        let tmp = tempfile::tempdir().unwrap();
        let err = validate(&tmp.path().join("nope")).unwrap_err();
        assert!(matches!(err, ValidationError::NotFound { .. }));
    }

    #[test]
    fn regular_file_is_not_a_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let file = tmp.path().join("IMG_0001.png");
        std::fs::write(&file, PNG_MAGIC).unwrap();
        let err = validate(&file).unwrap_err();
        assert!(matches!(err, ValidationError::NotADirectory { .. }));
    }

    #[test]
    fn empty_directory_is_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let err = validate(tmp.path()).unwrap_err();
        assert!(matches!(err, ValidationError::Empty { .. }));
    }

    #[test]
    fn subdirectory_counts_as_non_image() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::create_dir(tmp.path().join("thumbs")).unwrap();
        let err = validate(tmp.path()).unwrap_err();
        match err {
            ValidationError::NotAnImage { file_name } => assert_eq!(file_name, "thumbs"),
            other => panic!("unexpected error: {other}"),
        }
    }
}
