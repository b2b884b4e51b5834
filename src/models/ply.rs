//! PLY (Polygon File Format) 文件头读取
//!
//! 只解析文件头，不读取顶点数据。用于在交给查看器前确认产物
//! 确实是 PLY 文件，并输出顶点 / 面数量摘要。

use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

/// 文件头最多读取的行数
const MAX_HEADER_LINES: usize = 512;

/// 文件头单行的最大字节数
const MAX_LINE_BYTES: u64 = 4096;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlyFormat {
    Ascii,
    BinaryLittleEndian,
    BinaryBigEndian,
}

impl fmt::Display for PlyFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PlyFormat::Ascii => "ascii",
            PlyFormat::BinaryLittleEndian => "binary_little_endian",
            PlyFormat::BinaryBigEndian => "binary_big_endian",
        };
        f.write_str(name)
    }
}

/// PLY 文件头
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlyHeader {
    pub format: PlyFormat,
    pub vertex_count: usize,
    pub face_count: usize,
    pub has_colors: bool,
    pub has_normals: bool,
}

impl PlyHeader {
    pub fn from_path(path: &Path) -> Result<Self, String> {
        let file = File::open(path).map_err(|e| format!("无法打开文件: {}", e))?;
        read_header(BufReader::new(file))
    }

    /// 是否是点云（没有面）
    pub fn is_point_cloud(&self) -> bool {
        self.face_count == 0
    }
}

/// 从 reader 中解析 PLY 文件头
///
/// 二进制 PLY 的文件头同样是 ASCII 行，读到 `end_header` 为止。
pub fn read_header<R: BufRead>(mut reader: R) -> Result<PlyHeader, String> {
    let mut buf = Vec::new();
    let mut next_line = |reader: &mut R| -> Result<Option<String>, String> {
        buf.clear();
        let read = reader
            .take(MAX_LINE_BYTES)
            .read_until(b'\n', &mut buf)
            .map_err(|e| format!("读取文件头失败: {}", e))?;
        if read == 0 {
            return Ok(None);
        }
        if read as u64 == MAX_LINE_BYTES && buf.last() != Some(&b'\n') {
            return Err(format!("文件头行过长 (超过 {} 字节)", MAX_LINE_BYTES));
        }
        Ok(Some(String::from_utf8_lossy(&buf).trim().to_string()))
    };

    match next_line(&mut reader)? {
        Some(magic) if magic == "ply" => {}
        _ => return Err("缺少 ply 标识".to_string()),
    }

    let mut format = None;
    let mut vertex_count = 0;
    let mut face_count = 0;
    let mut has_colors = false;
    let mut has_normals = false;
    let mut current_element = String::new();

    for _ in 0..MAX_HEADER_LINES {
        let line = next_line(&mut reader)?.ok_or_else(|| "文件头意外结束".to_string())?;
        let mut parts = line.split_whitespace();

        match parts.next() {
            Some("format") => {
                format = Some(match parts.next() {
                    Some("ascii") => PlyFormat::Ascii,
                    Some("binary_little_endian") => PlyFormat::BinaryLittleEndian,
                    Some("binary_big_endian") => PlyFormat::BinaryBigEndian,
                    other => return Err(format!("不支持的格式: {:?}", other)),
                });
            }
            Some("element") => {
                let name = parts.next().unwrap_or_default().to_string();
                let count: usize = parts
                    .next()
                    .and_then(|c| c.parse().ok())
                    .ok_or_else(|| format!("无效的元素数量: {}", line))?;
                match name.as_str() {
                    "vertex" => vertex_count = count,
                    "face" => face_count = count,
                    _ => {}
                }
                current_element = name;
            }
            Some("property") if current_element == "vertex" => {
                let property = parts.last().unwrap_or_default();
                match property {
                    "red" | "green" | "blue" => has_colors = true,
                    "nx" | "ny" | "nz" => has_normals = true,
                    _ => {}
                }
            }
            Some("end_header") => {
                let format = format.ok_or_else(|| "缺少 format 行".to_string())?;
                return Ok(PlyHeader {
                    format,
                    vertex_count,
                    face_count,
                    has_colors,
                    has_normals,
                });
            }
            _ => {}
        }
    }

    Err("文件头过长".to_string())
}
