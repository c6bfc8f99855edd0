use std::collections::HashMap;
use std::fs;
use std::path::Path;

use encoding_rs::Encoding;
use thiserror::Error;
use tracing::debug;
use unfold_core::document::{Drawing, EntityId};

mod code_page;
mod entities;
mod reader;
mod writer;

use entities::PointSlot;
use reader::{DxfReader, Pair};

#[derive(Debug, Error)]
pub enum IoError {
    #[error("unsupported feature: {0}")]
    UnsupportedFeature(String),
    #[error("failed to read file {path:?}: {source}")]
    ReadError {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write file {path:?}: {source}")]
    WriteError {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid document structure: {0}")]
    InvalidDocument(String),
}

impl From<DxfError> for IoError {
    fn from(err: DxfError) -> Self {
        match err {
            DxfError::Unsupported { feature } => IoError::UnsupportedFeature(feature),
            DxfError::Invalid { message } => IoError::InvalidDocument(message),
        }
    }
}

pub trait DocumentLoader {
    fn load(&self, path: &Path) -> Result<DxfDocument, IoError>;
}

pub trait DocumentSaver {
    fn save(&self, document: &DxfDocument, path: &Path) -> Result<(), IoError>;
}

/// 读入的 DXF 文件：几何模型 + 写回时需要的原始组码布局。
///
/// 只有定位点坐标会在写回时被改写，其余组码（句柄、Z 值、扩展数据、
/// 图层表等）逐字保留。
#[derive(Debug, Clone)]
pub struct DxfDocument {
    drawing: Drawing,
    layout: Option<Layout>,
    encoding: &'static Encoding,
}

#[derive(Debug, Clone)]
pub(crate) struct Layout {
    pub(crate) head: Vec<Pair>,
    pub(crate) records: HashMap<EntityId, EntityRecord>,
    pub(crate) tail: Vec<Pair>,
    /// 原文件的换行符，写回时沿用。
    pub(crate) line_ending: &'static str,
}

#[derive(Debug, Clone)]
pub(crate) struct EntityRecord {
    pub(crate) pairs: Vec<Pair>,
    pub(crate) slots: Vec<PointSlot>,
}

impl DxfDocument {
    /// 从纯几何构造，写出时生成最小 DXF 结构。
    pub fn from_drawing(drawing: Drawing) -> Self {
        Self {
            drawing,
            layout: None,
            encoding: encoding_rs::UTF_8,
        }
    }

    pub fn drawing(&self) -> &Drawing {
        &self.drawing
    }

    pub fn drawing_mut(&mut self) -> &mut Drawing {
        &mut self.drawing
    }

    /// 用新的几何替换当前几何；实体编号沿用时原始组码仍可对应。
    pub fn with_drawing(&self, drawing: Drawing) -> Self {
        Self {
            drawing,
            layout: self.layout.clone(),
            encoding: self.encoding,
        }
    }

    pub fn encoding_name(&self) -> &'static str {
        self.encoding.name()
    }

    pub fn to_dxf_string(&self) -> String {
        writer::write_document(&self.drawing, self.layout.as_ref())
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        code_page::encode(&self.to_dxf_string(), self.encoding)
    }
}

#[derive(Debug, Default)]
pub struct DxfFacade;

impl DxfFacade {
    pub fn new() -> Self {
        Self
    }

    /// 解析已解码的 DXF 文本。
    pub fn parse_str(&self, source: &str) -> Result<DxfDocument, IoError> {
        parse_document(source, encoding_rs::UTF_8).map_err(IoError::from)
    }

    pub fn parse_bytes(&self, bytes: &[u8]) -> Result<DxfDocument, IoError> {
        if bytes.starts_with(b"AutoCAD Binary DXF") {
            return Err(DxfError::unsupported("二进制 DXF").into());
        }
        let (text, encoding) = code_page::decode(bytes);
        parse_document(&text, encoding).map_err(IoError::from)
    }
}

impl DocumentLoader for DxfFacade {
    fn load(&self, path: &Path) -> Result<DxfDocument, IoError> {
        let data = fs::read(path).map_err(|source| IoError::ReadError {
            path: path.to_path_buf(),
            source,
        })?;
        let document = self.parse_bytes(&data)?;
        debug!(
            path = %path.display(),
            entities = document.drawing.len(),
            encoding = document.encoding_name(),
            "DXF 已读取"
        );
        Ok(document)
    }
}

impl DocumentSaver for DxfFacade {
    fn save(&self, document: &DxfDocument, path: &Path) -> Result<(), IoError> {
        fs::write(path, document.to_bytes()).map_err(|source| IoError::WriteError {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), "DXF 已写出");
        Ok(())
    }
}

#[derive(Debug)]
pub(crate) enum DxfError {
    Unsupported { feature: String },
    Invalid { message: String },
}

impl DxfError {
    fn unsupported(feature: impl Into<String>) -> Self {
        Self::Unsupported {
            feature: feature.into(),
        }
    }

    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid {
            message: message.into(),
        }
    }
}

fn parse_document(source: &str, encoding: &'static Encoding) -> Result<DxfDocument, DxfError> {
    let pairs = DxfReader::new(source).read_all()?;
    let split = entities::split_entities_section(pairs)?;

    let mut drawing = Drawing::new();
    let mut records = HashMap::with_capacity(split.records.len());
    for record in split.records {
        let (entity, slots) = entities::parse_record(&record);
        let id = drawing.add_entity(entity);
        records.insert(
            id,
            EntityRecord {
                pairs: record,
                slots,
            },
        );
    }

    Ok(DxfDocument {
        drawing,
        layout: Some(Layout {
            head: split.head,
            records,
            tail: split.tail,
            line_ending: detect_line_ending(source),
        }),
        encoding,
    })
}

fn detect_line_ending(source: &str) -> &'static str {
    match source.find('\n') {
        Some(index) if source[..index].ends_with('\r') => "\r\n",
        _ => "\n",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crlf_files_are_written_back_with_crlf() {
        let source = "0\r\nSECTION\r\n2\r\nENTITIES\r\n0\r\nPOINT\r\n8\r\n0\r\n10\r\n1.5\r\n20\r\n2.5\r\n0\r\nENDSEC\r\n0\r\nEOF\r\n";
        let document = DxfFacade::new().parse_str(source).unwrap();
        let written = document.to_dxf_string();
        assert!(written.contains("POINT\r\n"));
        assert_eq!(written.matches('\n').count(), written.matches("\r\n").count());

        let unix = DxfFacade::new()
            .parse_str(&source.replace("\r\n", "\n"))
            .unwrap();
        assert!(!unix.to_dxf_string().contains('\r'));
    }

    #[test]
    fn binary_dxf_is_rejected() {
        let err = DxfFacade::new()
            .parse_bytes(b"AutoCAD Binary DXF\r\n\x1a\x00")
            .unwrap_err();
        assert!(matches!(err, IoError::UnsupportedFeature(_)));
    }

    #[test]
    fn missing_entities_maps_to_invalid_document() {
        let err = DxfFacade::new()
            .parse_str("0\nSECTION\n2\nHEADER\n0\nENDSEC\n0\nEOF\n")
            .unwrap_err();
        assert!(matches!(err, IoError::InvalidDocument(_)));
    }
}
