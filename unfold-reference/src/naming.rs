use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use unfold_config::NamingConfig;

use crate::errors::MatchError;
use crate::has_dxf_extension;

/// 工作图所属的一侧：外侧对应参考图中半径较大的圆弧。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Outer,
    Inner,
}

impl Side {
    pub fn other(self) -> Side {
        match self {
            Side::Outer => Side::Inner,
            Side::Inner => Side::Outer,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Side::Outer => "outer",
            Side::Inner => "inner",
        })
    }
}

#[derive(Debug, Error)]
#[error("unknown side \"{0}\" (expected outer or inner)")]
pub struct ParseSideError(String);

impl FromStr for Side {
    type Err = ParseSideError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "outer" => Ok(Side::Outer),
            "inner" => Ok(Side::Inner),
            _ => Err(ParseSideError(value.to_string())),
        }
    }
}

/// 文件夹命名约定：参考图前缀、装配编号标记、两侧标记与已处理后缀。
#[derive(Debug, Clone)]
pub struct NamingConvention {
    reference_marker: String,
    assembly_marker: String,
    outer_marker: String,
    inner_marker: String,
    processed_suffixes: Vec<String>,
    derived_suffix: String,
    assembly_pattern: Regex,
    fallback_pattern: Regex,
}

impl NamingConvention {
    pub fn new(config: &NamingConfig) -> Result<Self, regex::Error> {
        let assembly_pattern = Regex::new(&format!(
            r"(?i){}(\d+)",
            regex::escape(&config.assembly_marker)
        ))?;
        // 形如 Г12.3 的图号，取最后一组数字
        let fallback_pattern = Regex::new(r"(?i)Г\d*\.?(\d+)")?;
        Ok(Self {
            reference_marker: config.reference_marker.clone(),
            assembly_marker: config.assembly_marker.clone(),
            outer_marker: config.outer_marker.clone(),
            inner_marker: config.inner_marker.clone(),
            processed_suffixes: config.processed_suffixes.clone(),
            derived_suffix: config.derived_suffix.clone(),
            assembly_pattern,
            fallback_pattern,
        })
    }

    /// 追加一个输出后缀，使该后缀的文件在重新扫描时被排除。
    pub fn with_processed_suffix(mut self, suffix: impl Into<String>) -> Self {
        let suffix = suffix.into();
        if !suffix.is_empty() && !self.processed_suffixes.contains(&suffix) {
            self.processed_suffixes.push(suffix);
        }
        self
    }

    pub fn reference_marker(&self) -> &str {
        &self.reference_marker
    }

    pub fn marker(&self, side: Side) -> &str {
        match side {
            Side::Outer => &self.outer_marker,
            Side::Inner => &self.inner_marker,
        }
    }

    /// 从文件名提取装配编号，统一为 `<标记><数字>`。
    pub fn assembly_id(&self, file_name: &str) -> Result<String, MatchError> {
        let digits = self
            .assembly_pattern
            .captures(file_name)
            .or_else(|| self.fallback_pattern.captures(file_name))
            .and_then(|captures| captures.get(1))
            .map(|digits| digits.as_str())
            .ok_or_else(|| MatchError::UnparsableFilename {
                name: file_name.to_string(),
                reason: format!("no assembly identifier after \"{}\"", self.assembly_marker),
            })?;
        Ok(format!("{}{}", self.assembly_marker, digits))
    }

    /// 外侧标记优先于内侧标记，均不区分大小写。
    pub fn side(&self, file_name: &str) -> Result<Side, MatchError> {
        let lowered = file_name.to_lowercase();
        if lowered.contains(&self.outer_marker.to_lowercase()) {
            Ok(Side::Outer)
        } else if lowered.contains(&self.inner_marker.to_lowercase()) {
            Ok(Side::Inner)
        } else {
            Err(MatchError::UnparsableFilename {
                name: file_name.to_string(),
                reason: format!(
                    "neither \"{}\" nor \"{}\" in name",
                    self.outer_marker, self.inner_marker
                ),
            })
        }
    }

    pub fn is_reference_file(&self, path: &Path) -> bool {
        has_dxf_extension(path)
            && path
                .file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| name.starts_with(&self.reference_marker))
    }

    /// 以侧标记开头、尚未处理过的 dxf 文件。
    pub fn is_work_file(&self, path: &Path) -> bool {
        if !has_dxf_extension(path) {
            return false;
        }
        let (Some(name), Some(stem)) = (
            path.file_name().and_then(|name| name.to_str()),
            path.file_stem().and_then(|stem| stem.to_str()),
        ) else {
            return false;
        };
        let lowered = name.to_lowercase();
        let has_side = [&self.outer_marker, &self.inner_marker]
            .iter()
            .any(|marker| lowered.starts_with(&marker.to_lowercase()));
        has_side && !self.is_processed_stem(stem)
    }

    /// 拉伸输出与由内侧图生成的外侧图都算已处理。
    pub fn is_processed_stem(&self, stem: &str) -> bool {
        self.processed_suffixes
            .iter()
            .chain(std::iter::once(&self.derived_suffix))
            .any(|suffix| !suffix.is_empty() && stem.ends_with(suffix.as_str()))
    }

    /// 由内侧图推导的外侧图文件名，与输入同目录。
    pub fn derived_outer_path(&self, inner_path: &Path) -> PathBuf {
        let stem = inner_path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default();
        let renamed = stem
            .replace(&self.inner_marker, &self.outer_marker)
            .replace(&self.inner_marker.to_lowercase(), &self.outer_marker);
        let file_name = format!("{renamed}{}.dxf", self.derived_suffix);
        match inner_path.parent() {
            Some(parent) => parent.join(file_name),
            None => PathBuf::from(file_name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn naming() -> NamingConvention {
        NamingConvention::new(&NamingConfig::default()).unwrap()
    }

    #[test]
    fn assembly_id_is_normalized() {
        let naming = naming();
        assert_eq!(naming.assembly_id("Основание КОРП12.dxf").unwrap(), "корп12");
        assert_eq!(
            naming.assembly_id("Внешний радиус корп3.dxf").unwrap(),
            "корп3"
        );
        assert_eq!(naming.assembly_id("Основание Г5.17.dxf").unwrap(), "корп17");
        assert_eq!(naming.assembly_id("Основание г5.18.dxf").unwrap(), "корп18");
    }

    #[test]
    fn missing_assembly_id_is_unparsable() {
        let err = naming().assembly_id("Основание.dxf").unwrap_err();
        assert!(matches!(err, MatchError::UnparsableFilename { .. }));
    }

    #[test]
    fn side_markers_are_case_insensitive() {
        let naming = naming();
        assert_eq!(naming.side("Внешний корп1.dxf").unwrap(), Side::Outer);
        assert_eq!(naming.side("деталь внешний корп1.dxf").unwrap(), Side::Outer);
        assert_eq!(naming.side("ВНУТРЕННИЙ корп1.dxf").unwrap(), Side::Inner);
        assert!(naming.side("корп1.dxf").is_err());
    }

    #[test]
    fn work_files_exclude_processed_outputs() {
        let naming = naming();
        assert!(naming.is_work_file(Path::new("Внешний корп1.dxf")));
        assert!(naming.is_work_file(Path::new("внутренний корп1.DXF")));
        assert!(!naming.is_work_file(Path::new("Внешний корп1_stretch.dxf")));
        assert!(!naming.is_work_file(Path::new("Внутренний корп1_shrink.dxf")));
        assert!(!naming.is_work_file(Path::new("Основание корп1.dxf")));
        assert!(!naming.is_work_file(Path::new("Внешний корп1.dwg")));
        assert!(!naming.is_work_file(Path::new("Внешний корп2_from_inner.dxf")));
    }

    #[test]
    fn configured_output_suffix_is_excluded() {
        let naming = naming();
        assert!(naming.is_work_file(Path::new("Внешний корп1_fit.dxf")));

        let naming = naming.with_processed_suffix("_fit");
        assert!(!naming.is_work_file(Path::new("Внешний корп1_fit.dxf")));
        assert!(!naming.is_work_file(Path::new("Внешний корп1_stretch.dxf")));
        assert!(naming.is_work_file(Path::new("Внешний корп1.dxf")));
    }

    #[test]
    fn reference_files_need_marker_prefix() {
        let naming = naming();
        assert!(naming.is_reference_file(Path::new("Основание корп1.DXF")));
        assert!(!naming.is_reference_file(Path::new("Копия Основание корп1.dxf")));
    }

    #[test]
    fn derived_name_swaps_inner_marker() {
        let naming = naming();
        assert_eq!(
            naming.derived_outer_path(Path::new("/parts/Внутренний корп2.dxf")),
            PathBuf::from("/parts/Внешний корп2_from_inner.dxf")
        );
        assert_eq!(
            naming.derived_outer_path(Path::new("деталь внутренний корп2.dxf")),
            PathBuf::from("деталь Внешний корп2_from_inner.dxf")
        );
    }

    #[test]
    fn side_parses_from_cli_text() {
        assert_eq!("OUTER".parse::<Side>().unwrap(), Side::Outer);
        assert_eq!(Side::Inner.other(), Side::Outer);
        assert!("left".parse::<Side>().is_err());
    }
}
