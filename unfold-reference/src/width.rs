use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{info, warn};
use unfold_core::geometry::Axis;
use unfold_engine::StretchSession;
use unfold_engine::errors::EngineError;

use crate::batch::BatchOptions;
use crate::errors::MatchError;
use crate::naming::{NamingConvention, Side};
use crate::registry::SkippedFile;
use crate::{file_name_of, list_dxf_files};

/// 宽度比较的浮点余量：恰好等于容差的差值不会被判为超差。
const WIDTH_EPSILON: f64 = 1e-9;

/// 一个装配两侧工作图的宽度（Y 向尺寸）对比。
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WidthCheck {
    pub assembly: String,
    pub outer_file: Option<PathBuf>,
    pub inner_file: Option<PathBuf>,
    pub outer_width: Option<f64>,
    pub inner_width: Option<f64>,
    /// 外侧减内侧，仅在两侧都存在时有值。
    pub difference: Option<f64>,
    pub needs_adjustment: bool,
}

impl WidthCheck {
    pub fn has_both(&self) -> bool {
        self.outer_file.is_some() && self.inner_file.is_some()
    }

    pub fn file(&self, side: Side) -> Option<&Path> {
        match side {
            Side::Outer => self.outer_file.as_deref(),
            Side::Inner => self.inner_file.as_deref(),
        }
    }

    pub fn width(&self, side: Side) -> Option<f64> {
        match side {
            Side::Outer => self.outer_width,
            Side::Inner => self.inner_width,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WidthReport {
    pub folder: PathBuf,
    pub tolerance: f64,
    pub checks: Vec<WidthCheck>,
    pub skipped: Vec<SkippedFile>,
}

impl WidthReport {
    pub fn flagged(&self) -> impl Iterator<Item = &WidthCheck> {
        self.checks.iter().filter(|check| check.needs_adjustment)
    }

    pub fn get(&self, assembly: &str) -> Option<&WidthCheck> {
        self.checks.iter().find(|check| check.assembly == assembly)
    }
}

/// 差值绝对值严格大于容差才需要调整。
pub fn widths_differ(outer: f64, inner: f64, tolerance: f64) -> bool {
    (outer - inner).abs() - tolerance > WIDTH_EPSILON
}

#[derive(Default)]
struct SideFiles {
    outer: Option<(PathBuf, f64)>,
    inner: Option<(PathBuf, f64)>,
}

impl SideFiles {
    fn slot(&mut self, side: Side) -> &mut Option<(PathBuf, f64)> {
        match side {
            Side::Outer => &mut self.outer,
            Side::Inner => &mut self.inner,
        }
    }
}

fn parse_work_name(naming: &NamingConvention, name: &str) -> Result<(Side, String), MatchError> {
    Ok((naming.side(name)?, naming.assembly_id(name)?))
}

/// 按装配分组测量文件夹中工作图的宽度。
pub fn check_widths(
    folder: &Path,
    naming: &NamingConvention,
    tolerance: f64,
) -> Result<WidthReport, MatchError> {
    let mut groups: BTreeMap<String, SideFiles> = BTreeMap::new();
    let mut broken: BTreeSet<String> = BTreeSet::new();
    let mut skipped = Vec::new();
    let mut session = StretchSession::new();

    for path in list_dxf_files(folder)? {
        if !naming.is_work_file(&path) {
            continue;
        }
        let name = file_name_of(&path);
        let (side, assembly) = match parse_work_name(naming, &name) {
            Ok(parsed) => parsed,
            Err(err) => {
                warn!(path = %path.display(), error = %err, "无法识别工作图");
                skipped.push(SkippedFile {
                    path,
                    reason: err.to_string(),
                });
                continue;
            }
        };

        let width = match session.load(&path) {
            Ok(info) => info.width_y,
            Err(err) => {
                warn!(path = %path.display(), assembly = %assembly, error = %err, "宽度测量失败");
                skipped.push(SkippedFile {
                    path,
                    reason: err.to_string(),
                });
                broken.insert(assembly);
                continue;
            }
        };

        let slot = groups.entry(assembly.clone()).or_default().slot(side);
        if let Some((previous, _)) = slot.as_ref() {
            warn!(
                assembly = %assembly,
                %side,
                previous = %previous.display(),
                path = %path.display(),
                "同侧存在多个工作图，使用后者"
            );
        }
        *slot = Some((path, width));
    }

    let checks = groups
        .into_iter()
        .filter(|(assembly, _)| !broken.contains(assembly))
        .map(|(assembly, files)| {
            let outer_width = files.outer.as_ref().map(|(_, width)| *width);
            let inner_width = files.inner.as_ref().map(|(_, width)| *width);
            let (difference, needs_adjustment) = match (outer_width, inner_width) {
                (Some(outer), Some(inner)) => {
                    (Some(outer - inner), widths_differ(outer, inner, tolerance))
                }
                _ => (None, false),
            };
            WidthCheck {
                assembly,
                outer_file: files.outer.map(|(path, _)| path),
                inner_file: files.inner.map(|(path, _)| path),
                outer_width,
                inner_width,
                difference,
                needs_adjustment,
            }
        })
        .collect::<Vec<_>>();

    info!(
        folder = %folder.display(),
        groups = checks.len(),
        flagged = checks.iter().filter(|check| check.needs_adjustment).count(),
        "宽度检查完成"
    );
    Ok(WidthReport {
        folder: folder.to_path_buf(),
        tolerance,
        checks,
        skipped,
    })
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlignedFile {
    pub assembly: String,
    pub source: PathBuf,
    pub output: PathBuf,
    pub from_width: f64,
    pub to_width: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlignmentReport {
    pub reference: Side,
    pub check: WidthReport,
    pub aligned: Vec<AlignedFile>,
    pub failed: Vec<SkippedFile>,
}

fn restretch_width(
    session: &mut StretchSession,
    source: &Path,
    target: f64,
    options: &BatchOptions,
) -> Result<PathBuf, EngineError> {
    session.load(source)?;
    let outcome = session.stretch(target, Axis::Y, options.anchor)?;
    session.save(&outcome, None)
}

/// 对超差的装配，把非基准侧的工作图沿 Y 拉伸到基准侧的宽度。
pub fn align_widths(
    folder: &Path,
    naming: &NamingConvention,
    reference: Side,
    options: &BatchOptions,
) -> Result<AlignmentReport, MatchError> {
    let check = check_widths(folder, naming, options.tolerance)?;
    let mut aligned = Vec::new();
    let mut failed = Vec::new();
    let mut session = StretchSession::new().with_output_suffix(options.output_suffix.as_str());

    for group in check.flagged() {
        let (Some(target), Some(source), Some(from_width)) = (
            group.width(reference),
            group.file(reference.other()),
            group.width(reference.other()),
        ) else {
            continue;
        };

        match restretch_width(&mut session, source, target, options) {
            Ok(output) => {
                info!(
                    assembly = %group.assembly,
                    path = %source.display(),
                    output = %output.display(),
                    from = from_width,
                    to = target,
                    "宽度已对齐"
                );
                aligned.push(AlignedFile {
                    assembly: group.assembly.clone(),
                    source: source.to_path_buf(),
                    output,
                    from_width,
                    to_width: target,
                });
            }
            Err(err) => {
                warn!(assembly = %group.assembly, path = %source.display(), error = %err, "宽度对齐失败");
                failed.push(SkippedFile {
                    path: source.to_path_buf(),
                    reason: err.to_string(),
                });
            }
        }
    }

    Ok(AlignmentReport {
        reference,
        check,
        aligned,
        failed,
    })
}
