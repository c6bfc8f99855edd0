use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info};
use unfold_core::document::Drawing;
use unfold_core::geometry::{Axis, Bounds2D};
use unfold_io::{DocumentLoader, DocumentSaver, DxfDocument, DxfFacade};

use crate::SHIFT_EPSILON;
use crate::anchor::{Anchor, apply_anchor_shift};
use crate::errors::EngineError;
use crate::mapping::build_mapping;
use crate::transform::{TransformReport, apply_mapping};
use crate::zones::{Zone, segment_zones};

pub const DEFAULT_OUTPUT_SUFFIX: &str = "_stretch";

/// 读入图纸后的尺寸摘要。
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DrawingInfo {
    pub path: PathBuf,
    pub entity_count: usize,
    pub length_x: f64,
    pub width_y: f64,
    pub min_x: f64,
    pub max_x: f64,
    pub min_y: f64,
    pub max_y: f64,
}

impl DrawingInfo {
    fn new(path: &Path, drawing: &Drawing, bounds: &Bounds2D) -> Self {
        Self {
            path: path.to_path_buf(),
            entity_count: drawing.len(),
            length_x: bounds.size(Axis::X),
            width_y: bounds.size(Axis::Y),
            min_x: bounds.min().x(),
            max_x: bounds.max().x(),
            min_y: bounds.min().y(),
            max_y: bounds.max().y(),
        }
    }

    pub fn size(&self, axis: Axis) -> f64 {
        match axis {
            Axis::X => self.length_x,
            Axis::Y => self.width_y,
        }
    }
}

/// 单轴拉伸的结果。
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AxisOutcome {
    pub axis: Axis,
    pub anchor: Anchor,
    pub original: f64,
    pub target: f64,
    pub result: f64,
    pub scale: f64,
    pub shift: f64,
    pub zones: Vec<Zone>,
    pub report: TransformReport,
}

/// 一次拉伸操作的产物：新文档、新范围，以及每个实际处理过的轴。
#[derive(Debug, Clone)]
pub struct StretchOutcome {
    pub document: DxfDocument,
    pub bounds: Bounds2D,
    pub axes: Vec<AxisOutcome>,
}

impl StretchOutcome {
    /// 目标与现状一致，没有构建任何映射。
    pub fn is_identity(&self) -> bool {
        self.axes.is_empty()
    }

    pub fn axis(&self, axis: Axis) -> Option<&AxisOutcome> {
        self.axes.iter().find(|outcome| outcome.axis == axis)
    }
}

fn validate_target(target: f64) -> Result<(), EngineError> {
    if target.is_finite() && target > 0.0 {
        Ok(())
    } else {
        Err(EngineError::InvalidTarget { target })
    }
}

fn stretch_with_zones(
    drawing: &mut Drawing,
    axis: Axis,
    range: (f64, f64),
    zones: &[Zone],
    target: f64,
    anchor: Anchor,
) -> Result<AxisOutcome, EngineError> {
    let original = range.1 - range.0;
    let mapping = build_mapping(zones, axis, target)?;
    let report = apply_mapping(drawing, &mapping);
    let shift = apply_anchor_shift(drawing, &mapping, range, anchor);
    let result = drawing
        .bounds()
        .map_or(0.0, |bounds| bounds.size(axis));

    info!(
        axis = %axis,
        original,
        target,
        result,
        transformed = report.transformed.len(),
        skipped = report.skipped.len(),
        "拉伸完成"
    );
    Ok(AxisOutcome {
        axis,
        anchor,
        original,
        target,
        result,
        scale: target / original,
        shift,
        zones: zones.to_vec(),
        report,
    })
}

/// 在给定图纸上沿单轴拉伸到目标尺寸；目标与现状相差不超过 1e-6 时返回 `None`。
pub fn stretch_axis(
    drawing: &mut Drawing,
    axis: Axis,
    target: f64,
    anchor: Anchor,
) -> Result<Option<AxisOutcome>, EngineError> {
    validate_target(target)?;
    let bounds = drawing
        .bounds()
        .ok_or(EngineError::DegenerateAxis { axis, target })?;
    let range = bounds.axis_range(axis);
    let current = range.1 - range.0;
    if (target - current).abs() <= SHIFT_EPSILON {
        return Ok(None);
    }
    if current <= 0.0 {
        return Err(EngineError::DegenerateAxis { axis, target });
    }
    let zones = segment_zones(drawing, axis, range);
    stretch_with_zones(drawing, axis, range, &zones, target, anchor).map(Some)
}

/// 先 X 后 Y：Y 轴的范围与区间在 X 拉伸后的几何上重新计算。
pub fn stretch_both(
    drawing: &mut Drawing,
    target_x: f64,
    target_y: f64,
    anchor_x: Anchor,
    anchor_y: Anchor,
) -> Result<Vec<AxisOutcome>, EngineError> {
    let mut axes = Vec::with_capacity(2);
    axes.extend(stretch_axis(drawing, Axis::X, target_x, anchor_x)?);
    axes.extend(stretch_axis(drawing, Axis::Y, target_y, anchor_y)?);
    Ok(axes)
}

struct LoadedDrawing {
    path: PathBuf,
    document: DxfDocument,
    bounds: Bounds2D,
    zone_cache: HashMap<Axis, Vec<Zone>>,
}

impl LoadedDrawing {
    fn zones(&mut self, axis: Axis) -> &[Zone] {
        let Self {
            document,
            bounds,
            zone_cache,
            ..
        } = self;
        zone_cache.entry(axis).or_insert_with(|| {
            debug!(axis = %axis, "计算区间（未命中缓存）");
            segment_zones(document.drawing(), axis, bounds.axis_range(axis))
        })
    }
}

/// 显式的拉伸上下文：持有读入的原始文档与按轴缓存的区间。
///
/// 每次拉伸都从原始几何的副本开始，多次调用不会累积误差。
pub struct StretchSession {
    facade: DxfFacade,
    output_suffix: String,
    loaded: Option<LoadedDrawing>,
}

impl StretchSession {
    pub fn new() -> Self {
        Self {
            facade: DxfFacade::new(),
            output_suffix: DEFAULT_OUTPUT_SUFFIX.to_string(),
            loaded: None,
        }
    }

    pub fn with_output_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.output_suffix = suffix.into();
        self
    }

    /// 读入图纸并清空区间缓存。
    pub fn load(&mut self, path: &Path) -> Result<DrawingInfo, EngineError> {
        self.loaded = None;
        let document = self
            .facade
            .load(path)
            .map_err(|source| EngineError::GeometryLoad {
                path: path.to_path_buf(),
                source,
            })?;
        let bounds = document
            .drawing()
            .bounds()
            .ok_or_else(|| EngineError::EmptyExtents {
                path: path.to_path_buf(),
            })?;

        let info = DrawingInfo::new(path, document.drawing(), &bounds);
        info!(
            path = %path.display(),
            entities = info.entity_count,
            length_x = info.length_x,
            width_y = info.width_y,
            "图纸已读入"
        );
        self.loaded = Some(LoadedDrawing {
            path: path.to_path_buf(),
            document,
            bounds,
            zone_cache: HashMap::new(),
        });
        Ok(info)
    }

    /// 使用内存中的文档代替文件读入，`path` 用于错误信息和默认输出名。
    pub fn load_document(
        &mut self,
        path: impl Into<PathBuf>,
        document: DxfDocument,
    ) -> Result<DrawingInfo, EngineError> {
        let path = path.into();
        let bounds = document
            .drawing()
            .bounds()
            .ok_or_else(|| EngineError::EmptyExtents { path: path.clone() })?;
        let info = DrawingInfo::new(&path, document.drawing(), &bounds);
        self.loaded = Some(LoadedDrawing {
            path,
            document,
            bounds,
            zone_cache: HashMap::new(),
        });
        Ok(info)
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded.is_some()
    }

    pub fn info(&self) -> Option<DrawingInfo> {
        self.loaded
            .as_ref()
            .map(|loaded| DrawingInfo::new(&loaded.path, loaded.document.drawing(), &loaded.bounds))
    }

    pub fn path(&self) -> Option<&Path> {
        self.loaded.as_ref().map(|loaded| loaded.path.as_path())
    }

    /// 原始（未拉伸）文档。
    pub fn document(&self) -> Option<&DxfDocument> {
        self.loaded.as_ref().map(|loaded| &loaded.document)
    }

    pub fn measure(&self, axis: Axis) -> Result<f64, EngineError> {
        let loaded = self.loaded.as_ref().ok_or(EngineError::NotLoaded)?;
        Ok(loaded.bounds.size(axis))
    }

    pub fn zones(&mut self, axis: Axis) -> Result<&[Zone], EngineError> {
        let loaded = self.loaded.as_mut().ok_or(EngineError::NotLoaded)?;
        Ok(loaded.zones(axis))
    }

    /// 沿单轴拉伸原始几何到目标尺寸。
    pub fn stretch(
        &mut self,
        target: f64,
        axis: Axis,
        anchor: Anchor,
    ) -> Result<StretchOutcome, EngineError> {
        let loaded = self.loaded.as_mut().ok_or(EngineError::NotLoaded)?;
        let path = loaded.path.clone();
        Self::stretch_loaded(loaded, target, axis, anchor).map_err(|err| err.in_file(path))
    }

    fn stretch_loaded(
        loaded: &mut LoadedDrawing,
        target: f64,
        axis: Axis,
        anchor: Anchor,
    ) -> Result<StretchOutcome, EngineError> {
        validate_target(target)?;
        let range = loaded.bounds.axis_range(axis);
        let current = range.1 - range.0;
        if (target - current).abs() <= SHIFT_EPSILON {
            debug!(axis = %axis, current, target, "尺寸已符合目标");
            return Ok(StretchOutcome {
                document: loaded.document.clone(),
                bounds: loaded.bounds,
                axes: Vec::new(),
            });
        }
        if current <= 0.0 {
            return Err(EngineError::DegenerateAxis { axis, target });
        }

        let zones = loaded.zones(axis).to_vec();
        let mut drawing = loaded.document.drawing().clone();
        let outcome = stretch_with_zones(&mut drawing, axis, range, &zones, target, anchor)?;
        Ok(Self::finish(&loaded.document, drawing, loaded.bounds, vec![outcome]))
    }

    /// 双轴拉伸：X 使用缓存的区间，Y 在 X 的结果上重新划分。
    pub fn stretch_both(
        &mut self,
        target_x: f64,
        target_y: f64,
        anchor_x: Anchor,
        anchor_y: Anchor,
    ) -> Result<StretchOutcome, EngineError> {
        let loaded = self.loaded.as_mut().ok_or(EngineError::NotLoaded)?;
        let path = loaded.path.clone();
        Self::stretch_both_loaded(loaded, target_x, target_y, anchor_x, anchor_y)
            .map_err(|err| err.in_file(path))
    }

    fn stretch_both_loaded(
        loaded: &mut LoadedDrawing,
        target_x: f64,
        target_y: f64,
        anchor_x: Anchor,
        anchor_y: Anchor,
    ) -> Result<StretchOutcome, EngineError> {
        validate_target(target_x)?;
        validate_target(target_y)?;

        let mut drawing = loaded.document.drawing().clone();
        let mut axes = Vec::with_capacity(2);

        let range_x = loaded.bounds.axis_range(Axis::X);
        let current_x = range_x.1 - range_x.0;
        if (target_x - current_x).abs() > SHIFT_EPSILON {
            if current_x <= 0.0 {
                return Err(EngineError::DegenerateAxis {
                    axis: Axis::X,
                    target: target_x,
                });
            }
            let zones = loaded.zones(Axis::X).to_vec();
            axes.push(stretch_with_zones(
                &mut drawing,
                Axis::X,
                range_x,
                &zones,
                target_x,
                anchor_x,
            )?);
        }
        axes.extend(stretch_axis(&mut drawing, Axis::Y, target_y, anchor_y)?);

        if axes.is_empty() {
            debug!(target_x, target_y, "两轴尺寸均已符合目标");
        }
        Ok(Self::finish(&loaded.document, drawing, loaded.bounds, axes))
    }

    fn finish(
        source: &DxfDocument,
        drawing: Drawing,
        fallback: Bounds2D,
        axes: Vec<AxisOutcome>,
    ) -> StretchOutcome {
        let bounds = drawing.bounds().unwrap_or(fallback);
        StretchOutcome {
            document: source.with_drawing(drawing),
            bounds,
            axes,
        }
    }

    /// 默认输出路径：与输入同目录，`<stem><suffix>.dxf`。
    pub fn default_output_path(&self) -> Result<PathBuf, EngineError> {
        let loaded = self.loaded.as_ref().ok_or(EngineError::NotLoaded)?;
        Ok(output_path_for(&loaded.path, &self.output_suffix))
    }

    pub fn save(
        &self,
        outcome: &StretchOutcome,
        destination: Option<&Path>,
    ) -> Result<PathBuf, EngineError> {
        let path = match destination {
            Some(path) => path.to_path_buf(),
            None => self.default_output_path()?,
        };
        self.facade
            .save(&outcome.document, &path)
            .map_err(|source| EngineError::Save {
                path: path.clone(),
                source,
            })?;
        info!(path = %path.display(), "结果已保存");
        Ok(path)
    }

    pub fn clear(&mut self) {
        self.loaded = None;
    }
}

impl Default for StretchSession {
    fn default() -> Self {
        Self::new()
    }
}

/// `<stem><suffix>.dxf`，与输入位于同一目录。
pub fn output_path_for(input: &Path, suffix: &str) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();
    input.with_file_name(format!("{stem}{suffix}.dxf"))
}
