use serde::Serialize;
use tracing::debug;
use unfold_core::geometry::Axis;

use crate::errors::EngineError;
use crate::zones::{Zone, ZoneKind, stretch_total};

/// 区间成员判断与比例分配使用的容差。
pub const MAP_EPSILON: f64 = 1e-9;

/// 区间与其在新坐标系中的位置。
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MappingSegment {
    pub old_start: f64,
    pub old_end: f64,
    pub new_start: f64,
    pub new_end: f64,
    pub kind: ZoneKind,
}

impl MappingSegment {
    #[inline]
    pub fn old_length(&self) -> f64 {
        (self.old_end - self.old_start).max(0.0)
    }

    #[inline]
    pub fn new_length(&self) -> f64 {
        self.new_end - self.new_start
    }

    #[inline]
    pub fn offset(&self) -> f64 {
        self.new_start - self.old_start
    }
}

/// 单轴的分段线性映射，旧坐标 → 新坐标。
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AxisMapping {
    axis: Axis,
    segments: Vec<MappingSegment>,
}

impl AxisMapping {
    #[inline]
    pub fn axis(&self) -> Axis {
        self.axis
    }

    #[inline]
    pub fn segments(&self) -> &[MappingSegment] {
        &self.segments
    }

    /// 新坐标系中的总长度。
    pub fn new_length(&self) -> f64 {
        match (self.segments.first(), self.segments.last()) {
            (Some(first), Some(last)) => last.new_end - first.new_start,
            _ => 0.0,
        }
    }

    /// 首段的平移量，用于未建模实体的整体平移。
    pub fn leading_offset(&self) -> f64 {
        self.segments.first().map_or(0.0, MappingSegment::offset)
    }

    /// 求值：先找包含该值的区段（含端点），退化区段取常量偏移，
    /// 其余按比例插值；落在所有区段之外时按末段偏移外推。
    pub fn map(&self, value: f64) -> f64 {
        for segment in &self.segments {
            if value < segment.old_start - MAP_EPSILON {
                continue;
            }
            if value <= segment.old_end + MAP_EPSILON {
                let old_length = segment.old_length();
                if old_length < MAP_EPSILON {
                    return value + segment.offset();
                }
                let ratio = (value - segment.old_start) / old_length;
                return segment.new_start + ratio * segment.new_length();
            }
        }
        match self.segments.last() {
            Some(last) => value + (last.new_end - last.old_end),
            None => value,
        }
    }

    /// 值所在的区段下标，超出范围时为 `None`。
    pub fn segment_index(&self, value: f64) -> Option<usize> {
        self.segments.iter().position(|segment| {
            value >= segment.old_start - MAP_EPSILON && value <= segment.old_end + MAP_EPSILON
        })
    }
}

/// 根据目标长度生成映射：长度差只分配给拉伸区，按各自长度占比分摊；
/// 刚性区保持原长，仅随前面区段的伸缩而平移。
pub fn build_mapping(
    zones: &[Zone],
    axis: Axis,
    target_length: f64,
) -> Result<AxisMapping, EngineError> {
    if !target_length.is_finite() || target_length <= 0.0 {
        return Err(EngineError::InvalidTarget {
            target: target_length,
        });
    }
    let (Some(first), Some(last)) = (zones.first(), zones.last()) else {
        return Err(EngineError::DegenerateAxis {
            axis,
            target: target_length,
        });
    };

    let axis_min = first.start;
    let current_length = last.end - axis_min;
    let delta = target_length - current_length;
    let elastic = stretch_total(zones);

    if elastic <= 0.0 && delta.abs() > MAP_EPSILON {
        return Err(EngineError::NoElasticRegion { axis, delta });
    }
    if delta < -elastic - MAP_EPSILON {
        return Err(EngineError::ShrinkExceedsElastic {
            axis,
            delta,
            elastic,
        });
    }

    let mut segments = Vec::with_capacity(zones.len());
    let mut cursor = axis_min;
    for zone in zones {
        let length = zone.length();
        let new_length = if zone.is_stretch() && elastic > 0.0 {
            length + delta * (length / elastic)
        } else {
            length
        };
        segments.push(MappingSegment {
            old_start: zone.start,
            old_end: zone.end,
            new_start: cursor,
            new_end: cursor + new_length,
            kind: zone.kind,
        });
        cursor += new_length;
    }

    debug!(
        axis = %axis,
        delta,
        elastic,
        segments = segments.len(),
        "已生成映射"
    );
    Ok(AxisMapping { axis, segments })
}
