use serde::Serialize;
use tracing::debug;
use unfold_core::document::Drawing;
use unfold_core::geometry::Axis;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ZoneKind {
    /// 含刚性实体的区间，只平移不缩放。
    Fixed,
    /// 可吸收长度变化的区间。
    Stretch,
}

/// 单轴上的一个区间 `[start, end]`。
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Zone {
    pub start: f64,
    pub end: f64,
    pub kind: ZoneKind,
}

impl Zone {
    #[inline]
    pub fn new(start: f64, end: f64, kind: ZoneKind) -> Self {
        Self { start, end, kind }
    }

    #[inline]
    pub fn length(&self) -> f64 {
        (self.end - self.start).max(0.0)
    }

    #[inline]
    pub fn is_stretch(&self) -> bool {
        self.kind == ZoneKind::Stretch
    }
}

/// 把 `[axis_min, axis_max]` 划分为首尾相接的刚性区/拉伸区序列。
///
/// 刚性实体的区间先裁剪到轴范围内，按起点排序后合并相交或相接的部分，
/// 其间的空隙即为拉伸区。没有刚性实体时整段为一个拉伸区。
pub fn segment_zones(drawing: &Drawing, axis: Axis, range: (f64, f64)) -> Vec<Zone> {
    let (axis_min, axis_max) = (range.0, range.1.max(range.0));

    let mut intervals: Vec<(f64, f64)> = drawing
        .entities()
        .filter(|(_, entity)| entity.is_fixed())
        .filter_map(|(_, entity)| entity.axis_interval(axis))
        .map(|(start, end)| (start.max(axis_min), end.min(axis_max)))
        .filter(|(start, end)| end > start)
        .collect();
    intervals.sort_by(|a, b| a.0.total_cmp(&b.0));

    let mut merged: Vec<(f64, f64)> = Vec::with_capacity(intervals.len());
    for (start, end) in intervals {
        match merged.last_mut() {
            Some(last) if start <= last.1 => last.1 = last.1.max(end),
            _ => merged.push((start, end)),
        }
    }

    let mut zones = Vec::with_capacity(merged.len() * 2 + 1);
    let mut cursor = axis_min;
    for (start, end) in &merged {
        if *start > cursor {
            zones.push(Zone::new(cursor, *start, ZoneKind::Stretch));
        }
        zones.push(Zone::new(*start, *end, ZoneKind::Fixed));
        cursor = cursor.max(*end);
    }
    if cursor < axis_max {
        zones.push(Zone::new(cursor, axis_max, ZoneKind::Stretch));
    }
    if zones.is_empty() {
        zones.push(Zone::new(axis_min, axis_max, ZoneKind::Stretch));
    }

    debug!(
        axis = %axis,
        fixed = merged.len(),
        zones = zones.len(),
        "已划分区间"
    );
    zones
}

/// 拉伸区总长度。
pub fn stretch_total(zones: &[Zone]) -> f64 {
    zones
        .iter()
        .filter(|zone| zone.is_stretch())
        .map(Zone::length)
        .sum()
}
