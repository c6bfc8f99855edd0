use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;
use unfold_core::document::Drawing;
use unfold_core::geometry::Vector2;

use crate::SHIFT_EPSILON;
use crate::mapping::AxisMapping;

/// 拉伸后保持原坐标不变的参考点。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Anchor {
    #[default]
    Start,
    Center,
    End,
}

impl Anchor {
    /// 参考点在旧坐标系中的位置。
    pub fn value_in(self, range: (f64, f64)) -> f64 {
        match self {
            Anchor::Start => range.0,
            Anchor::Center => (range.0 + range.1) / 2.0,
            Anchor::End => range.1,
        }
    }
}

impl fmt::Display for Anchor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Anchor::Start => "start",
            Anchor::Center => "center",
            Anchor::End => "end",
        })
    }
}

#[derive(Debug, Error)]
#[error("unknown anchor \"{0}\" (expected start, center or end)")]
pub struct ParseAnchorError(String);

impl FromStr for Anchor {
    type Err = ParseAnchorError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "start" | "min" | "left" | "bottom" => Ok(Anchor::Start),
            "center" | "middle" => Ok(Anchor::Center),
            "end" | "max" | "right" | "top" => Ok(Anchor::End),
            _ => Err(ParseAnchorError(value.to_string())),
        }
    }
}

/// 映射默认以轴最小值为基准；此处再整体平移，使参考点回到原坐标。
/// 返回实际平移量，不足 [`SHIFT_EPSILON`] 时不平移并返回 0。
pub fn apply_anchor_shift(
    drawing: &mut Drawing,
    mapping: &AxisMapping,
    range: (f64, f64),
    anchor: Anchor,
) -> f64 {
    let anchor_value = anchor.value_in(range);
    let shift = anchor_value - mapping.map(anchor_value);
    if shift.abs() < SHIFT_EPSILON || !shift.is_finite() {
        return 0.0;
    }

    let offset = Vector2::along(mapping.axis(), shift);
    for (_, entity) in drawing.entities_mut() {
        entity.translate(offset);
    }
    debug!(axis = %mapping.axis(), %anchor, shift, "已按参考点平移");
    shift
}

#[cfg(test)]
mod tests {
    use super::*;
    use unfold_core::document::Entity;
    use unfold_core::geometry::{Axis, Point2};

    use crate::mapping::build_mapping;
    use crate::transform::apply_mapping;
    use crate::zones::segment_zones;

    fn stretch_with(anchor: Anchor) -> Drawing {
        let mut drawing = Drawing::new();
        drawing.add_line(Point2::new(10.0, 0.0), Point2::new(110.0, 0.0), "0");
        drawing.add_circle(Point2::new(60.0, 10.0), 5.0, "HOLE");
        let range = (10.0, 110.0);
        let zones = segment_zones(&drawing, Axis::X, range);
        let mapping = build_mapping(&zones, Axis::X, 150.0).unwrap();
        apply_mapping(&mut drawing, &mapping);
        apply_anchor_shift(&mut drawing, &mapping, range, anchor);
        drawing
    }

    #[test]
    fn start_anchor_keeps_minimum() {
        let bounds = stretch_with(Anchor::Start).bounds().unwrap();
        assert!((bounds.min().x() - 10.0).abs() < 1e-6);
        assert!((bounds.max().x() - 160.0).abs() < 1e-6);
    }

    #[test]
    fn center_anchor_keeps_midpoint() {
        let bounds = stretch_with(Anchor::Center).bounds().unwrap();
        assert!((bounds.center().x() - 60.0).abs() < 1e-6);
        assert!((bounds.size(Axis::X) - 150.0).abs() < 1e-6);
    }

    #[test]
    fn end_anchor_keeps_maximum() {
        let bounds = stretch_with(Anchor::End).bounds().unwrap();
        assert!((bounds.max().x() - 110.0).abs() < 1e-6);
        assert!((bounds.min().x() + 40.0).abs() < 1e-6);
    }

    #[test]
    fn center_anchor_keeps_material_midpoint_on_asymmetric_layout() {
        // 刚性孔偏在一侧，新包围盒的中心不再等于旧中点
        let mut drawing = Drawing::new();
        drawing.add_line(Point2::new(0.0, 0.0), Point2::new(100.0, 0.0), "0");
        drawing.add_circle(Point2::new(15.0, 10.0), 5.0, "HOLE");
        let marker = drawing.add_point(Point2::new(50.0, 5.0), "MARK");
        let range = (0.0, 100.0);
        let zones = segment_zones(&drawing, Axis::X, range);
        let mapping = build_mapping(&zones, Axis::X, 190.0).unwrap();
        apply_mapping(&mut drawing, &mapping);
        let shift = apply_anchor_shift(&mut drawing, &mapping, range, Anchor::Center);

        assert!((mapping.map(50.0) + shift - 50.0).abs() < 1e-9);
        let bounds = drawing.bounds().unwrap();
        assert!((bounds.size(Axis::X) - 190.0).abs() < 1e-6);
        assert!((bounds.center().x() - 50.0).abs() > 1.0);
        match drawing.entity(marker) {
            Some(Entity::Point(point)) => assert!((point.location.x() - 50.0).abs() < 1e-9),
            other => panic!("marker missing: {other:?}"),
        }
    }

    #[test]
    fn anchor_names_parse_case_insensitively() {
        assert_eq!("CENTER".parse::<Anchor>().unwrap(), Anchor::Center);
        assert_eq!("top".parse::<Anchor>().unwrap(), Anchor::End);
        assert!("sideways".parse::<Anchor>().is_err());
        assert_eq!(Anchor::End.to_string(), "end");
    }
}
