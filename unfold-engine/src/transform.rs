use serde::Serialize;
use thiserror::Error;
use tracing::warn;
use unfold_core::document::{Drawing, Entity, EntityId};
use unfold_core::geometry::{Axis, Vector2};

use crate::mapping::AxisMapping;

/// 单次映射的实体级结果。
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TransformReport {
    /// 按类型规则逐点重映射的实体。
    pub transformed: Vec<EntityId>,
    /// 未建模实体，按首段偏移整体平移。
    pub translated: Vec<EntityId>,
    /// `translated` 中跨越多个区段、整体平移只是近似的实体。
    pub approximated: Vec<EntityId>,
    /// 保持原样的实体。
    pub skipped: Vec<SkippedEntity>,
}

impl TransformReport {
    pub fn touched(&self) -> usize {
        self.transformed.len() + self.translated.len()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedEntity {
    pub id: EntityId,
    pub kind: String,
    pub reason: String,
}

#[derive(Debug, Error)]
enum EntityTransformError {
    #[error("non-finite {axis} coordinate {value}")]
    NonFinite { axis: Axis, value: f64 },
}

enum Applied {
    Remapped,
    Translated { approximated: bool },
}

/// 沿映射所在轴变换整张图纸。
///
/// 每个实体在副本上变换，成功后才写回；失败的实体保持原样并计入报告。
pub fn apply_mapping(drawing: &mut Drawing, mapping: &AxisMapping) -> TransformReport {
    let mut report = TransformReport::default();
    for (id, entity) in drawing.entities_mut() {
        let mut candidate = entity.clone();
        match transform_entity(&mut candidate, mapping) {
            Ok(Applied::Remapped) => {
                *entity = candidate;
                report.transformed.push(id);
            }
            Ok(Applied::Translated { approximated }) => {
                *entity = candidate;
                report.translated.push(id);
                if approximated {
                    warn!(
                        entity = id.get(),
                        kind = entity.kind_name(),
                        axis = %mapping.axis(),
                        "未建模实体跨越多个区间，整体平移仅为近似"
                    );
                    report.approximated.push(id);
                }
            }
            Err(err) => {
                warn!(
                    entity = id.get(),
                    kind = entity.kind_name(),
                    error = %err,
                    "实体变换失败，保持原样"
                );
                report.skipped.push(SkippedEntity {
                    id,
                    kind: entity.kind_name().to_string(),
                    reason: err.to_string(),
                });
            }
        }
    }
    report
}

fn transform_entity(
    entity: &mut Entity,
    mapping: &AxisMapping,
) -> Result<Applied, EntityTransformError> {
    let axis = mapping.axis();
    match entity {
        // 线段端点、多段线顶点（bulge 不变）、样条控制点与拟合点（节点向量不变）、
        // 圆/圆弧/椭圆的圆心（半径与角度不变）、点的位置
        Entity::Line(_)
        | Entity::Polyline(_)
        | Entity::Spline(_)
        | Entity::Circle(_)
        | Entity::Arc(_)
        | Entity::Ellipse(_)
        | Entity::Point(_) => {
            for position in entity.positions_mut() {
                let mapped = checked(axis, mapping.map(checked(axis, position.coord(axis))?))?;
                position.set_coord(axis, mapped);
            }
            Ok(Applied::Remapped)
        }
        Entity::Other(other) => {
            let mut zones_touched = Vec::new();
            for point in &other.points {
                let value = checked(axis, point.coord(axis))?;
                if let Some(index) = mapping.segment_index(value) {
                    if !zones_touched.contains(&index) {
                        zones_touched.push(index);
                    }
                }
            }
            let offset = Vector2::along(axis, checked(axis, mapping.leading_offset())?);
            for point in other.points.iter_mut() {
                *point = point.translate(offset);
            }
            Ok(Applied::Translated {
                approximated: zones_touched.len() > 1,
            })
        }
    }
}

fn checked(axis: Axis, value: f64) -> Result<f64, EntityTransformError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(EntityTransformError::NonFinite { axis, value })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use unfold_core::document::{OpaqueEntity, PolylineVertex};
    use unfold_core::geometry::Point2;

    use crate::mapping::build_mapping;
    use crate::zones::segment_zones;

    fn stretched(drawing: &mut Drawing, target: f64) -> TransformReport {
        let bounds = drawing.bounds().unwrap();
        let range = bounds.axis_range(Axis::X);
        let zones = segment_zones(drawing, Axis::X, range);
        let mapping = build_mapping(&zones, Axis::X, target).unwrap();
        apply_mapping(drawing, &mapping)
    }

    #[test]
    fn circle_moves_rigidly_and_line_stretches() {
        let mut drawing = Drawing::new();
        let line = drawing.add_line(Point2::new(0.0, 0.0), Point2::new(100.0, 0.0), "0");
        let hole = drawing.add_circle(Point2::new(50.0, 20.0), 10.0, "HOLE");

        let report = stretched(&mut drawing, 180.0);
        assert_eq!(report.transformed, vec![line, hole]);

        match drawing.entity(hole) {
            Some(Entity::Circle(circle)) => {
                assert_eq!(circle.radius, 10.0);
                assert!((circle.center.x() - 90.0).abs() < 1e-9);
                assert_eq!(circle.center.y(), 20.0);
            }
            other => panic!("unexpected entity: {other:?}"),
        }
        match drawing.entity(line) {
            Some(Entity::Line(line)) => assert!((line.end.x() - 180.0).abs() < 1e-9),
            other => panic!("unexpected entity: {other:?}"),
        }
    }

    #[test]
    fn polyline_bulge_is_left_untouched() {
        let mut drawing = Drawing::new();
        drawing.add_line(Point2::new(0.0, 0.0), Point2::new(100.0, 0.0), "0");
        let bend = drawing.add_polyline(
            [
                PolylineVertex::with_bulge(Point2::new(40.0, 5.0), 0.25),
                PolylineVertex::new(Point2::new(60.0, 5.0)),
            ],
            false,
            "BEND",
        );
        stretched(&mut drawing, 140.0);
        let Some(Entity::Polyline(polyline)) = drawing.entity(bend) else {
            panic!("polyline expected");
        };
        assert_eq!(polyline.vertices[0].bulge, 0.25);
        let chord = polyline.vertices[1].position.x() - polyline.vertices[0].position.x();
        assert!((chord - 20.0).abs() < 1e-9);
    }

    #[test]
    fn opaque_entity_spanning_zones_is_flagged() {
        let mut drawing = Drawing::new();
        drawing.add_line(Point2::new(0.0, 0.0), Point2::new(100.0, 0.0), "0");
        drawing.add_circle(Point2::new(50.0, 20.0), 10.0, "HOLE");
        let dimension = drawing.add_entity(Entity::Other(OpaqueEntity {
            kind: "DIMENSION".to_string(),
            layer: "DIM".to_string(),
            points: vec![Point2::new(10.0, 40.0), Point2::new(90.0, 40.0)],
        }));
        let label = drawing.add_entity(Entity::Other(OpaqueEntity {
            kind: "TEXT".to_string(),
            layer: "TXT".to_string(),
            points: vec![Point2::new(5.0, 5.0)],
        }));

        let report = stretched(&mut drawing, 150.0);
        assert_eq!(report.translated, vec![dimension, label]);
        assert_eq!(report.approximated, vec![dimension]);
        // 首段偏移为零，未建模实体位置不变
        match drawing.entity(label) {
            Some(Entity::Other(other)) => assert_eq!(other.points[0], Point2::new(5.0, 5.0)),
            other => panic!("unexpected entity: {other:?}"),
        }
    }

    #[test]
    fn non_finite_entity_is_skipped_without_aborting() {
        let mut drawing = Drawing::new();
        drawing.add_line(Point2::new(0.0, 0.0), Point2::new(100.0, 0.0), "0");
        let broken = drawing.add_entity(Entity::Other(OpaqueEntity {
            kind: "MTEXT".to_string(),
            layer: "0".to_string(),
            points: vec![Point2::new(f64::NAN, 0.0)],
        }));
        let point = drawing.add_point(Point2::new(50.0, 0.0), "0");

        let range = (0.0, 100.0);
        let zones = segment_zones(&drawing, Axis::X, range);
        let mapping = build_mapping(&zones, Axis::X, 200.0).unwrap();
        let report = apply_mapping(&mut drawing, &mapping);

        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].id, broken);
        assert_eq!(report.skipped[0].kind, "MTEXT");
        assert_eq!(report.touched(), 2);
        match drawing.entity(point) {
            Some(Entity::Point(p)) => assert!((p.location.x() - 100.0).abs() < 1e-9),
            other => panic!("unexpected entity: {other:?}"),
        }
    }
}
