use std::fmt::Write as _;

use tracing::warn;
use unfold_core::document::{Drawing, Entity};
use unfold_core::geometry::Point2;

use crate::reader::Pair;
use crate::{EntityRecord, Layout};

pub(crate) fn write_document(drawing: &Drawing, layout: Option<&Layout>) -> String {
    let mut out = String::new();
    let eol = layout.map_or("\n", |layout| layout.line_ending);
    match layout {
        Some(layout) => write_pairs(&mut out, &layout.head, eol),
        None => write_pairs(
            &mut out,
            &[(0, "SECTION".to_string()), (2, "ENTITIES".to_string())],
            eol,
        ),
    }

    for (id, entity) in drawing.entities() {
        let record = layout.and_then(|layout| layout.records.get(&id));
        match record {
            Some(record) if record.slots.len() == entity.positions().len() => {
                write_pairs(&mut out, &patch_record(record, entity), eol);
            }
            _ => write_pairs(&mut out, &fresh_record(entity), eol),
        }
    }

    match layout {
        Some(layout) => write_pairs(&mut out, &layout.tail, eol),
        None => write_pairs(
            &mut out,
            &[(0, "ENDSEC".to_string()), (0, "EOF".to_string())],
            eol,
        ),
    }
    out
}

fn write_pairs(out: &mut String, pairs: &[Pair], eol: &str) {
    for (code, value) in pairs {
        let _ = write!(out, "{code:>3}{eol}{value}{eol}");
    }
}

/// 只改写坐标发生变化的值，未变化的保持原文。
fn patch_record(record: &EntityRecord, entity: &Entity) -> Vec<Pair> {
    let mut pairs = record.pairs.clone();
    for (slot, position) in record.slots.iter().zip(entity.positions()) {
        patch_value(&mut pairs[slot.x].1, position.x());
        patch_value(&mut pairs[slot.y].1, position.y());
    }
    pairs
}

fn patch_value(raw: &mut String, value: f64) {
    let unchanged = raw
        .trim()
        .parse::<f64>()
        .is_ok_and(|original| original.to_bits() == value.to_bits());
    if !unchanged {
        *raw = format_number(value);
    }
}

fn format_number(value: f64) -> String {
    format!("{value}")
}

fn push_point(pairs: &mut Vec<Pair>, x_code: i32, point: Point2) {
    pairs.push((x_code, format_number(point.x())));
    pairs.push((x_code + 10, format_number(point.y())));
    pairs.push((x_code + 20, "0".to_string()));
}

/// 没有原始组码的实体（新建的几何）按最小字段写出。
fn fresh_record(entity: &Entity) -> Vec<Pair> {
    let mut pairs = Vec::new();
    let kind = match entity {
        Entity::Polyline(_) => "LWPOLYLINE",
        other => other.kind_name(),
    };
    pairs.push((0, kind.to_string()));
    pairs.push((8, entity.layer_name().to_string()));
    match entity {
        Entity::Line(line) => {
            push_point(&mut pairs, 10, line.start);
            push_point(&mut pairs, 11, line.end);
        }
        Entity::Polyline(polyline) => {
            pairs.push((90, polyline.vertices.len().to_string()));
            pairs.push((70, if polyline.is_closed { "1" } else { "0" }.to_string()));
            for vertex in &polyline.vertices {
                pairs.push((10, format_number(vertex.position.x())));
                pairs.push((20, format_number(vertex.position.y())));
                if vertex.bulge != 0.0 {
                    pairs.push((42, format_number(vertex.bulge)));
                }
            }
        }
        Entity::Spline(spline) => {
            pairs.push((70, "8".to_string()));
            pairs.push((71, spline.degree.to_string()));
            pairs.push((72, spline.knot_values.len().to_string()));
            pairs.push((73, spline.control_points.len().to_string()));
            pairs.push((74, spline.fit_points.len().to_string()));
            for knot in &spline.knot_values {
                pairs.push((40, format_number(*knot)));
            }
            for point in &spline.control_points {
                push_point(&mut pairs, 10, *point);
            }
            for point in &spline.fit_points {
                push_point(&mut pairs, 11, *point);
            }
        }
        Entity::Circle(circle) => {
            push_point(&mut pairs, 10, circle.center);
            pairs.push((40, format_number(circle.radius)));
        }
        Entity::Arc(arc) => {
            push_point(&mut pairs, 10, arc.center);
            pairs.push((40, format_number(arc.radius)));
            pairs.push((50, format_number(arc.start_angle.to_degrees())));
            pairs.push((51, format_number(arc.end_angle.to_degrees())));
        }
        Entity::Ellipse(ellipse) => {
            push_point(&mut pairs, 10, ellipse.center);
            pairs.push((11, format_number(ellipse.major_axis.x())));
            pairs.push((21, format_number(ellipse.major_axis.y())));
            pairs.push((31, "0".to_string()));
            pairs.push((40, format_number(ellipse.ratio)));
            pairs.push((41, format_number(ellipse.start_parameter)));
            pairs.push((42, format_number(ellipse.end_parameter)));
        }
        Entity::Point(point) => {
            push_point(&mut pairs, 10, point.location);
        }
        Entity::Other(other) => {
            warn!(kind = %other.kind, "未建模实体缺少原始组码，无法写出");
            return Vec::new();
        }
    }
    pairs
}
