use tracing::warn;
use unfold_core::document::{
    Arc, Circle, Ellipse, Entity, Line, OpaqueEntity, Point, Polyline, PolylineVertex, Spline,
};
use unfold_core::geometry::{Point2, Vector2};

use crate::DxfError;
use crate::reader::{Pair, parse_f64, parse_i16, parse_i32};

/// 某个定位点的 X/Y 值在实体组码序列中的下标，写回时按此改写。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct PointSlot {
    pub(crate) x: usize,
    pub(crate) y: usize,
}

/// 文件被拆成三段：ENTITIES 之前、各实体、ENDSEC 及之后。
pub(crate) struct SplitFile {
    pub(crate) head: Vec<Pair>,
    pub(crate) records: Vec<Vec<Pair>>,
    pub(crate) tail: Vec<Pair>,
}

pub(crate) fn split_entities_section(pairs: Vec<Pair>) -> Result<SplitFile, DxfError> {
    let section_start = pairs
        .windows(2)
        .position(|window| {
            window[0].0 == 0
                && window[0].1.trim() == "SECTION"
                && window[1].0 == 2
                && window[1].1.trim() == "ENTITIES"
        })
        .ok_or_else(|| DxfError::invalid("缺少 ENTITIES 段"))?;

    let body_start = section_start + 2;
    let mut records = Vec::new();
    let mut cursor = body_start;
    loop {
        let Some((code, value)) = pairs.get(cursor) else {
            return Err(DxfError::invalid("ENTITIES 段提前结束"));
        };
        if *code != 0 {
            return Err(DxfError::invalid(format!(
                "ENTITIES 段遇到组码 {code}（期望 0 表示实体起始）"
            )));
        }
        if value.trim() == "ENDSEC" {
            break;
        }

        let start = cursor;
        let is_sequence = value.trim() == "POLYLINE";
        cursor = next_entity_start(&pairs, cursor);
        if is_sequence {
            // 经典 POLYLINE：VERTEX 直到 SEQEND 都归入同一条记录
            while let Some((0, kind)) = pairs.get(cursor) {
                match kind.trim() {
                    "VERTEX" => cursor = next_entity_start(&pairs, cursor),
                    "SEQEND" => {
                        cursor = next_entity_start(&pairs, cursor);
                        break;
                    }
                    _ => break,
                }
            }
        }
        records.push(pairs[start..cursor].to_vec());
    }

    let tail = pairs[cursor..].to_vec();
    let mut head = pairs;
    head.truncate(body_start);
    Ok(SplitFile {
        head,
        records,
        tail,
    })
}

fn next_entity_start(pairs: &[Pair], from: usize) -> usize {
    let mut index = from + 1;
    while index < pairs.len() && pairs[index].0 != 0 {
        index += 1;
    }
    index
}

/// 将一条实体记录解析为模型实体；已建模类型的组码不完整时退化为不透明实体。
pub(crate) fn parse_record(pairs: &[Pair]) -> (Entity, Vec<PointSlot>) {
    let kind = pairs
        .first()
        .map(|(_, value)| value.trim().to_string())
        .unwrap_or_default();
    let parsed = match kind.as_str() {
        "LINE" => parse_line(pairs),
        "POINT" => parse_point(pairs),
        "CIRCLE" => parse_circle(pairs),
        "ARC" => parse_arc(pairs),
        "ELLIPSE" => parse_ellipse(pairs),
        "LWPOLYLINE" => parse_lwpolyline(pairs),
        "POLYLINE" => parse_polyline_sequence(pairs),
        "SPLINE" => parse_spline(pairs),
        _ => return parse_opaque(&kind, pairs),
    };
    match parsed {
        Ok(result) => result,
        Err(err) => {
            warn!(kind = %kind, error = ?err, "实体组码不完整，按未建模实体处理");
            parse_opaque(&kind, pairs)
        }
    }
}

/// 成对收集 X/Y 坐标并记录各自下标。
#[derive(Default)]
struct PendingPoint {
    x: Option<(usize, f64)>,
    y: Option<(usize, f64)>,
}

impl PendingPoint {
    fn set_x(&mut self, index: usize, raw: &str, context: &str) -> Result<(), DxfError> {
        if self.x.is_some() {
            return Err(DxfError::invalid(format!("{context} 出现重复值")));
        }
        self.x = Some((index, parse_f64(raw, context)?));
        Ok(())
    }

    fn set_y(&mut self, index: usize, raw: &str, context: &str) -> Result<(), DxfError> {
        if self.y.is_some() {
            return Err(DxfError::invalid(format!("{context} 出现重复值")));
        }
        self.y = Some((index, parse_f64(raw, context)?));
        Ok(())
    }

    fn is_complete(&self) -> bool {
        self.x.is_some() && self.y.is_some()
    }

    fn finish(self, context: &str) -> Result<(Point2, PointSlot), DxfError> {
        match (self.x, self.y) {
            (Some((xi, x)), Some((yi, y))) => Ok((Point2::new(x, y), PointSlot { x: xi, y: yi })),
            _ => Err(DxfError::invalid(format!("{context} 缺少完整的 XY 坐标"))),
        }
    }
}

fn layer_of(pairs: &[Pair]) -> String {
    pairs
        .iter()
        .skip(1)
        .take_while(|(code, _)| *code != 0)
        .find(|(code, _)| *code == 8)
        .map(|(_, value)| value.trim().to_string())
        .unwrap_or_else(|| "0".to_string())
}

fn body(pairs: &[Pair]) -> impl Iterator<Item = (usize, i32, &str)> {
    pairs
        .iter()
        .enumerate()
        .skip(1)
        .map(|(index, (code, value))| (index, *code, value.as_str()))
}

fn parse_line(pairs: &[Pair]) -> Result<(Entity, Vec<PointSlot>), DxfError> {
    let mut start = PendingPoint::default();
    let mut end = PendingPoint::default();
    for (index, code, value) in body(pairs) {
        match code {
            10 => start.set_x(index, value, "LINE 起点 X（组码 10）")?,
            20 => start.set_y(index, value, "LINE 起点 Y（组码 20）")?,
            11 => end.set_x(index, value, "LINE 终点 X（组码 11）")?,
            21 => end.set_y(index, value, "LINE 终点 Y（组码 21）")?,
            _ => {}
        }
    }
    let (start, start_slot) = start.finish("LINE 起点")?;
    let (end, end_slot) = end.finish("LINE 终点")?;
    Ok((
        Entity::Line(Line {
            start,
            end,
            layer: layer_of(pairs),
        }),
        vec![start_slot, end_slot],
    ))
}

fn parse_point(pairs: &[Pair]) -> Result<(Entity, Vec<PointSlot>), DxfError> {
    let mut location = PendingPoint::default();
    for (index, code, value) in body(pairs) {
        match code {
            10 => location.set_x(index, value, "POINT X（组码 10）")?,
            20 => location.set_y(index, value, "POINT Y（组码 20）")?,
            _ => {}
        }
    }
    let (location, slot) = location.finish("POINT 位置")?;
    Ok((
        Entity::Point(Point {
            location,
            layer: layer_of(pairs),
        }),
        vec![slot],
    ))
}

fn parse_circle(pairs: &[Pair]) -> Result<(Entity, Vec<PointSlot>), DxfError> {
    let mut center = PendingPoint::default();
    let mut radius = None;
    for (index, code, value) in body(pairs) {
        match code {
            10 => center.set_x(index, value, "CIRCLE 圆心 X（组码 10）")?,
            20 => center.set_y(index, value, "CIRCLE 圆心 Y（组码 20）")?,
            40 => radius = Some(parse_f64(value, "CIRCLE 半径（组码 40）")?),
            _ => {}
        }
    }
    let (center, slot) = center.finish("CIRCLE 圆心")?;
    let radius = radius.ok_or_else(|| DxfError::invalid("CIRCLE 缺少半径（组码 40）"))?;
    Ok((
        Entity::Circle(Circle {
            center,
            radius,
            layer: layer_of(pairs),
        }),
        vec![slot],
    ))
}

fn parse_arc(pairs: &[Pair]) -> Result<(Entity, Vec<PointSlot>), DxfError> {
    let mut center = PendingPoint::default();
    let mut radius = None;
    let mut start_angle = None;
    let mut end_angle = None;
    for (index, code, value) in body(pairs) {
        match code {
            10 => center.set_x(index, value, "ARC 圆心 X（组码 10）")?,
            20 => center.set_y(index, value, "ARC 圆心 Y（组码 20）")?,
            40 => radius = Some(parse_f64(value, "ARC 半径（组码 40）")?),
            50 => start_angle = Some(parse_f64(value, "ARC 起始角（组码 50）")?.to_radians()),
            51 => end_angle = Some(parse_f64(value, "ARC 终止角（组码 51）")?.to_radians()),
            _ => {}
        }
    }
    let (center, slot) = center.finish("ARC 圆心")?;
    let radius = radius.ok_or_else(|| DxfError::invalid("ARC 缺少半径（组码 40）"))?;
    let start_angle = start_angle.ok_or_else(|| DxfError::invalid("ARC 缺少起始角（组码 50）"))?;
    let end_angle = end_angle.ok_or_else(|| DxfError::invalid("ARC 缺少终止角（组码 51）"))?;
    Ok((
        Entity::Arc(Arc {
            center,
            radius,
            start_angle,
            end_angle,
            layer: layer_of(pairs),
        }),
        vec![slot],
    ))
}

fn parse_ellipse(pairs: &[Pair]) -> Result<(Entity, Vec<PointSlot>), DxfError> {
    let mut center = PendingPoint::default();
    let mut axis_x = None;
    let mut axis_y = None;
    let mut ratio = None;
    let mut start_parameter = 0.0;
    let mut end_parameter = std::f64::consts::TAU;
    for (index, code, value) in body(pairs) {
        match code {
            10 => center.set_x(index, value, "ELLIPSE 圆心 X（组码 10）")?,
            20 => center.set_y(index, value, "ELLIPSE 圆心 Y（组码 20）")?,
            11 => axis_x = Some(parse_f64(value, "ELLIPSE 主轴 X（组码 11）")?),
            21 => axis_y = Some(parse_f64(value, "ELLIPSE 主轴 Y（组码 21）")?),
            40 => ratio = Some(parse_f64(value, "ELLIPSE 轴比（组码 40）")?),
            41 => start_parameter = parse_f64(value, "ELLIPSE 起始参数（组码 41）")?,
            42 => end_parameter = parse_f64(value, "ELLIPSE 终止参数（组码 42）")?,
            _ => {}
        }
    }
    let (center, slot) = center.finish("ELLIPSE 圆心")?;
    let (Some(axis_x), Some(axis_y)) = (axis_x, axis_y) else {
        return Err(DxfError::invalid("ELLIPSE 缺少主轴向量（组码 11/21）"));
    };
    let ratio = ratio.ok_or_else(|| DxfError::invalid("ELLIPSE 缺少轴比（组码 40）"))?;
    Ok((
        Entity::Ellipse(Ellipse {
            center,
            major_axis: Vector2::new(axis_x, axis_y),
            ratio,
            start_parameter,
            end_parameter,
            layer: layer_of(pairs),
        }),
        vec![slot],
    ))
}

fn parse_lwpolyline(pairs: &[Pair]) -> Result<(Entity, Vec<PointSlot>), DxfError> {
    let mut is_closed = false;
    let mut vertices: Vec<PolylineVertex> = Vec::new();
    let mut slots: Vec<PointSlot> = Vec::new();
    let mut pending = PendingPoint::default();
    for (index, code, value) in body(pairs) {
        match code {
            70 => {
                let flag = parse_i32(value, "LWPOLYLINE 标志（组码 70）")?;
                is_closed = flag & 0x01 == 0x01;
            }
            10 => pending.set_x(index, value, "LWPOLYLINE 顶点 X（组码 10）")?,
            20 => pending.set_y(index, value, "LWPOLYLINE 顶点 Y（组码 20）")?,
            42 => {
                let bulge = parse_f64(value, "LWPOLYLINE 顶点 bulge（组码 42）")?;
                let vertex = vertices.last_mut().ok_or_else(|| {
                    DxfError::invalid("LWPOLYLINE 在定义首个顶点前遇到 bulge（组码 42）")
                })?;
                vertex.bulge = bulge;
            }
            _ => {}
        }
        if pending.is_complete() {
            let (position, slot) = std::mem::take(&mut pending).finish("LWPOLYLINE 顶点")?;
            vertices.push(PolylineVertex::new(position));
            slots.push(slot);
        }
    }

    if pending.x.is_some() || pending.y.is_some() {
        return Err(DxfError::invalid(
            "LWPOLYLINE 顶点坐标成对出现（组码 10/20），检测到不完整的顶点",
        ));
    }
    if vertices.is_empty() {
        return Err(DxfError::invalid("LWPOLYLINE 未解析到任何顶点"));
    }

    Ok((
        Entity::Polyline(Polyline {
            vertices,
            is_closed,
            layer: layer_of(pairs),
        }),
        slots,
    ))
}

/// 经典 POLYLINE：头部 + 若干 VERTEX + SEQEND。
fn parse_polyline_sequence(pairs: &[Pair]) -> Result<(Entity, Vec<PointSlot>), DxfError> {
    struct VertexBuilder {
        point: PendingPoint,
        bulge: f64,
        flags: i32,
    }

    fn finish_vertex(
        builder: VertexBuilder,
        vertices: &mut Vec<PolylineVertex>,
        slots: &mut Vec<PointSlot>,
    ) -> Result<(), DxfError> {
        // 多面网格的面记录（128 且非 64）没有位置含义
        if builder.flags & 128 != 0 && builder.flags & 64 == 0 {
            return Ok(());
        }
        let (position, slot) = builder.point.finish("POLYLINE 顶点")?;
        vertices.push(PolylineVertex::with_bulge(position, builder.bulge));
        slots.push(slot);
        Ok(())
    }

    let mut is_closed = false;
    let mut in_header = true;
    let mut current: Option<VertexBuilder> = None;
    let mut vertices = Vec::new();
    let mut slots = Vec::new();

    for (index, code, value) in body(pairs) {
        if code == 0 {
            in_header = false;
            if let Some(builder) = current.take() {
                finish_vertex(builder, &mut vertices, &mut slots)?;
            }
            if value.trim() == "VERTEX" {
                current = Some(VertexBuilder {
                    point: PendingPoint::default(),
                    bulge: 0.0,
                    flags: 0,
                });
            }
            continue;
        }
        if in_header {
            if code == 70 {
                let flag = parse_i16(value, "POLYLINE 标志（组码 70）")?;
                is_closed = flag & 0x01 == 0x01;
            }
            continue;
        }
        if let Some(builder) = current.as_mut() {
            match code {
                10 => builder.point.set_x(index, value, "VERTEX X（组码 10）")?,
                20 => builder.point.set_y(index, value, "VERTEX Y（组码 20）")?,
                42 => builder.bulge = parse_f64(value, "VERTEX bulge（组码 42）")?,
                70 => builder.flags = parse_i32(value, "VERTEX 标志（组码 70）")?,
                _ => {}
            }
        }
    }
    if let Some(builder) = current.take() {
        finish_vertex(builder, &mut vertices, &mut slots)?;
    }
    if vertices.is_empty() {
        return Err(DxfError::invalid("POLYLINE 未解析到任何顶点"));
    }

    Ok((
        Entity::Polyline(Polyline {
            vertices,
            is_closed,
            layer: layer_of(pairs),
        }),
        slots,
    ))
}

fn parse_spline(pairs: &[Pair]) -> Result<(Entity, Vec<PointSlot>), DxfError> {
    let mut degree: Option<i16> = None;
    let mut knot_values = Vec::new();
    let mut control_points = Vec::new();
    let mut control_slots = Vec::new();
    let mut fit_points = Vec::new();
    let mut fit_slots = Vec::new();
    let mut pending_control = PendingPoint::default();
    let mut pending_fit = PendingPoint::default();

    for (index, code, value) in body(pairs) {
        match code {
            71 => degree = Some(parse_i16(value, "SPLINE 阶数（组码 71）")?),
            40 => knot_values.push(parse_f64(value, "SPLINE 节点值（组码 40）")?),
            10 => pending_control.set_x(index, value, "SPLINE 控制点 X（组码 10）")?,
            20 => pending_control.set_y(index, value, "SPLINE 控制点 Y（组码 20）")?,
            11 => pending_fit.set_x(index, value, "SPLINE 拟合点 X（组码 11）")?,
            21 => pending_fit.set_y(index, value, "SPLINE 拟合点 Y（组码 21）")?,
            _ => {}
        }
        if pending_control.is_complete() {
            let (point, slot) = std::mem::take(&mut pending_control).finish("SPLINE 控制点")?;
            control_points.push(point);
            control_slots.push(slot);
        }
        if pending_fit.is_complete() {
            let (point, slot) = std::mem::take(&mut pending_fit).finish("SPLINE 拟合点")?;
            fit_points.push(point);
            fit_slots.push(slot);
        }
    }

    if pending_control.x.is_some() || pending_control.y.is_some() {
        return Err(DxfError::invalid("SPLINE 控制点缺少成对的 X/Y（组码 10/20）"));
    }
    if pending_fit.x.is_some() || pending_fit.y.is_some() {
        return Err(DxfError::invalid("SPLINE 拟合点缺少成对的 X/Y（组码 11/21）"));
    }
    if control_points.is_empty() && fit_points.is_empty() {
        return Err(DxfError::invalid("SPLINE 既无控制点也无拟合点"));
    }
    let degree = degree.ok_or_else(|| DxfError::invalid("SPLINE 缺少阶数（组码 71）"))?;

    control_slots.extend(fit_slots);
    Ok((
        Entity::Spline(Spline {
            degree: i32::from(degree),
            control_points,
            fit_points,
            knot_values,
            layer: layer_of(pairs),
        }),
        control_slots,
    ))
}

/// 未建模实体：收集 10–18 / 20–28 组码中的位置点，
/// 跳过已知的向量型组码（MTEXT/XLINE/RAY 的 11，HATCH 的标高点）。
fn parse_opaque(kind: &str, pairs: &[Pair]) -> (Entity, Vec<PointSlot>) {
    let vector_code = match kind {
        "MTEXT" | "XLINE" | "RAY" => Some(11),
        _ => None,
    };
    let mut skip_first_point = kind == "HATCH";

    let mut points = Vec::new();
    let mut slots = Vec::new();
    let mut pending: Option<(i32, usize, f64)> = None;
    for (index, code, value) in body(pairs) {
        match code {
            10..=18 if Some(code) != vector_code => {
                pending = value
                    .trim()
                    .parse::<f64>()
                    .ok()
                    .map(|x| (code, index, x));
            }
            20..=28 => {
                let Some((x_code, x_index, x)) = pending.take() else {
                    continue;
                };
                if x_code + 10 != code {
                    continue;
                }
                let Ok(y) = value.trim().parse::<f64>() else {
                    continue;
                };
                if skip_first_point {
                    skip_first_point = false;
                    continue;
                }
                points.push(Point2::new(x, y));
                slots.push(PointSlot {
                    x: x_index,
                    y: index,
                });
            }
            _ => {}
        }
    }

    (
        Entity::Other(OpaqueEntity {
            kind: kind.to_string(),
            layer: layer_of(pairs),
            points,
        }),
        slots,
    )
}
