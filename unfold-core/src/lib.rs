pub mod geometry {
    use std::fmt;

    use glam::DVec2;
    use serde::{Deserialize, Serialize};

    /// 二维点，内部以 `glam::DVec2` 表示。
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub struct Point2(pub DVec2);

    impl Point2 {
        #[inline]
        pub fn new(x: f64, y: f64) -> Self {
            Self(DVec2::new(x, y))
        }

        #[inline]
        pub fn from_vec(vec: DVec2) -> Self {
            Self(vec)
        }

        #[inline]
        pub fn x(self) -> f64 {
            self.0.x
        }

        #[inline]
        pub fn y(self) -> f64 {
            self.0.y
        }

        /// 读取指定轴上的坐标分量。
        #[inline]
        pub fn coord(self, axis: Axis) -> f64 {
            match axis {
                Axis::X => self.0.x,
                Axis::Y => self.0.y,
            }
        }

        /// 只改写指定轴上的分量，另一轴保持不变。
        #[inline]
        pub fn set_coord(&mut self, axis: Axis, value: f64) {
            match axis {
                Axis::X => self.0.x = value,
                Axis::Y => self.0.y = value,
            }
        }

        #[inline]
        pub fn translate(self, offset: Vector2) -> Self {
            Self(self.0 + offset.0)
        }

        #[inline]
        pub fn as_vec2(self) -> DVec2 {
            self.0
        }

        #[inline]
        pub fn is_finite(self) -> bool {
            self.0.is_finite()
        }
    }

    impl From<DVec2> for Point2 {
        fn from(value: DVec2) -> Self {
            Self::from_vec(value)
        }
    }

    /// 二维向量。
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub struct Vector2(pub DVec2);

    impl Vector2 {
        #[inline]
        pub fn new(x: f64, y: f64) -> Self {
            Self(DVec2::new(x, y))
        }

        /// 沿单一轴的平移向量。
        #[inline]
        pub fn along(axis: Axis, amount: f64) -> Self {
            match axis {
                Axis::X => Self::new(amount, 0.0),
                Axis::Y => Self::new(0.0, amount),
            }
        }

        #[inline]
        pub fn as_vec2(self) -> DVec2 {
            self.0
        }

        #[inline]
        pub fn x(self) -> f64 {
            self.0.x
        }

        #[inline]
        pub fn y(self) -> f64 {
            self.0.y
        }
    }

    impl From<DVec2> for Vector2 {
        fn from(value: DVec2) -> Self {
            Self(value)
        }
    }

    /// 坐标轴。X 为展开件长度方向，Y 为宽度方向。
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
    #[serde(rename_all = "UPPERCASE")]
    pub enum Axis {
        X,
        Y,
    }

    impl Axis {
        #[inline]
        pub fn other(self) -> Axis {
            match self {
                Axis::X => Axis::Y,
                Axis::Y => Axis::X,
            }
        }
    }

    impl fmt::Display for Axis {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            match self {
                Axis::X => f.write_str("X"),
                Axis::Y => f.write_str("Y"),
            }
        }
    }

    /// 轴对齐边界框，用于计算图纸/实体范围。
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub struct Bounds2D {
        min: Point2,
        max: Point2,
    }

    impl Bounds2D {
        #[inline]
        pub fn new(min: Point2, max: Point2) -> Self {
            Self { min, max }
        }

        #[inline]
        pub fn empty() -> Self {
            Self {
                min: Point2::new(f64::INFINITY, f64::INFINITY),
                max: Point2::new(f64::NEG_INFINITY, f64::NEG_INFINITY),
            }
        }

        #[inline]
        pub fn is_empty(&self) -> bool {
            self.min.x() > self.max.x() || self.min.y() > self.max.y()
        }

        #[inline]
        pub fn min(&self) -> Point2 {
            self.min
        }

        #[inline]
        pub fn max(&self) -> Point2 {
            self.max
        }

        /// 指定轴上的 `(min, max)`。
        #[inline]
        pub fn axis_range(&self, axis: Axis) -> (f64, f64) {
            (self.min.coord(axis), self.max.coord(axis))
        }

        /// 指定轴上的尺寸（max - min）。
        #[inline]
        pub fn size(&self, axis: Axis) -> f64 {
            self.max.coord(axis) - self.min.coord(axis)
        }

        pub fn include_point(&mut self, point: Point2) {
            if self.is_empty() {
                self.min = point;
                self.max = point;
                return;
            }
            let min_vec = self.min.as_vec2().min(point.as_vec2());
            let max_vec = self.max.as_vec2().max(point.as_vec2());
            self.min = Point2::from_vec(min_vec);
            self.max = Point2::from_vec(max_vec);
        }

        pub fn include_bounds(&mut self, other: &Bounds2D) {
            if other.is_empty() {
                return;
            }
            self.include_point(other.min);
            self.include_point(other.max);
        }

        #[inline]
        pub fn center(&self) -> Point2 {
            debug_assert!(!self.is_empty());
            let center = (self.min.as_vec2() + self.max.as_vec2()) * 0.5;
            Point2::from_vec(center)
        }
    }
}

pub mod document {
    use std::f64::consts::{FRAC_PI_2, PI, TAU};

    use glam::DVec2;
    use serde::{Deserialize, Serialize};

    use crate::geometry::{Axis, Bounds2D, Point2, Vector2};

    /// bulge 绝对值超过该阈值时，多段线段视为圆弧。
    pub const BULGE_EPSILON: f64 = 1e-6;

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
    pub struct EntityId(u64);

    impl EntityId {
        #[inline]
        pub fn new(raw: u64) -> Self {
            Self(raw)
        }

        /// 提供原始数值，便于序列化或日志输出。
        #[inline]
        pub fn get(self) -> u64 {
            self.0
        }
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub enum Entity {
        Line(Line),
        Polyline(Polyline),
        Spline(Spline),
        Circle(Circle),
        Arc(Arc),
        Ellipse(Ellipse),
        Point(Point),
        Other(OpaqueEntity),
    }

    impl Entity {
        #[inline]
        pub fn layer_name(&self) -> &str {
            match self {
                Entity::Line(line) => &line.layer,
                Entity::Polyline(polyline) => &polyline.layer,
                Entity::Spline(spline) => &spline.layer,
                Entity::Circle(circle) => &circle.layer,
                Entity::Arc(arc) => &arc.layer,
                Entity::Ellipse(ellipse) => &ellipse.layer,
                Entity::Point(point) => &point.layer,
                Entity::Other(other) => &other.layer,
            }
        }

        /// DXF 实体类型名，用于日志与报告。
        pub fn kind_name(&self) -> &str {
            match self {
                Entity::Line(_) => "LINE",
                Entity::Polyline(_) => "LWPOLYLINE",
                Entity::Spline(_) => "SPLINE",
                Entity::Circle(_) => "CIRCLE",
                Entity::Arc(_) => "ARC",
                Entity::Ellipse(_) => "ELLIPSE",
                Entity::Point(_) => "POINT",
                Entity::Other(other) => &other.kind,
            }
        }

        /// 刚性实体：圆、圆弧、椭圆、样条，以及含非零 bulge 顶点的多段线。
        /// 这些实体的形状不允许被线性拉伸。
        pub fn is_fixed(&self) -> bool {
            match self {
                Entity::Circle(_) | Entity::Arc(_) | Entity::Ellipse(_) | Entity::Spline(_) => {
                    true
                }
                Entity::Polyline(polyline) => polyline.has_curvature(),
                Entity::Line(_) | Entity::Point(_) | Entity::Other(_) => false,
            }
        }

        /// 按固定顺序列出实体的定位点：
        /// 线段为起点、终点；多段线为各顶点；样条为控制点后接拟合点；
        /// 圆、圆弧、椭圆为圆心；点实体为其位置；其余类型为解析到的坐标点。
        pub fn positions(&self) -> Vec<Point2> {
            match self {
                Entity::Line(line) => vec![line.start, line.end],
                Entity::Polyline(polyline) => {
                    polyline.vertices.iter().map(|v| v.position).collect()
                }
                Entity::Spline(spline) => spline
                    .control_points
                    .iter()
                    .chain(spline.fit_points.iter())
                    .copied()
                    .collect(),
                Entity::Circle(circle) => vec![circle.center],
                Entity::Arc(arc) => vec![arc.center],
                Entity::Ellipse(ellipse) => vec![ellipse.center],
                Entity::Point(point) => vec![point.location],
                Entity::Other(other) => other.points.clone(),
            }
        }

        /// 与 [`Entity::positions`] 顺序一致的可变引用。
        pub fn positions_mut(&mut self) -> Vec<&mut Point2> {
            match self {
                Entity::Line(line) => vec![&mut line.start, &mut line.end],
                Entity::Polyline(polyline) => polyline
                    .vertices
                    .iter_mut()
                    .map(|v| &mut v.position)
                    .collect(),
                Entity::Spline(spline) => spline
                    .control_points
                    .iter_mut()
                    .chain(spline.fit_points.iter_mut())
                    .collect(),
                Entity::Circle(circle) => vec![&mut circle.center],
                Entity::Arc(arc) => vec![&mut arc.center],
                Entity::Ellipse(ellipse) => vec![&mut ellipse.center],
                Entity::Point(point) => vec![&mut point.location],
                Entity::Other(other) => other.points.iter_mut().collect(),
            }
        }

        /// 整体平移所有定位点。
        pub fn translate(&mut self, offset: Vector2) {
            for position in self.positions_mut() {
                *position = position.translate(offset);
            }
        }

        /// 计算实体的 2D 轴对齐范围；圆弧与带 bulge 的多段线段按真实弧线计算。
        pub fn bounds(&self) -> Option<Bounds2D> {
            let mut bounds = Bounds2D::empty();
            match self {
                Entity::Line(line) => {
                    bounds.include_point(line.start);
                    bounds.include_point(line.end);
                }
                Entity::Polyline(polyline) => {
                    for vertex in &polyline.vertices {
                        bounds.include_point(vertex.position);
                    }
                    for (start, end) in polyline.segments() {
                        polyline_segment_bounds(start.position, end.position, start.bulge, &mut bounds);
                    }
                }
                Entity::Spline(spline) => {
                    for point in spline.curve_points() {
                        bounds.include_point(point);
                    }
                }
                Entity::Circle(circle) => {
                    let radius = circle.radius.abs();
                    let center = circle.center;
                    bounds.include_point(Point2::new(center.x() - radius, center.y() - radius));
                    bounds.include_point(Point2::new(center.x() + radius, center.y() + radius));
                }
                Entity::Arc(arc) => {
                    arc_bounds(arc, &mut bounds);
                }
                Entity::Ellipse(ellipse) => {
                    ellipse_bounds(ellipse, &mut bounds);
                }
                Entity::Point(point) => {
                    bounds.include_point(point.location);
                }
                Entity::Other(other) => {
                    for point in &other.points {
                        bounds.include_point(*point);
                    }
                }
            }
            if bounds.is_empty() {
                None
            } else {
                Some(bounds)
            }
        }

        /// 实体在指定轴上的区间。
        pub fn axis_interval(&self, axis: Axis) -> Option<(f64, f64)> {
            self.bounds().map(|bounds| bounds.axis_range(axis))
        }
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct Line {
        pub start: Point2,
        pub end: Point2,
        pub layer: String,
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct Polyline {
        pub vertices: Vec<PolylineVertex>,
        pub is_closed: bool,
        pub layer: String,
    }

    impl Polyline {
        /// 是否存在非零 bulge 的顶点。
        pub fn has_curvature(&self) -> bool {
            self.vertices
                .iter()
                .any(|vertex| vertex.bulge.abs() > BULGE_EPSILON)
        }

        /// 相邻顶点组成的线段；闭合时包含首尾相接的一段。
        pub fn segments(&self) -> impl Iterator<Item = (&PolylineVertex, &PolylineVertex)> {
            let count = self.vertices.len();
            let segment_count = if self.is_closed && count > 1 {
                count
            } else {
                count.saturating_sub(1)
            };
            (0..segment_count).map(move |i| (&self.vertices[i], &self.vertices[(i + 1) % count]))
        }
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct PolylineVertex {
        pub position: Point2,
        pub bulge: f64,
    }

    impl PolylineVertex {
        #[inline]
        pub fn new(position: Point2) -> Self {
            Self {
                position,
                bulge: 0.0,
            }
        }

        #[inline]
        pub fn with_bulge(position: Point2, bulge: f64) -> Self {
            Self { position, bulge }
        }
    }

    /// 样条：节点向量只描述参数化，不随绝对位置变化。
    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct Spline {
        pub degree: i32,
        pub control_points: Vec<Point2>,
        pub fit_points: Vec<Point2>,
        pub knot_values: Vec<f64>,
        pub layer: String,
    }

    impl Spline {
        /// 曲线上的采样点：节点向量有效时按 de Boor 求值；否则退回拟合点，
        /// 再退回均匀夹持节点，最后才使用控制点。
        pub fn curve_points(&self) -> Vec<Point2> {
            if let Some(points) = sample_b_spline(self.degree, &self.control_points, &self.knot_values) {
                return points;
            }
            if !self.fit_points.is_empty() {
                return self.fit_points.clone();
            }
            let knots = clamped_uniform_knots(self.degree, self.control_points.len());
            sample_b_spline(self.degree, &self.control_points, &knots)
                .unwrap_or_else(|| self.control_points.clone())
        }
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct Circle {
        pub center: Point2,
        pub radius: f64,
        pub layer: String,
    }

    /// 圆弧实体，角度以弧度形式储存，遵循数学正方向。
    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct Arc {
        pub center: Point2,
        pub radius: f64,
        pub start_angle: f64,
        pub end_angle: f64,
        pub layer: String,
    }

    /// 椭圆实体，记录主轴向量与参数范围（单位为弧度）。
    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct Ellipse {
        pub center: Point2,
        pub major_axis: Vector2,
        pub ratio: f64,
        pub start_parameter: f64,
        pub end_parameter: f64,
        pub layer: String,
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct Point {
        pub location: Point2,
        pub layer: String,
    }

    /// 未建模的实体：仅保留类型名、图层与位置型坐标点，用于范围计算与整体平移。
    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct OpaqueEntity {
        pub kind: String,
        pub layer: String,
        pub points: Vec<Point2>,
    }

    /// 圆弧角跨度（弧度）：终止角小于起始角时加一周。
    pub fn angular_span(start_angle: f64, end_angle: f64) -> f64 {
        let mut end = end_angle;
        if end < start_angle {
            end += TAU;
        }
        end - start_angle
    }

    /// 弧长 = 半径 × 角跨度。
    pub fn arc_length(arc: &Arc) -> f64 {
        arc.radius * angular_span(arc.start_angle, arc.end_angle)
    }

    /// 一张展开图：按文件顺序保存实体，独占所有权。
    #[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
    pub struct Drawing {
        entities: Vec<(EntityId, Entity)>,
        next_entity_id: u64,
    }

    impl Drawing {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn add_entity(&mut self, entity: Entity) -> EntityId {
            let id = self.next_id();
            self.entities.push((id, entity));
            id
        }

        pub fn add_line(&mut self, start: Point2, end: Point2, layer: impl Into<String>) -> EntityId {
            self.add_entity(Entity::Line(Line {
                start,
                end,
                layer: layer.into(),
            }))
        }

        pub fn add_circle(
            &mut self,
            center: Point2,
            radius: f64,
            layer: impl Into<String>,
        ) -> EntityId {
            self.add_entity(Entity::Circle(Circle {
                center,
                radius,
                layer: layer.into(),
            }))
        }

        /// 角度单位为弧度。
        pub fn add_arc(
            &mut self,
            center: Point2,
            radius: f64,
            start_angle: f64,
            end_angle: f64,
            layer: impl Into<String>,
        ) -> EntityId {
            self.add_entity(Entity::Arc(Arc {
                center,
                radius,
                start_angle,
                end_angle,
                layer: layer.into(),
            }))
        }

        pub fn add_polyline(
            &mut self,
            vertices: impl IntoIterator<Item = PolylineVertex>,
            is_closed: bool,
            layer: impl Into<String>,
        ) -> EntityId {
            self.add_entity(Entity::Polyline(Polyline {
                vertices: vertices.into_iter().collect(),
                is_closed,
                layer: layer.into(),
            }))
        }

        pub fn add_point(&mut self, location: Point2, layer: impl Into<String>) -> EntityId {
            self.add_entity(Entity::Point(Point {
                location,
                layer: layer.into(),
            }))
        }

        pub fn entities(&self) -> impl Iterator<Item = (EntityId, &Entity)> {
            self.entities.iter().map(|(id, entity)| (*id, entity))
        }

        pub fn entities_mut(&mut self) -> impl Iterator<Item = (EntityId, &mut Entity)> {
            self.entities.iter_mut().map(|(id, entity)| (*id, entity))
        }

        pub fn entity(&self, id: EntityId) -> Option<&Entity> {
            self.entities
                .iter()
                .find(|(entity_id, _)| *entity_id == id)
                .map(|(_, entity)| entity)
        }

        #[inline]
        pub fn len(&self) -> usize {
            self.entities.len()
        }

        #[inline]
        pub fn is_empty(&self) -> bool {
            self.entities.is_empty()
        }

        /// 所有实体范围的并集；没有可计算范围的实体时返回 `None`。
        pub fn bounds(&self) -> Option<Bounds2D> {
            let mut bounds = Bounds2D::empty();
            for (_, entity) in &self.entities {
                if let Some(entity_bounds) = entity.bounds() {
                    bounds.include_bounds(&entity_bounds);
                }
            }
            if bounds.is_empty() {
                None
            } else {
                Some(bounds)
            }
        }

        fn next_id(&mut self) -> EntityId {
            let id = EntityId::new(self.next_entity_id);
            self.next_entity_id += 1;
            id
        }
    }

    fn normalize_angle(angle: f64) -> f64 {
        let mut result = angle % TAU;
        if result < 0.0 {
            result += TAU;
        }
        result
    }

    fn canonical_interval(start: f64, end: f64) -> (f64, f64) {
        let start = normalize_angle(start);
        let mut end = normalize_angle(end);
        if (end - start).abs() < 1e-9 {
            end = start + TAU;
        } else if end < start {
            end += TAU;
        }
        (start, end)
    }

    fn arc_point(center: Point2, radius: f64, angle: f64) -> Point2 {
        let offset = Vector2::new(radius * angle.cos(), radius * angle.sin());
        center.translate(offset)
    }

    fn arc_bounds(arc: &Arc, bounds: &mut Bounds2D) {
        let radius = arc.radius.abs();
        if radius <= f64::EPSILON {
            bounds.include_point(arc.center);
            return;
        }

        let (start, end) = canonical_interval(arc.start_angle, arc.end_angle);
        bounds.include_point(arc_point(arc.center, radius, start));
        bounds.include_point(arc_point(arc.center, radius, end));

        const QUADRANTS: [f64; 4] = [0.0, FRAC_PI_2, PI, FRAC_PI_2 * 3.0];
        for base in QUADRANTS {
            let mut candidate = base;
            while candidate < start {
                candidate += TAU;
            }
            if candidate <= end {
                bounds.include_point(arc_point(arc.center, radius, candidate));
            }
        }
    }

    fn ellipse_bounds(ellipse: &Ellipse, bounds: &mut Bounds2D) {
        let major_vec = ellipse.major_axis.as_vec2();
        let major_length = major_vec.length();

        if major_length <= f64::EPSILON {
            bounds.include_point(ellipse.center);
            return;
        }
        let minor_length = major_length * ellipse.ratio.abs();
        let major_dir = major_vec / major_length;
        let minor_dir = DVec2::new(-major_dir.y, major_dir.x);
        let minor_vec = minor_dir * minor_length;

        let start = ellipse.start_parameter;
        let mut end = ellipse.end_parameter;
        if (end - start).abs() < 1e-9 {
            end = start + TAU;
        } else if end < start {
            while end < start {
                end += TAU;
            }
        }
        let span = end - start;
        let step_count = ((span / (TAU / 64.0)).ceil() as usize).max(16);
        for i in 0..=step_count {
            let t = start + span * (i as f64 / step_count as f64);
            let offset = major_vec * t.cos() + minor_vec * t.sin();
            bounds.include_point(ellipse.center.translate(Vector2::from(offset)));
        }
    }

    const SPLINE_SAMPLES_PER_SPAN: usize = 32;

    fn sample_b_spline(degree: i32, control: &[Point2], knots: &[f64]) -> Option<Vec<Point2>> {
        let p = usize::try_from(degree).ok().filter(|p| *p >= 1)?;
        let n = control.len();
        if n <= p || knots.len() != n + p + 1 || knots.windows(2).any(|w| w[1] < w[0]) {
            return None;
        }
        if !knots.iter().all(|k| k.is_finite()) {
            return None;
        }

        let mut points = Vec::new();
        for span in p..n {
            let (low, high) = (knots[span], knots[span + 1]);
            if high - low <= f64::EPSILON {
                continue;
            }
            for step in 0..=SPLINE_SAMPLES_PER_SPAN {
                let t = low + (high - low) * (step as f64 / SPLINE_SAMPLES_PER_SPAN as f64);
                points.push(de_boor(p, span, t, control, knots));
            }
        }
        if points.is_empty() { None } else { Some(points) }
    }

    /// 在节点区间 `[knots[span], knots[span + 1]]` 内求曲线上的点。
    fn de_boor(p: usize, span: usize, t: f64, control: &[Point2], knots: &[f64]) -> Point2 {
        let mut d: Vec<DVec2> = (0..=p).map(|j| control[j + span - p].as_vec2()).collect();
        for r in 1..=p {
            for j in (r..=p).rev() {
                let left = knots[j + span - p];
                let denom = knots[j + 1 + span - r] - left;
                let alpha = if denom.abs() <= f64::EPSILON {
                    0.0
                } else {
                    (t - left) / denom
                };
                d[j] = d[j - 1] * (1.0 - alpha) + d[j] * alpha;
            }
        }
        Point2::from_vec(d[p])
    }

    fn clamped_uniform_knots(degree: i32, count: usize) -> Vec<f64> {
        let Ok(p) = usize::try_from(degree) else {
            return Vec::new();
        };
        if p == 0 || count <= p {
            return Vec::new();
        }
        let interior = count - p;
        let mut knots = vec![0.0; p + 1];
        knots.extend((1..interior).map(|i| i as f64 / interior as f64));
        knots.extend(std::iter::repeat_n(1.0, p + 1));
        knots
    }

    fn polyline_segment_bounds(start: Point2, end: Point2, bulge: f64, bounds: &mut Bounds2D) {
        if bulge.abs() <= 1e-9 {
            return;
        }

        let start_vec = start.as_vec2();
        let end_vec = end.as_vec2();
        let chord = end_vec - start_vec;
        let chord_len = chord.length();
        if chord_len <= f64::EPSILON {
            return;
        }

        let theta = 4.0 * bulge.atan();
        let sin_half = (theta / 2.0).sin();
        if sin_half.abs() <= 1e-9 {
            return;
        }

        // 圆心位于弦中点的法线上，距离 = 半径 - 矢高，bulge 的符号决定方向。
        let radius = chord_len / (2.0 * sin_half);
        let midpoint = (start_vec + end_vec) * 0.5;
        let normal = DVec2::new(-chord.y, chord.x).normalize();
        let sagitta = bulge * chord_len / 2.0;
        let center_vec = midpoint + normal * (radius - sagitta);
        let center = Point2::from_vec(center_vec);

        let start_dir = start_vec - center_vec;
        let start_angle = start_dir.y.atan2(start_dir.x);
        let (arc_start, arc_end) = if theta >= 0.0 {
            (start_angle, start_angle + theta)
        } else {
            (start_angle + theta, start_angle)
        };

        let arc = Arc {
            center,
            radius: radius.abs(),
            start_angle: arc_start,
            end_angle: arc_end,
            layer: String::new(),
        };
        arc_bounds(&arc, bounds);
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use crate::geometry::{Axis, Point2};
        use std::f64::consts::{FRAC_PI_2, PI};

        #[test]
        fn drawing_stores_entities_in_order() {
            let mut drawing = Drawing::new();
            let line = drawing.add_line(Point2::new(0.0, 0.0), Point2::new(10.0, 0.0), "0");
            let circle = drawing.add_circle(Point2::new(5.0, 5.0), 2.0, "HOLES");
            let point = drawing.add_point(Point2::new(1.0, 1.0), "0");

            assert_eq!(line.get(), 0);
            assert_eq!(circle.get(), 1);
            assert_eq!(point.get(), 2);
            assert_eq!(drawing.len(), 3);
            match drawing.entity(circle) {
                Some(Entity::Circle(c)) => assert_eq!(c.layer, "HOLES"),
                other => panic!("unexpected entity lookup result: {other:?}"),
            }

            let bounds = drawing.bounds().expect("drawing bounds should exist");
            assert!((bounds.min().x() - 0.0).abs() < 1e-9);
            assert!((bounds.max().x() - 10.0).abs() < 1e-9);
            assert!((bounds.max().y() - 7.0).abs() < 1e-9);
            assert!((bounds.size(Axis::Y) - 7.0).abs() < 1e-9);
        }

        #[test]
        fn empty_drawing_has_no_bounds() {
            assert!(Drawing::new().bounds().is_none());
        }

        #[test]
        fn arc_bounds_include_quadrant_extremes() {
            let mut drawing = Drawing::new();
            drawing.add_arc(Point2::new(0.0, 0.0), 10.0, 0.0, PI, "0");
            let bounds = drawing.bounds().unwrap();
            assert!((bounds.min().x() + 10.0).abs() < 1e-9);
            assert!((bounds.max().x() - 10.0).abs() < 1e-9);
            assert!(bounds.min().y().abs() < 1e-9);
            assert!((bounds.max().y() - 10.0).abs() < 1e-9);
        }

        #[test]
        fn bulge_segment_extends_polyline_bounds() {
            // bulge = 1 表示半圆，弦长 10，向左侧凸出 5。
            let polyline = Entity::Polyline(Polyline {
                vertices: vec![
                    PolylineVertex::with_bulge(Point2::new(0.0, 0.0), 1.0),
                    PolylineVertex::new(Point2::new(10.0, 0.0)),
                ],
                is_closed: false,
                layer: "0".to_string(),
            });
            let bounds = polyline.bounds().unwrap();
            assert!((bounds.min().y() + 5.0).abs() < 1e-9 || (bounds.max().y() - 5.0).abs() < 1e-9);
            assert!((bounds.size(Axis::Y) - 5.0).abs() < 1e-9);
            assert!((bounds.size(Axis::X) - 10.0).abs() < 1e-9);
        }

        #[test]
        fn fixed_classification_follows_entity_kind() {
            let line = Entity::Line(Line {
                start: Point2::new(0.0, 0.0),
                end: Point2::new(1.0, 0.0),
                layer: "0".to_string(),
            });
            let straight = Entity::Polyline(Polyline {
                vertices: vec![
                    PolylineVertex::new(Point2::new(0.0, 0.0)),
                    PolylineVertex::new(Point2::new(1.0, 0.0)),
                ],
                is_closed: false,
                layer: "0".to_string(),
            });
            let curved = Entity::Polyline(Polyline {
                vertices: vec![
                    PolylineVertex::with_bulge(Point2::new(0.0, 0.0), 0.5),
                    PolylineVertex::new(Point2::new(1.0, 0.0)),
                ],
                is_closed: false,
                layer: "0".to_string(),
            });
            let circle = Entity::Circle(Circle {
                center: Point2::new(0.0, 0.0),
                radius: 1.0,
                layer: "0".to_string(),
            });
            assert!(!line.is_fixed());
            assert!(!straight.is_fixed());
            assert!(curved.is_fixed());
            assert!(circle.is_fixed());
        }

        #[test]
        fn arc_length_wraps_negative_span() {
            let half = Arc {
                center: Point2::new(0.0, 0.0),
                radius: 50.0,
                start_angle: 0.0,
                end_angle: PI,
                layer: "0".to_string(),
            };
            assert!((arc_length(&half) - 157.079_632_679).abs() < 1e-6);

            let wrapped = Arc {
                start_angle: 3.0 * FRAC_PI_2,
                end_angle: 0.0,
                ..half
            };
            assert!((angular_span(wrapped.start_angle, wrapped.end_angle) - FRAC_PI_2).abs() < 1e-12);
        }

        #[test]
        fn spline_bounds_follow_the_curve() {
            let bezier = Entity::Spline(Spline {
                degree: 3,
                control_points: vec![
                    Point2::new(90.0, 0.0),
                    Point2::new(120.0, 10.0),
                    Point2::new(120.0, 20.0),
                    Point2::new(90.0, 30.0),
                ],
                fit_points: Vec::new(),
                knot_values: vec![0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 1.0],
                layer: "0".to_string(),
            });
            let (min_x, max_x) = bezier.axis_interval(Axis::X).unwrap();
            assert!((min_x - 90.0).abs() < 1e-9);
            assert!((max_x - 112.5).abs() < 1e-9);

            // 缺少节点向量时按均匀夹持节点求值，同样落在曲线上
            let Entity::Spline(mut spline) = bezier else {
                unreachable!()
            };
            spline.knot_values.clear();
            let (_, max_x) = Entity::Spline(spline).axis_interval(Axis::X).unwrap();
            assert!((max_x - 112.5).abs() < 1e-9);
        }

        #[test]
        fn spline_with_bad_knots_uses_fit_points() {
            let spline = Entity::Spline(Spline {
                degree: 3,
                control_points: vec![Point2::new(0.0, 0.0), Point2::new(50.0, 40.0)],
                fit_points: vec![Point2::new(0.0, 0.0), Point2::new(20.0, 5.0), Point2::new(30.0, 0.0)],
                knot_values: vec![0.0, 1.0],
                layer: "0".to_string(),
            });
            let bounds = spline.bounds().unwrap();
            assert_eq!(bounds.axis_range(Axis::X), (0.0, 30.0));
            assert_eq!(bounds.axis_range(Axis::Y), (0.0, 5.0));
        }

        #[test]
        fn translate_moves_every_position() {
            let mut spline = Entity::Spline(Spline {
                degree: 3,
                control_points: vec![Point2::new(0.0, 0.0), Point2::new(1.0, 2.0)],
                fit_points: vec![Point2::new(0.5, 1.0)],
                knot_values: vec![0.0, 0.0, 1.0, 1.0],
                layer: "0".to_string(),
            });
            spline.translate(Vector2::along(Axis::X, 3.0));
            let xs: Vec<f64> = spline.positions().iter().map(|p| p.x()).collect();
            assert_eq!(xs, vec![3.0, 4.0, 3.5]);
            match spline {
                Entity::Spline(s) => assert_eq!(s.knot_values, vec![0.0, 0.0, 1.0, 1.0]),
                _ => unreachable!(),
            }
        }
    }
}
