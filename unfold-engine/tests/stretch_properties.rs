use std::f64::consts::PI;
use std::fs;

use unfold_core::document::{Drawing, Entity, EntityId, PolylineVertex, Spline};
use unfold_core::geometry::{Axis, Point2};
use unfold_engine::errors::EngineError;
use unfold_engine::{Anchor, StretchOutcome, StretchSession, stretch_axis};
use unfold_io::DxfDocument;

/// 200 x 80 的展开件：两个孔、一段折弯圆弧、一条带 bulge 的多段线。
fn flat_pattern() -> Drawing {
    let mut drawing = Drawing::new();
    drawing.add_polyline(
        [
            PolylineVertex::new(Point2::new(0.0, 0.0)),
            PolylineVertex::new(Point2::new(200.0, 0.0)),
            PolylineVertex::new(Point2::new(200.0, 80.0)),
            PolylineVertex::new(Point2::new(0.0, 80.0)),
        ],
        true,
        "CONTOUR",
    );
    drawing.add_circle(Point2::new(40.0, 40.0), 8.0, "HOLES");
    drawing.add_circle(Point2::new(160.0, 40.0), 8.0, "HOLES");
    drawing.add_arc(Point2::new(100.0, 60.0), 10.0, 0.0, PI, "BEND");
    drawing.add_polyline(
        [
            PolylineVertex::with_bulge(Point2::new(120.0, 20.0), 0.3),
            PolylineVertex::new(Point2::new(130.0, 20.0)),
        ],
        false,
        "SLOT",
    );
    drawing.add_line(Point2::new(70.0, 0.0), Point2::new(70.0, 80.0), "BEND_LINE");
    drawing
}

fn session_for(drawing: Drawing) -> StretchSession {
    let mut session = StretchSession::new();
    session
        .load_document("part.dxf", DxfDocument::from_drawing(drawing))
        .expect("加载内存图纸失败");
    session
}

fn fixed_signature(drawing: &Drawing, axis: Axis) -> Vec<(f64, f64)> {
    drawing
        .entities()
        .filter(|(_, entity)| entity.is_fixed())
        .map(|(_, entity)| {
            let (min, max) = entity.axis_interval(axis).expect("刚性实体范围");
            let radius = match entity {
                Entity::Circle(circle) => circle.radius,
                Entity::Arc(arc) => arc.radius,
                _ => 0.0,
            };
            (max - min, radius)
        })
        .collect()
}

fn assert_same_geometry(left: &Drawing, right: &Drawing, eps: f64) {
    assert_eq!(left.len(), right.len());
    for ((_, a), (_, b)) in left.entities().zip(right.entities()) {
        let pa = a.positions();
        let pb = b.positions();
        assert_eq!(pa.len(), pb.len());
        for (p, q) in pa.iter().zip(pb.iter()) {
            assert!((p.x() - q.x()).abs() < eps, "{p:?} vs {q:?}");
            assert!((p.y() - q.y()).abs() < eps, "{p:?} vs {q:?}");
        }
    }
}

#[test]
fn stretched_extent_matches_target_for_every_anchor() {
    for anchor in [Anchor::Start, Anchor::Center, Anchor::End] {
        for target in [120.0, 199.5, 240.0, 612.25] {
            let mut session = session_for(flat_pattern());
            let outcome = session
                .stretch(target, Axis::X, anchor)
                .expect("拉伸失败");
            assert!(
                (outcome.bounds.size(Axis::X) - target).abs() < 1e-6,
                "anchor {anchor} target {target}"
            );
            assert!((outcome.bounds.size(Axis::Y) - 80.0).abs() < 1e-9);
        }
    }
}

#[test]
fn fixed_features_keep_their_size() {
    let original = flat_pattern();
    let mut session = session_for(original.clone());
    let outcome = session
        .stretch(317.0, Axis::X, Anchor::Center)
        .expect("拉伸失败");

    let before = fixed_signature(&original, Axis::X);
    let after = fixed_signature(outcome.document.drawing(), Axis::X);
    assert_eq!(before.len(), after.len());
    for ((len_a, r_a), (len_b, r_b)) in before.iter().zip(after.iter()) {
        assert_eq!(r_a.to_bits(), r_b.to_bits());
        assert!((len_a - len_b).abs() < 1e-9);
    }

    let report = &outcome.axes[0].report;
    assert!(report.skipped.is_empty());
    assert_eq!(report.transformed.len(), original.len());
}

/// 在旧范围中点处放一个标记点，用于跟踪参考点对应的材料位置。
fn pattern_with_marker() -> (Drawing, EntityId) {
    let mut drawing = flat_pattern();
    let marker = drawing.add_point(Point2::new(100.0, 40.0), "MARK");
    (drawing, marker)
}

fn marker_location(outcome: &StretchOutcome, marker: EntityId) -> Point2 {
    match outcome.document.drawing().entity(marker) {
        Some(Entity::Point(point)) => point.location,
        other => panic!("marker missing: {other:?}"),
    }
}

#[test]
fn anchor_point_stays_put() {
    let original_bounds = flat_pattern().bounds().expect("范围");
    for anchor in [Anchor::Start, Anchor::End] {
        let mut session = session_for(flat_pattern());
        let bounds = session
            .stretch(150.0, Axis::X, anchor)
            .expect("拉伸失败")
            .bounds;
        let (before, after) = match anchor {
            Anchor::Start => (original_bounds.min().x(), bounds.min().x()),
            _ => (original_bounds.max().x(), bounds.max().x()),
        };
        assert!((before - after).abs() < 1e-6, "anchor {anchor}");
    }

    // 中心参考点保持的是原中点处的材料点，而非新包围盒的中心
    for target in [150.0, 317.0] {
        let (drawing, marker) = pattern_with_marker();
        let mut session = session_for(drawing);
        let outcome = session
            .stretch(target, Axis::X, Anchor::Center)
            .expect("拉伸失败");
        assert!((marker_location(&outcome, marker).x() - 100.0).abs() < 1e-6);
        assert!((outcome.bounds.size(Axis::X) - target).abs() < 1e-6);
    }
}

#[test]
fn spline_extent_is_measured_on_the_curve() {
    let mut drawing = Drawing::new();
    drawing.add_line(Point2::new(0.0, 0.0), Point2::new(90.0, 0.0), "0");
    drawing.add_line(Point2::new(0.0, 30.0), Point2::new(90.0, 30.0), "0");
    drawing.add_entity(Entity::Spline(Spline {
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
    }));

    let mut session = session_for(drawing);
    assert!((session.measure(Axis::X).expect("测量失败") - 112.5).abs() < 1e-9);
    let outcome = session
        .stretch(150.0, Axis::X, Anchor::Start)
        .expect("拉伸失败");
    assert!((outcome.bounds.size(Axis::X) - 150.0).abs() < 1e-6);
}

#[test]
fn zero_delta_leaves_every_coordinate_unchanged() {
    let mut drawing = flat_pattern();
    let original = drawing.clone();
    let outcome = stretch_axis(&mut drawing, Axis::X, 200.0, Anchor::End).expect("拉伸失败");
    assert!(outcome.is_none());
    assert_eq!(drawing, original);

    let mut session = session_for(flat_pattern());
    let identity = session.stretch(80.0, Axis::Y, Anchor::Start).expect("拉伸失败");
    assert!(identity.is_identity());
    assert_eq!(identity.document.drawing(), &original);
}

#[test]
fn no_drift_between_repeated_stretches() {
    let mut session = session_for(flat_pattern());
    session
        .stretch(400.0, Axis::X, Anchor::Center)
        .expect("第一次拉伸失败");
    session
        .stretch(150.0, Axis::X, Anchor::Center)
        .expect("第二次拉伸失败");
    let via_detour = session
        .stretch(260.0, Axis::X, Anchor::Center)
        .expect("第三次拉伸失败");

    let mut fresh = session_for(flat_pattern());
    let direct = fresh
        .stretch(260.0, Axis::X, Anchor::Center)
        .expect("直接拉伸失败");

    assert_same_geometry(via_detour.document.drawing(), direct.document.drawing(), 1e-6);
}

#[test]
fn drawing_without_fixed_entities_scales_uniformly() {
    let mut drawing = Drawing::new();
    drawing.add_line(Point2::new(10.0, 0.0), Point2::new(110.0, 0.0), "0");
    drawing.add_point(Point2::new(35.0, 5.0), "0");
    drawing.add_point(Point2::new(85.0, 5.0), "0");

    let mut session = session_for(drawing);
    assert_eq!(session.zones(Axis::X).expect("区间").len(), 1);
    let outcome = session
        .stretch(200.0, Axis::X, Anchor::Center)
        .expect("拉伸失败");

    let xs: Vec<f64> = outcome
        .document
        .drawing()
        .entities()
        .flat_map(|(_, entity)| entity.positions())
        .map(|p| p.x())
        .collect();
    // 以中点 60 为基准放大两倍
    let expected = [-40.0, 160.0, 10.0, 110.0];
    for (x, e) in xs.iter().zip(expected) {
        assert!((x - e).abs() < 1e-9, "{x} vs {e}");
    }
}

#[test]
fn full_width_circle_cannot_be_stretched() {
    let mut drawing = Drawing::new();
    drawing.add_circle(Point2::new(50.0, 50.0), 50.0, "0");
    let mut session = session_for(drawing);

    let err = session
        .stretch(130.0, Axis::X, Anchor::Start)
        .expect_err("应报告无可拉伸区");
    match err.root_cause() {
        EngineError::NoElasticRegion { axis, delta } => {
            assert_eq!(*axis, Axis::X);
            assert!((delta - 30.0).abs() < 1e-9);
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn both_axes_are_corrected_in_order() {
    let mut session = session_for(flat_pattern());
    let outcome = session
        .stretch_both(260.0, 95.0, Anchor::Start, Anchor::Center)
        .expect("双轴拉伸失败");

    assert_eq!(outcome.axes.len(), 2);
    assert_eq!(outcome.axes[0].axis, Axis::X);
    assert_eq!(outcome.axes[1].axis, Axis::Y);
    assert!((outcome.bounds.size(Axis::X) - 260.0).abs() < 1e-6);
    assert!((outcome.bounds.size(Axis::Y) - 95.0).abs() < 1e-6);
    assert!((outcome.bounds.min().x() - 0.0).abs() < 1e-6);

    let (drawing, marker) = pattern_with_marker();
    let mut marked = session_for(drawing);
    let outcome = marked
        .stretch_both(260.0, 95.0, Anchor::Start, Anchor::Center)
        .expect("双轴拉伸失败");
    assert!((marker_location(&outcome, marker).y() - 40.0).abs() < 1e-6);
    assert!((outcome.bounds.size(Axis::Y) - 95.0).abs() < 1e-6);

    let only_y = session
        .stretch_both(200.0, 100.0, Anchor::Start, Anchor::Start)
        .expect("仅 Y 拉伸失败");
    assert_eq!(only_y.axes.len(), 1);
    assert_eq!(only_y.axes[0].axis, Axis::Y);
}

#[test]
fn saved_result_reloads_with_target_length() {
    let dir = tempfile::tempdir().expect("创建临时目录失败");
    let input = dir.path().join("Внешний корп3.dxf");
    let document = DxfDocument::from_drawing(flat_pattern());
    fs::write(&input, document.to_dxf_string()).expect("写入夹具失败");

    let mut session = StretchSession::new();
    let info = session.load(&input).expect("读取失败");
    assert!((info.length_x - 200.0).abs() < 1e-9);
    assert_eq!(info.entity_count, 6);

    let outcome = session
        .stretch(250.0, Axis::X, Anchor::Start)
        .expect("拉伸失败");
    let saved = session.save(&outcome, None).expect("保存失败");
    assert_eq!(saved, dir.path().join("Внешний корп3_stretch.dxf"));

    let mut reloaded = StretchSession::new();
    let info = reloaded.load(&saved).expect("重新读取失败");
    assert!((info.length_x - 250.0).abs() < 1e-6);
    assert!((info.width_y - 80.0).abs() < 1e-9);
}

#[test]
fn missing_file_is_a_geometry_load_error() {
    let dir = tempfile::tempdir().expect("创建临时目录失败");
    let mut session = StretchSession::new();
    let err = session
        .load(&dir.path().join("absent.dxf"))
        .expect_err("缺失文件应失败");
    assert!(matches!(err, EngineError::GeometryLoad { .. }));
    assert!(!session.is_loaded());
}
