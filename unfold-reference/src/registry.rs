use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info, warn};
use unfold_core::document::{Drawing, Entity, angular_span, arc_length};
use unfold_io::{DocumentLoader, DxfFacade};

use crate::errors::MatchError;
use crate::naming::{NamingConvention, Side};
use crate::{file_name_of, list_dxf_files};

/// 参考图中一段圆弧的测量值。
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ArcMeasurement {
    pub radius: f64,
    /// 角跨度，单位为度。
    pub span_degrees: f64,
    pub arc_length: f64,
}

/// 一个装配的两条基准弧长：外侧取半径最大的圆弧，内侧取次大的。
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReferenceRecord {
    pub assembly: String,
    pub path: PathBuf,
    pub outer: ArcMeasurement,
    pub inner: ArcMeasurement,
}

impl ReferenceRecord {
    pub fn arc(&self, side: Side) -> &ArcMeasurement {
        match side {
            Side::Outer => &self.outer,
            Side::Inner => &self.inner,
        }
    }

    pub fn target_length(&self, side: Side) -> f64 {
        self.arc(side).arc_length
    }
}

/// 汇总输出用的装配记录。
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReferenceSummary {
    pub assembly: String,
    pub file: String,
    pub outer_radius: f64,
    pub outer_length: f64,
    pub inner_radius: f64,
    pub inner_length: f64,
    pub difference: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedFile {
    pub path: PathBuf,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScanSummary {
    pub folder: PathBuf,
    pub loaded: Vec<String>,
    pub skipped: Vec<SkippedFile>,
}

/// 工作图与其装配基准的匹配结果。
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkItem {
    pub path: PathBuf,
    pub assembly: String,
    pub side: Side,
    pub current_length: f64,
    pub target_length: f64,
}

impl WorkItem {
    pub fn delta(&self) -> f64 {
        self.target_length - self.current_length
    }
}

/// 图中所有有效圆弧（半径有限且为正），按半径降序、弧长降序排列；
/// 二者都相同时保持文件顺序。
pub fn measure_arcs(drawing: &Drawing) -> Vec<ArcMeasurement> {
    let mut arcs: Vec<ArcMeasurement> = drawing
        .entities()
        .filter_map(|(_, entity)| match entity {
            Entity::Arc(arc) if arc.radius.is_finite() && arc.radius > 0.0 => {
                Some(ArcMeasurement {
                    radius: arc.radius,
                    span_degrees: angular_span(arc.start_angle, arc.end_angle).to_degrees(),
                    arc_length: arc_length(arc),
                })
            }
            _ => None,
        })
        .collect();
    arcs.sort_by(|a, b| {
        b.radius
            .total_cmp(&a.radius)
            .then_with(|| b.arc_length.total_cmp(&a.arc_length))
    });
    arcs
}

fn record_from_drawing(
    assembly: String,
    path: &Path,
    drawing: &Drawing,
) -> Result<ReferenceRecord, MatchError> {
    let arcs = measure_arcs(drawing);
    match arcs.as_slice() {
        [outer, inner, ..] => Ok(ReferenceRecord {
            assembly,
            path: path.to_path_buf(),
            outer: *outer,
            inner: *inner,
        }),
        _ => Err(MatchError::InsufficientArcs {
            path: path.to_path_buf(),
            found: arcs.len(),
        }),
    }
}

/// 按装配编号索引的参考记录。
#[derive(Debug)]
pub struct ReferenceRegistry {
    naming: NamingConvention,
    facade: DxfFacade,
    records: BTreeMap<String, ReferenceRecord>,
}

impl ReferenceRegistry {
    pub fn new(naming: NamingConvention) -> Self {
        Self {
            naming,
            facade: DxfFacade::new(),
            records: BTreeMap::new(),
        }
    }

    pub fn naming(&self) -> &NamingConvention {
        &self.naming
    }

    /// 读取单个参考图并登记；同一装配重复时后者覆盖前者。
    pub fn add_reference(&mut self, path: &Path) -> Result<&ReferenceRecord, MatchError> {
        let assembly = self.naming.assembly_id(&file_name_of(path))?;
        let document = self
            .facade
            .load(path)
            .map_err(|source| MatchError::Load {
                path: path.to_path_buf(),
                source,
            })?;
        let record = record_from_drawing(assembly, path, document.drawing())?;
        Ok(self.insert(record))
    }

    pub fn insert(&mut self, record: ReferenceRecord) -> &ReferenceRecord {
        debug!(
            assembly = %record.assembly,
            outer = record.outer.arc_length,
            inner = record.inner.arc_length,
            "登记参考记录"
        );
        match self.records.entry(record.assembly.clone()) {
            Entry::Occupied(mut entry) => {
                warn!(
                    assembly = %record.assembly,
                    path = %record.path.display(),
                    previous = %entry.get().path.display(),
                    "装配重复，覆盖之前的参考记录"
                );
                entry.insert(record);
                entry.into_mut()
            }
            Entry::Vacant(entry) => entry.insert(record),
        }
    }

    /// 清空后重新扫描文件夹中的参考图；单个文件失败只记录并跳过。
    pub fn scan_folder(&mut self, folder: &Path) -> Result<ScanSummary, MatchError> {
        self.clear();
        let mut summary = ScanSummary {
            folder: folder.to_path_buf(),
            loaded: Vec::new(),
            skipped: Vec::new(),
        };
        let candidates: Vec<PathBuf> = list_dxf_files(folder)?
            .into_iter()
            .filter(|path| self.naming.is_reference_file(path))
            .collect();

        for path in candidates {
            match self.add_reference(&path) {
                Ok(record) => {
                    info!(
                        path = %path.display(),
                        assembly = %record.assembly,
                        outer = record.outer.arc_length,
                        inner = record.inner.arc_length,
                        "参考图已读入"
                    );
                    summary.loaded.push(record.assembly.clone());
                }
                Err(err) => {
                    warn!(path = %path.display(), error = %err, "跳过参考图");
                    summary.skipped.push(SkippedFile {
                        path,
                        reason: err.to_string(),
                    });
                }
            }
        }

        if self.records.is_empty() {
            return Err(MatchError::NoReferencesFound {
                folder: folder.to_path_buf(),
            });
        }
        Ok(summary)
    }

    pub fn get(&self, assembly: &str) -> Option<&ReferenceRecord> {
        self.records.get(assembly)
    }

    pub fn known_assemblies(&self) -> Vec<String> {
        self.records.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }

    /// 由文件名确定侧别与装配，返回目标弧长。
    pub fn match_work_file(
        &self,
        path: &Path,
        current_length: f64,
    ) -> Result<WorkItem, MatchError> {
        let name = file_name_of(path);
        let side = self.naming.side(&name)?;
        let assembly = self.naming.assembly_id(&name)?;
        let record = self
            .records
            .get(&assembly)
            .ok_or_else(|| MatchError::UnknownAssembly {
                assembly: assembly.clone(),
                known: self.known_assemblies(),
            })?;
        Ok(WorkItem {
            path: path.to_path_buf(),
            assembly,
            side,
            current_length,
            target_length: record.target_length(side),
        })
    }

    /// 文件夹中待处理的工作图，按文件名排序。
    pub fn find_work_files(&self, folder: &Path) -> Result<Vec<PathBuf>, MatchError> {
        Ok(list_dxf_files(folder)?
            .into_iter()
            .filter(|path| self.naming.is_work_file(path))
            .collect())
    }

    pub fn summary(&self) -> Vec<ReferenceSummary> {
        self.records
            .values()
            .map(|record| ReferenceSummary {
                assembly: record.assembly.clone(),
                file: file_name_of(&record.path),
                outer_radius: record.outer.radius,
                outer_length: record.outer.arc_length,
                inner_radius: record.inner.radius,
                inner_length: record.inner.arc_length,
                difference: record.outer.arc_length - record.inner.arc_length,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;
    use unfold_config::NamingConfig;
    use unfold_core::geometry::Point2;

    fn registry() -> ReferenceRegistry {
        ReferenceRegistry::new(NamingConvention::new(&NamingConfig::default()).unwrap())
    }

    fn record(assembly: &str, outer: f64, inner: f64) -> ReferenceRecord {
        let arc = |length: f64| ArcMeasurement {
            radius: length,
            span_degrees: 90.0,
            arc_length: length,
        };
        ReferenceRecord {
            assembly: assembly.to_string(),
            path: PathBuf::from(format!("Основание {assembly}.dxf")),
            outer: arc(outer),
            inner: arc(inner),
        }
    }

    #[test]
    fn arcs_sort_by_radius_then_length() {
        let mut drawing = Drawing::new();
        drawing.add_arc(Point2::new(0.0, 0.0), 30.0, 0.0, PI / 2.0, "0");
        drawing.add_arc(Point2::new(0.0, 0.0), 50.0, 0.0, PI / 4.0, "0");
        drawing.add_arc(Point2::new(0.0, 0.0), 50.0, 0.0, PI, "0");
        drawing.add_circle(Point2::new(0.0, 0.0), 80.0, "0");

        let arcs = measure_arcs(&drawing);
        assert_eq!(arcs.len(), 3);
        assert_eq!(arcs[0].radius, 50.0);
        assert!((arcs[0].span_degrees - 180.0).abs() < 1e-9);
        assert!((arcs[1].arc_length - 50.0 * PI / 4.0).abs() < 1e-9);
        assert_eq!(arcs[2].radius, 30.0);
    }

    #[test]
    fn single_arc_is_insufficient() {
        let mut drawing = Drawing::new();
        drawing.add_arc(Point2::new(0.0, 0.0), 30.0, 0.0, PI, "0");
        let err = record_from_drawing("корп1".to_string(), Path::new("x.dxf"), &drawing)
            .unwrap_err();
        assert!(matches!(err, MatchError::InsufficientArcs { found: 1, .. }));
    }

    #[test]
    fn match_picks_length_by_side() {
        let mut registry = registry();
        registry.insert(record("корп1", 157.08, 89.01));

        let outer = registry
            .match_work_file(Path::new("Внешний корп1.dxf"), 150.0)
            .unwrap();
        assert_eq!(outer.side, Side::Outer);
        assert_eq!(outer.target_length, 157.08);
        assert!((outer.delta() - 7.08).abs() < 1e-9);

        let inner = registry
            .match_work_file(Path::new("Внутренний КОРП1.dxf"), 90.0)
            .unwrap();
        assert_eq!(inner.side, Side::Inner);
        assert_eq!(inner.target_length, 89.01);
    }

    #[test]
    fn unknown_assembly_reports_known_ids() {
        let mut registry = registry();
        registry.insert(record("корп2", 10.0, 5.0));
        registry.insert(record("корп1", 10.0, 5.0));

        match registry.match_work_file(Path::new("Внешний корп7.dxf"), 1.0) {
            Err(MatchError::UnknownAssembly { assembly, known }) => {
                assert_eq!(assembly, "корп7");
                assert_eq!(known, ["корп1", "корп2"]);
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn summary_reports_difference() {
        let mut registry = registry();
        registry.insert(record("корп3", 120.0, 100.0));
        let summary = registry.summary();
        assert_eq!(summary.len(), 1);
        assert_eq!(summary[0].file, "Основание корп3.dxf");
        assert!((summary[0].difference - 20.0).abs() < 1e-12);
    }
}
