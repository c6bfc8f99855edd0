pub mod anchor;
pub mod mapping;
pub mod session;
pub mod transform;
pub mod zones;

pub use anchor::{Anchor, apply_anchor_shift};
pub use mapping::{AxisMapping, MappingSegment, build_mapping};
pub use session::{
    AxisOutcome, DrawingInfo, StretchOutcome, StretchSession, output_path_for, stretch_axis,
    stretch_both,
};
pub use transform::{SkippedEntity, TransformReport, apply_mapping};
pub use zones::{Zone, ZoneKind, segment_zones};

/// 几何平移量小于该值时视为无需处理。
pub const SHIFT_EPSILON: f64 = 1e-6;

pub mod errors {
    use std::path::PathBuf;

    use thiserror::Error;
    use unfold_core::geometry::Axis;
    use unfold_io::IoError;

    #[derive(Debug, Error)]
    pub enum EngineError {
        #[error("failed to load geometry from {path:?}: {source}")]
        GeometryLoad {
            path: PathBuf,
            #[source]
            source: IoError,
        },
        #[error("drawing {path:?} has no measurable extents")]
        EmptyExtents { path: PathBuf },
        #[error("no elastic region on axis {axis}: required delta {delta:.6} with zero stretch length")]
        NoElasticRegion { axis: Axis, delta: f64 },
        #[error("axis {axis} has zero extent, cannot reach target {target:.6}")]
        DegenerateAxis { axis: Axis, target: f64 },
        #[error("invalid target length {target}")]
        InvalidTarget { target: f64 },
        #[error("delta {delta:.6} on axis {axis} shrinks more than the elastic length {elastic:.6}")]
        ShrinkExceedsElastic { axis: Axis, delta: f64, elastic: f64 },
        #[error("no drawing is loaded")]
        NotLoaded,
        #[error("failed to save {path:?}: {source}")]
        Save {
            path: PathBuf,
            #[source]
            source: IoError,
        },
        #[error("{path:?}: {source}")]
        InFile {
            path: PathBuf,
            #[source]
            source: Box<EngineError>,
        },
    }

    impl EngineError {
        /// 附加文件路径；已带路径的错误保持原样。
        pub fn in_file(self, path: impl Into<PathBuf>) -> Self {
            match self {
                EngineError::GeometryLoad { .. }
                | EngineError::EmptyExtents { .. }
                | EngineError::Save { .. }
                | EngineError::InFile { .. } => self,
                other => EngineError::InFile {
                    path: path.into(),
                    source: Box::new(other),
                },
            }
        }

        /// 去掉文件路径包装，便于按具体原因匹配。
        pub fn root_cause(&self) -> &EngineError {
            match self {
                EngineError::InFile { source, .. } => source.root_cause(),
                other => other,
            }
        }
    }
}
