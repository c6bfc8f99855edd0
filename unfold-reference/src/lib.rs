//! 参考图匹配、宽度一致性检查以及按文件夹的批处理。

pub mod batch;
pub mod derive;
pub mod naming;
pub mod registry;
pub mod width;

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

pub use batch::{
    Adjustment, BatchEntry, BatchOptions, BatchSummary, EntryOutcome, process_both_axes,
    process_lengths,
};
pub use derive::{DerivedOuter, derive_outer_from_inner};
pub use naming::{NamingConvention, Side};
pub use registry::{
    ArcMeasurement, ReferenceRecord, ReferenceRegistry, ReferenceSummary, ScanSummary,
    SkippedFile, WorkItem, measure_arcs,
};
pub use width::{AlignedFile, AlignmentReport, WidthCheck, WidthReport, align_widths, check_widths};

pub mod errors {
    use std::path::PathBuf;

    use thiserror::Error;
    use unfold_engine::errors::EngineError;
    use unfold_io::IoError;

    use crate::naming::Side;

    #[derive(Debug, Error)]
    pub enum MatchError {
        #[error("reference {path:?} has {found} usable arc(s), at least 2 are required")]
        InsufficientArcs { path: PathBuf, found: usize },
        #[error("cannot parse \"{name}\": {reason}")]
        UnparsableFilename { name: String, reason: String },
        #[error("no usable reference drawings in {folder:?}")]
        NoReferencesFound { folder: PathBuf },
        #[error("no reference for assembly {assembly}; known: [{}]", .known.join(", "))]
        UnknownAssembly { assembly: String, known: Vec<String> },
        #[error("\"{name}\" is not a {expected} side drawing")]
        WrongSide { name: String, expected: Side },
        #[error("failed to load reference {path:?}: {source}")]
        Load {
            path: PathBuf,
            #[source]
            source: IoError,
        },
        #[error("failed to list folder {folder:?}: {source}")]
        Folder {
            folder: PathBuf,
            #[source]
            source: walkdir::Error,
        },
        #[error(transparent)]
        Engine(#[from] EngineError),
    }

    impl MatchError {
        /// 批处理中视为跳过而非失败的错误。
        pub fn is_skip(&self) -> bool {
            matches!(
                self,
                MatchError::UnknownAssembly { .. }
                    | MatchError::UnparsableFilename { .. }
                    | MatchError::WrongSide { .. }
            )
        }
    }
}

use errors::MatchError;

/// 列出目录下（不递归）扩展名为 dxf 的文件，按文件名排序。
pub(crate) fn list_dxf_files(folder: &Path) -> Result<Vec<PathBuf>, MatchError> {
    let mut files = Vec::new();
    for entry in WalkDir::new(folder)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|source| MatchError::Folder {
            folder: folder.to_path_buf(),
            source,
        })?;
        if entry.file_type().is_file() && has_dxf_extension(entry.path()) {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

pub(crate) fn has_dxf_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("dxf"))
}

pub(crate) fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn lists_only_top_level_dxf_files_sorted() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("b.DXF"), "").unwrap();
        fs::write(dir.path().join("a.dxf"), "").unwrap();
        fs::write(dir.path().join("notes.txt"), "").unwrap();
        fs::create_dir(dir.path().join("nested")).unwrap();
        fs::write(dir.path().join("nested").join("c.dxf"), "").unwrap();

        let names: Vec<String> = list_dxf_files(dir.path())
            .unwrap()
            .iter()
            .map(|path| file_name_of(path))
            .collect();
        assert_eq!(names, ["a.dxf", "b.DXF"]);
    }

    #[test]
    fn unknown_assembly_lists_known_ids() {
        let err = MatchError::UnknownAssembly {
            assembly: "корп9".to_string(),
            known: vec!["корп1".to_string(), "корп2".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "no reference for assembly корп9; known: [корп1, корп2]"
        );
        assert!(err.is_skip());
    }
}
