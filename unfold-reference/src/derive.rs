use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{info, warn};
use unfold_core::geometry::Axis;
use unfold_engine::{Anchor, StretchSession};

use crate::errors::MatchError;
use crate::file_name_of;
use crate::naming::Side;
use crate::registry::ReferenceRegistry;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DerivedOuter {
    pub assembly: String,
    pub source: PathBuf,
    pub output: PathBuf,
    pub current_length: f64,
    pub target_length: f64,
}

impl DerivedOuter {
    /// 目标比内侧图更短，通常意味着参考图或侧别有误。
    pub fn is_shortened(&self) -> bool {
        self.target_length < self.current_length
    }
}

/// 以内侧工作图为底稿，沿 X 拉伸到外侧弧长，另存为外侧图。
pub fn derive_outer_from_inner(
    inner_file: &Path,
    registry: &ReferenceRegistry,
    anchor: Anchor,
) -> Result<DerivedOuter, MatchError> {
    let naming = registry.naming();
    let name = file_name_of(inner_file);
    if naming.side(&name)? != Side::Inner {
        return Err(MatchError::WrongSide {
            name,
            expected: Side::Inner,
        });
    }
    let assembly = naming.assembly_id(&name)?;
    let record = registry
        .get(&assembly)
        .ok_or_else(|| MatchError::UnknownAssembly {
            assembly: assembly.clone(),
            known: registry.known_assemblies(),
        })?;
    let target_length = record.target_length(Side::Outer);

    let mut session = StretchSession::new();
    let info = session.load(inner_file)?;
    if target_length < info.length_x {
        warn!(
            path = %inner_file.display(),
            current = info.length_x,
            target = target_length,
            "外侧弧长小于内侧图长度，结果将被压缩"
        );
    }

    let outcome = session.stretch(target_length, Axis::X, anchor)?;
    let output = naming.derived_outer_path(inner_file);
    session.save(&outcome, Some(output.as_path()))?;
    info!(
        path = %inner_file.display(),
        output = %output.display(),
        assembly = %assembly,
        target = target_length,
        "已由内侧图生成外侧图"
    );

    Ok(DerivedOuter {
        assembly,
        source: inner_file.to_path_buf(),
        output,
        current_length: info.length_x,
        target_length,
    })
}
