use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{error, info, warn};
use unfold_core::geometry::Axis;
use unfold_engine::session::DEFAULT_OUTPUT_SUFFIX;
use unfold_engine::{Anchor, StretchSession};

use crate::errors::MatchError;
use crate::naming::Side;
use crate::registry::ReferenceRegistry;
use crate::width::{WidthCheck, check_widths};

/// 批处理参数。
#[derive(Debug, Clone, PartialEq)]
pub struct BatchOptions {
    pub axis: Axis,
    pub anchor: Anchor,
    /// 长度差低于该值视为已符合要求。
    pub min_delta: f64,
    pub tolerance: f64,
    pub output_suffix: String,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            axis: Axis::X,
            anchor: Anchor::Start,
            min_delta: 0.01,
            tolerance: 0.1,
            output_suffix: DEFAULT_OUTPUT_SUFFIX.to_string(),
        }
    }
}

/// 单轴的调整量。
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Adjustment {
    pub axis: Axis,
    pub current: f64,
    pub target: f64,
    pub delta: f64,
    pub scale: f64,
}

impl Adjustment {
    fn new(axis: Axis, current: f64, target: f64) -> Self {
        Self {
            axis,
            current,
            target,
            delta: target - current,
            scale: if current > 0.0 { target / current } else { 0.0 },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum EntryOutcome {
    Processed {
        assembly: String,
        side: Side,
        adjustments: Vec<Adjustment>,
        output: PathBuf,
    },
    Skipped {
        reason: String,
    },
    Failed {
        error: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchEntry {
    pub path: PathBuf,
    #[serde(flatten)]
    pub outcome: EntryOutcome,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BatchSummary {
    pub succeeded: usize,
    pub skipped: usize,
    pub failed: usize,
    pub entries: Vec<BatchEntry>,
    /// 长度批处理成功后复查宽度，列出超出容差的装配。
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub width_mismatches: Vec<WidthCheck>,
}

impl BatchSummary {
    fn record(&mut self, path: PathBuf, outcome: EntryOutcome) {
        match &outcome {
            EntryOutcome::Processed { output, .. } => {
                info!(path = %path.display(), output = %output.display(), "已处理");
                self.succeeded += 1;
            }
            EntryOutcome::Skipped { reason } => {
                info!(path = %path.display(), reason = %reason, "跳过");
                self.skipped += 1;
            }
            EntryOutcome::Failed { error } => {
                error!(path = %path.display(), error = %error, "处理失败");
                self.failed += 1;
            }
        }
        self.entries.push(BatchEntry { path, outcome });
    }

    pub fn total(&self) -> usize {
        self.entries.len()
    }
}

fn outcome_for_error(err: MatchError) -> EntryOutcome {
    if err.is_skip() {
        EntryOutcome::Skipped {
            reason: err.to_string(),
        }
    } else {
        EntryOutcome::Failed {
            error: err.to_string(),
        }
    }
}

/// 待处理的工作图，额外排除本次输出后缀的文件。
fn pending_work_files(
    folder: &Path,
    registry: &ReferenceRegistry,
    options: &BatchOptions,
) -> Result<Vec<PathBuf>, MatchError> {
    let suffix = options.output_suffix.as_str();
    let is_output = |path: &PathBuf| {
        !suffix.is_empty()
            && path
                .file_stem()
                .and_then(|stem| stem.to_str())
                .is_some_and(|stem| stem.ends_with(suffix))
    };
    Ok(registry
        .find_work_files(folder)?
        .into_iter()
        .filter(|path| !is_output(path))
        .collect())
}

/// 逐个工作图拉伸到参考弧长。
pub fn process_lengths(
    folder: &Path,
    registry: &ReferenceRegistry,
    options: &BatchOptions,
) -> Result<BatchSummary, MatchError> {
    let files = pending_work_files(folder, registry, options)?;
    info!(folder = %folder.display(), files = files.len(), axis = %options.axis, "开始批量长度修正");

    let mut summary = BatchSummary::default();
    let mut session = StretchSession::new().with_output_suffix(options.output_suffix.as_str());
    for path in files {
        let outcome = match process_length(&mut session, &path, registry, options) {
            Ok(outcome) => outcome,
            Err(err) => outcome_for_error(err),
        };
        summary.record(path, outcome);
    }
    if summary.succeeded > 0 {
        summary.width_mismatches = width_mismatches(folder, registry, options.tolerance);
    }
    Ok(summary)
}

/// 宽度复查失败不影响批处理结果，只记录警告。
fn width_mismatches(folder: &Path, registry: &ReferenceRegistry, tolerance: f64) -> Vec<WidthCheck> {
    match check_widths(folder, registry.naming(), tolerance) {
        Ok(report) => {
            let flagged: Vec<WidthCheck> = report.flagged().cloned().collect();
            for check in &flagged {
                warn!(
                    assembly = %check.assembly,
                    difference = check.difference.unwrap_or_default(),
                    tolerance,
                    "内外侧宽度不一致"
                );
            }
            flagged
        }
        Err(err) => {
            warn!(folder = %folder.display(), error = %err, "宽度复查失败");
            Vec::new()
        }
    }
}

fn process_length(
    session: &mut StretchSession,
    path: &Path,
    registry: &ReferenceRegistry,
    options: &BatchOptions,
) -> Result<EntryOutcome, MatchError> {
    let info = session.load(path)?;
    let item = registry.match_work_file(path, info.size(options.axis))?;
    if item.delta().abs() < options.min_delta {
        return Ok(EntryOutcome::Skipped {
            reason: format!(
                "{} already matches {:.3} (delta {:.4})",
                options.axis,
                item.target_length,
                item.delta()
            ),
        });
    }

    let outcome = session.stretch(item.target_length, options.axis, options.anchor)?;
    let output = session.save(&outcome, None)?;
    Ok(EntryOutcome::Processed {
        assembly: item.assembly,
        side: item.side,
        adjustments: vec![Adjustment::new(
            options.axis,
            item.current_length,
            item.target_length,
        )],
        output,
    })
}

/// 长度取参考弧长，宽度取同装配基准侧工作图的宽度，每个文件一次双轴拉伸。
pub fn process_both_axes(
    folder: &Path,
    registry: &ReferenceRegistry,
    width_reference: Side,
    options: &BatchOptions,
) -> Result<BatchSummary, MatchError> {
    let widths = check_widths(folder, registry.naming(), options.tolerance)?;
    let reference_widths: HashMap<String, f64> = widths
        .checks
        .iter()
        .filter(|check| check.has_both())
        .filter_map(|check| {
            check
                .width(width_reference)
                .map(|width| (check.assembly.clone(), width))
        })
        .collect();
    for skipped in &widths.skipped {
        warn!(path = %skipped.path.display(), reason = %skipped.reason, "宽度基准不可用");
    }

    let files = pending_work_files(folder, registry, options)?;
    info!(
        folder = %folder.display(),
        files = files.len(),
        reference = %width_reference,
        "开始批量双轴修正"
    );

    let mut summary = BatchSummary::default();
    let mut session = StretchSession::new().with_output_suffix(options.output_suffix.as_str());
    for path in files {
        let outcome = match process_both(&mut session, &path, registry, &reference_widths, options)
        {
            Ok(outcome) => outcome,
            Err(err) => outcome_for_error(err),
        };
        summary.record(path, outcome);
    }
    Ok(summary)
}

fn process_both(
    session: &mut StretchSession,
    path: &Path,
    registry: &ReferenceRegistry,
    reference_widths: &HashMap<String, f64>,
    options: &BatchOptions,
) -> Result<EntryOutcome, MatchError> {
    let info = session.load(path)?;
    let item = registry.match_work_file(path, info.length_x)?;
    let current_width = info.width_y;
    let target_width = reference_widths
        .get(&item.assembly)
        .copied()
        .unwrap_or(current_width);

    let length = Adjustment::new(Axis::X, item.current_length, item.target_length);
    let width = Adjustment::new(Axis::Y, current_width, target_width);
    if length.delta.abs() < options.min_delta && width.delta.abs() < options.min_delta {
        return Ok(EntryOutcome::Skipped {
            reason: format!(
                "length {:.3} and width {:.3} already match",
                item.target_length, target_width
            ),
        });
    }

    let outcome = session.stretch_both(
        item.target_length,
        target_width,
        options.anchor,
        options.anchor,
    )?;
    let output = session.save(&outcome, None)?;
    Ok(EntryOutcome::Processed {
        assembly: item.assembly,
        side: item.side,
        adjustments: vec![length, width],
        output,
    })
}
