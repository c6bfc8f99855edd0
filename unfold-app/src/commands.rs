use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use tracing::info;
use unfold_config::AppConfig;
use unfold_core::geometry::Axis;
use unfold_engine::{Anchor, StretchSession};
use unfold_reference::{
    BatchOptions, NamingConvention, ReferenceRegistry, Side, align_widths, check_widths,
    derive_outer_from_inner, process_both_axes, process_lengths,
};

use crate::cli::Commands;
use crate::report::{MeasureReport, ReferencesReport, StretchReport, emit};

/// 命令执行所需的配置与输出方式。
pub struct RunContext {
    config: AppConfig,
    default_anchor: Anchor,
    json: bool,
}

impl RunContext {
    pub fn new(config: AppConfig, json: bool) -> Result<Self> {
        let default_anchor = config
            .stretch
            .default_anchor
            .parse::<Anchor>()
            .context("invalid stretch.default_anchor in configuration")?;
        Ok(Self {
            config,
            default_anchor,
            json,
        })
    }

    fn anchor(&self, requested: Option<Anchor>) -> Anchor {
        requested.unwrap_or(self.default_anchor)
    }

    fn naming(&self) -> Result<NamingConvention> {
        let naming = NamingConvention::new(&self.config.naming)
            .context("invalid naming markers in configuration")?;
        Ok(naming.with_processed_suffix(self.config.stretch.output_suffix.as_str()))
    }

    fn session(&self) -> StretchSession {
        StretchSession::new().with_output_suffix(self.config.stretch.output_suffix.as_str())
    }

    fn batch_options(&self, axis: Axis, anchor: Option<Anchor>, tolerance: Option<f64>) -> BatchOptions {
        BatchOptions {
            axis,
            anchor: self.anchor(anchor),
            min_delta: self.config.stretch.min_batch_delta,
            tolerance: tolerance.unwrap_or(self.config.width.tolerance),
            output_suffix: self.config.stretch.output_suffix.clone(),
        }
    }

    fn scanned_registry(&self, folder: &Path) -> Result<ReferenceRegistry> {
        let mut registry = ReferenceRegistry::new(self.naming()?);
        registry.scan_folder(folder)?;
        Ok(registry)
    }
}

/// 其他 CAD 格式需先由外部转换为 DXF。
fn ensure_dxf(path: &Path) -> Result<()> {
    let is_dxf = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("dxf"));
    if !is_dxf {
        bail!(
            "{} is not a DXF file; convert it to DXF before stretching",
            path.display()
        );
    }
    Ok(())
}

fn ensure_folder(path: &Path) -> Result<()> {
    if !path.is_dir() {
        bail!("{} is not a folder", path.display());
    }
    Ok(())
}

fn validate_tolerance(tolerance: Option<f64>) -> Result<()> {
    if let Some(value) = tolerance {
        if !(value.is_finite() && value >= 0.0) {
            bail!("tolerance must be a non-negative number, got {value}");
        }
    }
    Ok(())
}

pub fn run(command: Commands, ctx: &RunContext) -> Result<()> {
    match command {
        Commands::Measure { file, axis } => measure(ctx, &file, axis.map(Axis::from)),
        Commands::Stretch {
            file,
            target,
            axis,
            anchor,
            output,
        } => stretch(ctx, &file, target, axis.into(), anchor, output),
        Commands::StretchBoth {
            file,
            length,
            width,
            anchor_x,
            anchor_y,
            output,
        } => stretch_both(ctx, &file, length, width, anchor_x, anchor_y, output),
        Commands::References { folder } => references(ctx, &folder),
        Commands::Batch {
            folder,
            axis,
            anchor,
            both,
            width_reference,
        } => batch(
            ctx,
            &folder,
            axis.into(),
            anchor,
            both.then(|| width_reference.unwrap_or(Side::Outer)),
        ),
        Commands::CheckWidths { folder, tolerance } => check(ctx, &folder, tolerance),
        Commands::AlignWidths {
            folder,
            reference,
            anchor,
            tolerance,
        } => align(ctx, &folder, reference, anchor, tolerance),
        Commands::DeriveOuter { file, anchor } => derive(ctx, &file, anchor),
    }
}

fn measure(ctx: &RunContext, file: &Path, axis: Option<Axis>) -> Result<()> {
    ensure_dxf(file)?;
    let mut session = ctx.session();
    let info = session.load(file)?;
    let axes = match axis {
        Some(axis) => vec![axis],
        None => vec![Axis::X, Axis::Y],
    };
    let mut zones = BTreeMap::new();
    for axis in axes {
        zones.insert(axis, session.zones(axis)?.to_vec());
    }
    emit(&MeasureReport { info, zones }, ctx.json)
}

fn stretch(
    ctx: &RunContext,
    file: &Path,
    target: f64,
    axis: Axis,
    anchor: Option<Anchor>,
    output: Option<PathBuf>,
) -> Result<()> {
    ensure_dxf(file)?;
    let mut session = ctx.session();
    session.load(file)?;
    let outcome = session.stretch(target, axis, ctx.anchor(anchor))?;
    let saved = session.save(&outcome, output.as_deref())?;
    emit(&StretchReport::new(file, saved, outcome), ctx.json)
}

fn stretch_both(
    ctx: &RunContext,
    file: &Path,
    length: f64,
    width: f64,
    anchor_x: Option<Anchor>,
    anchor_y: Option<Anchor>,
    output: Option<PathBuf>,
) -> Result<()> {
    ensure_dxf(file)?;
    let mut session = ctx.session();
    session.load(file)?;
    let outcome =
        session.stretch_both(length, width, ctx.anchor(anchor_x), ctx.anchor(anchor_y))?;
    let saved = session.save(&outcome, output.as_deref())?;
    emit(&StretchReport::new(file, saved, outcome), ctx.json)
}

fn references(ctx: &RunContext, folder: &Path) -> Result<()> {
    ensure_folder(folder)?;
    let mut registry = ReferenceRegistry::new(ctx.naming()?);
    let scan = registry.scan_folder(folder)?;
    let report = ReferencesReport {
        scan,
        references: registry.summary(),
    };
    emit(&report, ctx.json)
}

fn batch(
    ctx: &RunContext,
    folder: &Path,
    axis: Axis,
    anchor: Option<Anchor>,
    width_reference: Option<Side>,
) -> Result<()> {
    ensure_folder(folder)?;
    let registry = ctx.scanned_registry(folder)?;
    let options = ctx.batch_options(axis, anchor, None);
    let summary = match width_reference {
        Some(side) => process_both_axes(folder, &registry, side, &options)?,
        None => process_lengths(folder, &registry, &options)?,
    };
    info!(
        succeeded = summary.succeeded,
        skipped = summary.skipped,
        failed = summary.failed,
        "批处理完成"
    );
    emit(&summary, ctx.json)
}

fn check(ctx: &RunContext, folder: &Path, tolerance: Option<f64>) -> Result<()> {
    ensure_folder(folder)?;
    validate_tolerance(tolerance)?;
    let tolerance = tolerance.unwrap_or(ctx.config.width.tolerance);
    let report = check_widths(folder, &ctx.naming()?, tolerance)?;
    emit(&report, ctx.json)
}

fn align(
    ctx: &RunContext,
    folder: &Path,
    reference: Side,
    anchor: Option<Anchor>,
    tolerance: Option<f64>,
) -> Result<()> {
    ensure_folder(folder)?;
    validate_tolerance(tolerance)?;
    let options = ctx.batch_options(Axis::Y, anchor, tolerance);
    let report = align_widths(folder, &ctx.naming()?, reference, &options)?;
    emit(&report, ctx.json)
}

fn derive(ctx: &RunContext, file: &Path, anchor: Option<Anchor>) -> Result<()> {
    ensure_dxf(file)?;
    let folder = match file.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let registry = ctx.scanned_registry(&folder)?;
    let derived = derive_outer_from_inner(file, &registry, ctx.anchor(anchor))
        .with_context(|| format!("cannot derive an outer drawing from {}", file.display()))?;
    emit(&derived, ctx.json)
}
