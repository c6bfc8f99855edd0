use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::Result;
use serde::Serialize;
use unfold_core::geometry::Axis;
use unfold_engine::{AxisOutcome, DrawingInfo, StretchOutcome, Zone, ZoneKind};
use unfold_reference::{
    AlignmentReport, BatchSummary, DerivedOuter, EntryOutcome, ReferenceSummary, ScanSummary,
    WidthReport,
};

/// 以 JSON 或文本形式输出报告。
pub trait Report: Serialize {
    fn render_text(&self) -> String;
}

pub fn emit<R: Report>(report: &R, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
    } else {
        print!("{}", report.render_text());
    }
    Ok(())
}

#[derive(Serialize)]
pub struct MeasureReport {
    pub info: DrawingInfo,
    pub zones: BTreeMap<Axis, Vec<Zone>>,
}

impl Report for MeasureReport {
    fn render_text(&self) -> String {
        let info = &self.info;
        let mut text = format!(
            "{}\n  entities: {}\n  length (X): {:.3}  [{:.3} .. {:.3}]\n  width  (Y): {:.3}  [{:.3} .. {:.3}]\n",
            info.path.display(),
            info.entity_count,
            info.length_x,
            info.min_x,
            info.max_x,
            info.width_y,
            info.min_y,
            info.max_y,
        );
        for (axis, zones) in &self.zones {
            text.push_str(&format!("  zones {axis}:\n"));
            for zone in zones {
                let kind = match zone.kind {
                    ZoneKind::Fixed => "fixed",
                    ZoneKind::Stretch => "stretch",
                };
                text.push_str(&format!(
                    "    {kind:<8} {:>10.3} .. {:>10.3}  ({:.3})\n",
                    zone.start,
                    zone.end,
                    zone.length()
                ));
            }
        }
        text
    }
}

#[derive(Serialize)]
pub struct StretchReport {
    pub input: PathBuf,
    pub output: PathBuf,
    pub length_x: f64,
    pub width_y: f64,
    pub axes: Vec<AxisOutcome>,
}

impl StretchReport {
    pub fn new(input: &Path, output: PathBuf, outcome: StretchOutcome) -> Self {
        Self {
            input: input.to_path_buf(),
            output,
            length_x: outcome.bounds.size(Axis::X),
            width_y: outcome.bounds.size(Axis::Y),
            axes: outcome.axes,
        }
    }
}

impl Report for StretchReport {
    fn render_text(&self) -> String {
        let mut text = format!("{}\n", self.input.display());
        if self.axes.is_empty() {
            text.push_str("  already at target size\n");
        }
        for axis in &self.axes {
            text.push_str(&format!(
                "  {}: {:.3} -> {:.3} (target {:.3}, scale {:.4}, anchor {}, shift {:.4})\n",
                axis.axis, axis.original, axis.result, axis.target, axis.scale, axis.anchor, axis.shift
            ));
            let report = &axis.report;
            if !report.approximated.is_empty() {
                text.push_str(&format!(
                    "    {} unmodeled entit(ies) span several zones and were only translated\n",
                    report.approximated.len()
                ));
            }
            for skipped in &report.skipped {
                text.push_str(&format!(
                    "    skipped {} #{}: {}\n",
                    skipped.kind,
                    skipped.id.get(),
                    skipped.reason
                ));
            }
        }
        text.push_str(&format!("  saved: {}\n", self.output.display()));
        text
    }
}

#[derive(Serialize)]
pub struct ReferencesReport {
    pub scan: ScanSummary,
    pub references: Vec<ReferenceSummary>,
}

impl Report for ReferencesReport {
    fn render_text(&self) -> String {
        let mut text = format!(
            "{}: {} reference(s)\n",
            self.scan.folder.display(),
            self.references.len()
        );
        for record in &self.references {
            text.push_str(&format!(
                "  {:<10} outer R{:.3} L{:.3} | inner R{:.3} L{:.3} | diff {:.3}  ({})\n",
                record.assembly,
                record.outer_radius,
                record.outer_length,
                record.inner_radius,
                record.inner_length,
                record.difference,
                record.file
            ));
        }
        for skipped in &self.scan.skipped {
            text.push_str(&format!(
                "  skipped {}: {}\n",
                skipped.path.display(),
                skipped.reason
            ));
        }
        text
    }
}

impl Report for BatchSummary {
    fn render_text(&self) -> String {
        let mut text = String::new();
        for entry in &self.entries {
            let line = match &entry.outcome {
                EntryOutcome::Processed {
                    assembly,
                    side,
                    adjustments,
                    output,
                } => {
                    let changes: Vec<String> = adjustments
                        .iter()
                        .map(|adj| {
                            format!("{} {:.3} -> {:.3}", adj.axis, adj.current, adj.target)
                        })
                        .collect();
                    format!(
                        "ok      {} [{assembly}, {side}] {} => {}",
                        entry.path.display(),
                        changes.join(", "),
                        output.display()
                    )
                }
                EntryOutcome::Skipped { reason } => {
                    format!("skip    {}: {reason}", entry.path.display())
                }
                EntryOutcome::Failed { error } => {
                    format!("error   {}: {error}", entry.path.display())
                }
            };
            text.push_str(&line);
            text.push('\n');
        }
        text.push_str(&format!(
            "processed {}, skipped {}, failed {}\n",
            self.succeeded, self.skipped, self.failed
        ));
        for check in &self.width_mismatches {
            text.push_str(&format!(
                "width mismatch {}: outer {} inner {} diff {}\n",
                check.assembly,
                width_text(check.outer_width),
                width_text(check.inner_width),
                width_text(check.difference),
            ));
        }
        text
    }
}

fn width_text(width: Option<f64>) -> String {
    width.map_or_else(|| "-".to_string(), |width| format!("{width:.3}"))
}

impl Report for WidthReport {
    fn render_text(&self) -> String {
        let mut text = format!(
            "{} (tolerance {})\n",
            self.folder.display(),
            self.tolerance
        );
        for check in &self.checks {
            let status = if !check.has_both() {
                "single side"
            } else if check.needs_adjustment {
                "MISMATCH"
            } else {
                "ok"
            };
            text.push_str(&format!(
                "  {:<10} outer {:>10}  inner {:>10}  diff {:>8}  {status}\n",
                check.assembly,
                width_text(check.outer_width),
                width_text(check.inner_width),
                width_text(check.difference),
            ));
        }
        for skipped in &self.skipped {
            text.push_str(&format!(
                "  skipped {}: {}\n",
                skipped.path.display(),
                skipped.reason
            ));
        }
        text
    }
}

impl Report for AlignmentReport {
    fn render_text(&self) -> String {
        let mut text = self.check.render_text();
        text.push_str(&format!("reference side: {}\n", self.reference));
        for aligned in &self.aligned {
            text.push_str(&format!(
                "  {} width {:.3} -> {:.3} => {}\n",
                aligned.source.display(),
                aligned.from_width,
                aligned.to_width,
                aligned.output.display()
            ));
        }
        for failed in &self.failed {
            text.push_str(&format!(
                "  failed {}: {}\n",
                failed.path.display(),
                failed.reason
            ));
        }
        text
    }
}

impl Report for DerivedOuter {
    fn render_text(&self) -> String {
        let mut text = format!(
            "{} [{}] length {:.3} -> {:.3}\n  saved: {}\n",
            self.source.display(),
            self.assembly,
            self.current_length,
            self.target_length,
            self.output.display()
        );
        if self.is_shortened() {
            text.push_str("  warning: outer length is shorter than the inner drawing\n");
        }
        text
    }
}
