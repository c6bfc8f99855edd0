use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use unfold_core::geometry::Axis;
use unfold_engine::Anchor;
use unfold_reference::Side;

/// Zone-based stretching of flat-pattern DXF drawings
#[derive(Parser)]
#[command(name = "unfold")]
#[command(about = "Stretch flat-pattern DXF drawings to reference lengths", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Configuration file (default: $UNFOLD_CONFIG, then ./config/default.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Print reports as JSON
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum AxisArg {
    X,
    Y,
}

impl From<AxisArg> for Axis {
    fn from(value: AxisArg) -> Self {
        match value {
            AxisArg::X => Axis::X,
            AxisArg::Y => Axis::Y,
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print drawing extents and stretch zones
    Measure {
        file: PathBuf,

        /// Only report this axis
        #[arg(long, value_enum, ignore_case = true)]
        axis: Option<AxisArg>,
    },

    /// Stretch one axis to a target size
    Stretch {
        file: PathBuf,

        #[arg(long)]
        target: f64,

        #[arg(long, value_enum, ignore_case = true, default_value_t = AxisArg::X)]
        axis: AxisArg,

        /// start, center or end (default from config)
        #[arg(long)]
        anchor: Option<Anchor>,

        /// Output path (default: <stem><suffix>.dxf next to the input)
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Correct length (X) and then width (Y)
    StretchBoth {
        file: PathBuf,

        #[arg(long)]
        length: f64,

        #[arg(long)]
        width: f64,

        #[arg(long)]
        anchor_x: Option<Anchor>,

        #[arg(long)]
        anchor_y: Option<Anchor>,

        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Scan reference drawings in a folder and list their arc lengths
    References { folder: PathBuf },

    /// Stretch every work drawing in a folder to its reference length
    Batch {
        folder: PathBuf,

        #[arg(long, value_enum, ignore_case = true, default_value_t = AxisArg::X)]
        axis: AxisArg,

        #[arg(long)]
        anchor: Option<Anchor>,

        /// Also align widths in the same pass
        #[arg(long)]
        both: bool,

        /// Side whose width is the target when --both is set
        #[arg(long, requires = "both")]
        width_reference: Option<Side>,
    },

    /// Compare outer and inner widths per assembly
    CheckWidths {
        folder: PathBuf,

        #[arg(long)]
        tolerance: Option<f64>,
    },

    /// Re-stretch the other side of every mismatched assembly to the reference width
    AlignWidths {
        folder: PathBuf,

        /// outer or inner
        #[arg(long)]
        reference: Side,

        #[arg(long)]
        anchor: Option<Anchor>,

        #[arg(long)]
        tolerance: Option<f64>,
    },

    /// Build an outer drawing from an inner one using the folder's references
    DeriveOuter {
        #[arg(name = "INNER_FILE")]
        file: PathBuf,

        #[arg(long)]
        anchor: Option<Anchor>,
    },
}
