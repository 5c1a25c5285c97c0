use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use serde::Serialize;

use crate::formats::StackLayout;
use crate::runtime::DEFAULT_MODEL_ROOT;

#[derive(Debug, Parser)]
#[command(
    name = "segscale",
    version,
    about = "Rescale volumes to a model's expected object size, segment them, and map the labels back"
)]
pub(super) struct Cli {
    /// Directory holding one sub-directory per model.
    #[arg(long, global = true, env = "SEGSCALE_MODEL_ROOT", default_value = DEFAULT_MODEL_ROOT)]
    pub(super) model_root: PathBuf,

    #[command(subcommand)]
    pub(super) command: Commands,
}

#[derive(Debug, Args)]
pub(super) struct LayoutArgs {
    /// Channels interleaved in a TIFF stack (overrides the ImageJ header).
    #[arg(long)]
    pub(super) channels: Option<usize>,
    /// Time points in a TIFF stack (overrides the ImageJ header).
    #[arg(long)]
    pub(super) frames: Option<usize>,
}

impl LayoutArgs {
    pub(super) fn layout(&self) -> StackLayout {
        StackLayout::new(self.channels, self.frames)
    }
}

#[derive(Debug, Subcommand)]
pub(super) enum Commands {
    /// Print shape, axes and value range of an image.
    Info {
        input: PathBuf,
        #[command(flatten)]
        layout: LayoutArgs,
    },
    /// Segment an image with the parameters of a recipe file.
    Run {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        recipe: PathBuf,
        #[arg(long)]
        output: PathBuf,
        #[arg(long)]
        report: Option<PathBuf>,
        /// Recipe parameter override, `KEY=VALUE`. May be repeated.
        #[arg(long = "param", value_name = "KEY=VALUE")]
        params: Vec<String>,
        #[command(flatten)]
        layout: LayoutArgs,
    },
    /// List the pretrained models and their expected object sizes.
    Models,
    /// Show the zoom factors a run would use, optionally writing the
    /// rescaled volume.
    Scale {
        #[arg(long)]
        input: PathBuf,
        #[arg(long, default_value = crate::segmentation::DEFAULT_MODEL)]
        model: String,
        #[arg(long)]
        diameter_xy: f64,
        #[arg(long)]
        diameter_z: f64,
        #[arg(long)]
        output: Option<PathBuf>,
        #[command(flatten)]
        layout: LayoutArgs,
    },
    Ops {
        #[command(subcommand)]
        command: OpsCommand,
    },
}

#[derive(Debug, Subcommand)]
pub(super) enum OpsCommand {
    List,
    Run {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        op: String,
        /// Operation parameters as a JSON object.
        #[arg(long, default_value = "{}")]
        params: String,
        #[arg(long)]
        output: Option<PathBuf>,
        #[command(flatten)]
        layout: LayoutArgs,
    },
}

#[derive(Debug, Serialize)]
pub(super) struct DatasetInfo {
    pub(super) shape: Vec<usize>,
    pub(super) ndim: usize,
    pub(super) pixel_type: String,
    pub(super) axes: Vec<String>,
    pub(super) axis_map: String,
    pub(super) channel_names: Vec<String>,
    pub(super) source: Option<String>,
    pub(super) min: Option<f32>,
    pub(super) max: Option<f32>,
}
