use clap::Parser;
use serde::Serialize;
use serde_json::{Value, json};

use crate::model::DatasetF32;
use crate::runtime::AppContext;
use crate::workflow::SegmentationRecipe;

use super::types::{Cli, Commands, DatasetInfo, OpsCommand};

pub fn run_cli() -> Result<(), String> {
    let cli = Cli::parse();
    let app = AppContext::new(&cli.model_root);

    match cli.command {
        Commands::Info { input, layout } => {
            let dataset = app
                .io_service()
                .read(&input, &layout.layout())
                .map_err(|error| error.to_string())?;
            print_json(&dataset_info(&dataset))?;
        }
        Commands::Run {
            input,
            recipe,
            output,
            report,
            params,
            layout,
        } => {
            let dataset = app
                .io_service()
                .read(&input, &layout.layout())
                .map_err(|error| error.to_string())?;
            let mut recipe = app
                .segmentation_service()
                .load_recipe(&recipe)
                .map_err(|error| error.to_string())?;
            apply_overrides(&mut recipe, &params)?;
            let (labels, run_report) = app
                .segmentation_service()
                .run(&recipe, &dataset, None)
                .map_err(|error| error.to_string())?;
            app.io_service()
                .write_labels(&output, &labels)
                .map_err(|error| error.to_string())?;
            if let Some(report_path) = report {
                app.segmentation_service()
                    .save_report(report_path, &run_report)
                    .map_err(|error| error.to_string())?;
            }
            print_json(&run_report)?;
        }
        Commands::Models => {
            print_json(&app.segmentation_service().models())?;
        }
        Commands::Scale {
            input,
            model,
            diameter_xy,
            diameter_z,
            output,
            layout,
        } => {
            if diameter_xy < 1.0 || diameter_z < 1.0 {
                return Err("object diameters must be at least 1 pixel".to_string());
            }
            let dataset = app
                .io_service()
                .read(&input, &layout.layout())
                .map_err(|error| error.to_string())?;
            let preview = app
                .segmentation_service()
                .preview(&dataset, &model, diameter_xy, diameter_z);
            if let Some(output) = output {
                let scaled = app
                    .ops_service()
                    .execute(
                        "resample.zoom",
                        &dataset,
                        &json!({"factors": preview.factors, "order": 1}),
                    )
                    .map_err(|error| error.to_string())?;
                app.io_service()
                    .write(&output, &scaled.dataset)
                    .map_err(|error| error.to_string())?;
            }
            print_json(&preview)?;
        }
        Commands::Ops { command } => match command {
            OpsCommand::List => {
                print_json(&app.ops_service().list())?;
            }
            OpsCommand::Run {
                input,
                op,
                params,
                output,
                layout,
            } => {
                let params = serde_json::from_str::<Value>(&params)
                    .map_err(|error| format!("invalid --params JSON: {error}"))?;
                let dataset = app
                    .io_service()
                    .read(&input, &layout.layout())
                    .map_err(|error| error.to_string())?;
                let result = app
                    .ops_service()
                    .execute(&op, &dataset, &params)
                    .map_err(|error| error.to_string())?;
                if let Some(output) = &output {
                    app.io_service()
                        .write(output, &result.dataset)
                        .map_err(|error| error.to_string())?;
                }
                print_json(&json!({
                    "op": op,
                    "shape": result.dataset.shape(),
                    "measurements": result.measurements,
                    "output": output,
                }))?;
            }
        },
    }

    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<(), String> {
    println!(
        "{}",
        serde_json::to_string_pretty(value).map_err(|error| error.to_string())?
    );
    Ok(())
}

fn dataset_info(dataset: &DatasetF32) -> DatasetInfo {
    let (min, max) = dataset.min_max().unzip();
    DatasetInfo {
        shape: dataset.shape().to_vec(),
        ndim: dataset.ndim(),
        pixel_type: format!("{:?}", dataset.metadata.pixel_type),
        axes: dataset
            .metadata
            .dims
            .iter()
            .map(|dimension| dimension.axis.label().to_string())
            .collect(),
        axis_map: dataset.axis_map().to_string(),
        channel_names: dataset.metadata.channel_names.clone(),
        source: dataset
            .metadata
            .source
            .as_ref()
            .map(|path| path.display().to_string()),
        min,
        max,
    }
}

/// Applies `KEY=VALUE` overrides on top of the recipe parameters. Values
/// stay strings; the typed parse happens with the rest of the recipe.
fn apply_overrides(recipe: &mut SegmentationRecipe, overrides: &[String]) -> Result<(), String> {
    for entry in overrides {
        let (key, value) = entry
            .split_once('=')
            .ok_or_else(|| format!("parameter override `{entry}` is not KEY=VALUE"))?;
        let key = key.trim();
        if key.is_empty() {
            return Err(format!("parameter override `{entry}` has an empty key"));
        }
        recipe.set(key, value.trim());
    }
    Ok(())
}
