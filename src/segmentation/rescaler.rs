use std::borrow::Cow;
use std::time::Instant;

use ndarray::{ArrayD, ArrayViewD, Axis};
use serde::{Deserialize, Serialize};

use crate::commands::{
    DEFAULT_HIGH_PERCENTILE, DEFAULT_LOW_PERCENTILE, LabelSummary, OpsError, percentile_normalize,
    resample_linear, resample_nearest, select_channel, zoom_shape,
};
use crate::model::{AxisKind, AxisMap};

use super::{
    CancellationToken, ModelCatalog, ModelExpectedSize, Predictor, PredictorLoader, ProgressSink,
    Result, ScaleFactors, ScaleRatios, SegmentationConfig, SegmentationError,
};

/// Instance labels together with the axes they are laid out on.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelVolume {
    pub labels: ArrayD<u32>,
    pub axes: AxisMap,
}

impl LabelVolume {
    pub fn shape(&self) -> &[usize] {
        self.labels.shape()
    }

    pub fn summary(&self) -> LabelSummary {
        LabelSummary::of(&self.labels)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameSummary {
    pub timepoint: Option<usize>,
    pub input_shape: Vec<usize>,
    pub scaled_shape: Vec<usize>,
    pub factors: Vec<f64>,
    pub object_count: usize,
    pub max_label: u32,
    pub duration_ms: u64,
}

#[derive(Debug, Clone)]
pub struct Segmentation {
    pub masks: LabelVolume,
    pub model_name: String,
    pub expected: ModelExpectedSize,
    pub ratios: ScaleRatios,
    pub frames: Vec<FrameSummary>,
}

/// Matches a volume to the object size a model was trained on, runs the
/// model, and maps the labels back onto the input geometry.
///
/// Time points are segmented one after the other with a single predictor
/// instance, loaded once per call to [`segment`](Self::segment).
pub struct AxisAwareVolumeRescaler<'a> {
    loader: &'a dyn PredictorLoader,
    progress: &'a dyn ProgressSink,
    catalog: ModelCatalog,
    cancellation: Option<CancellationToken>,
}

impl<'a> AxisAwareVolumeRescaler<'a> {
    pub fn new(loader: &'a dyn PredictorLoader, progress: &'a dyn ProgressSink) -> Self {
        Self {
            loader,
            progress,
            catalog: ModelCatalog,
            cancellation: None,
        }
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    pub fn segment(
        &self,
        volume: &ArrayD<f32>,
        axes: &AxisMap,
        config: &SegmentationConfig,
    ) -> Result<Segmentation> {
        let started = Instant::now();
        let deadline = config.timeout.map(|timeout| started + timeout);
        config.validate()?;
        axes.validate(volume.ndim())?;

        self.progress
            .update(&format!("Original image shape: {:?}", volume.shape()));
        self.progress.update(&format!("Axes mapping: {axes}"));

        let model_name = config.model_name();
        let expected = self.catalog.expected_size(&model_name);
        if self.catalog.find(&model_name).is_none() {
            tracing::warn!(
                model = %model_name,
                "no expected object size recorded for model, using {}x{} px",
                expected.xy,
                expected.z
            );
        }
        let ratios = ScaleRatios::new(expected, config.diameter_xy, config.diameter_z);
        self.progress.update(&format!(
            "Model expects object size: XY={}px, Z={}px",
            expected.xy, expected.z
        ));
        self.progress.update(&format!(
            "User expects object size: XY={}px, Z={}px",
            config.diameter_xy, config.diameter_z
        ));
        if let Some((xy, z)) = config.physical_diameters() {
            self.progress.update(&format!(
                "Physical object size: XY={xy:.3}, Z={z:.3}"
            ));
        }
        self.progress.update(&format!(
            "Scaling factors: XY={:.3}, Z={:.3}",
            ratios.xy, ratios.z
        ));

        let (volume, axes) = if axes.contains(AxisKind::Channel) {
            let (reduced, reduced_axes) = select_channel(volume, axes, config.target_channel)?;
            self.progress.update(&format!(
                "Selected channel {}, new shape: {:?}",
                config.target_channel,
                reduced.shape()
            ));
            (Cow::Owned(reduced), reduced_axes)
        } else {
            (Cow::Borrowed(volume), axes.clone())
        };

        self.progress
            .update(&format!("Loading model: {model_name}"));
        let mut predictor = self.loader.load(&config.model)?;

        let (labels, frames) = match axes.get(AxisKind::Time) {
            Some(time_axis) => {
                let timepoints = volume.len_of(Axis(time_axis));
                self.progress
                    .update(&format!("Processing {timepoints} timepoints"));
                let frame_axes = axes.without(AxisKind::Time);

                let mut frame_labels = Vec::with_capacity(timepoints);
                let mut frames = Vec::with_capacity(timepoints);
                for timepoint in 0..timepoints {
                    self.check_interrupted(timepoint, deadline)?;
                    self.progress.progress(timepoint, timepoints);
                    self.progress.update(&format!(
                        "Processing timepoint {}/{timepoints}",
                        timepoint + 1
                    ));
                    let frame = volume.index_axis(Axis(time_axis), timepoint);
                    let (labels, mut summary) =
                        self.segment_frame(frame, &frame_axes, ratios, predictor.as_mut(), config)?;
                    summary.timepoint = Some(timepoint);
                    self.progress.update(&format!(
                        "Timepoint {}: detected {} objects in {} ms",
                        timepoint + 1,
                        summary.object_count,
                        summary.duration_ms
                    ));
                    frame_labels.push(labels);
                    frames.push(summary);
                }
                self.progress.progress(timepoints, timepoints);

                let views = frame_labels.iter().map(|labels| labels.view()).collect::<Vec<_>>();
                let stacked = ndarray::stack(Axis(time_axis), &views).map_err(|error| {
                    OpsError::UnsupportedLayout(format!("cannot stack timepoints: {error}"))
                })?;
                (stacked, frames)
            }
            None => {
                self.progress.update("Processing single volume");
                self.check_interrupted(0, deadline)?;
                let (labels, summary) =
                    self.segment_frame(volume.view(), &axes, ratios, predictor.as_mut(), config)?;
                self.progress.update(&format!(
                    "Detected {} objects in {} ms",
                    summary.object_count, summary.duration_ms
                ));
                (labels, vec![summary])
            }
        };

        self.progress
            .update(&format!("Mask shape: {:?}", labels.shape()));
        tracing::info!(
            model = %model_name,
            frames = frames.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "segmentation finished"
        );

        Ok(Segmentation {
            masks: LabelVolume { labels, axes },
            model_name,
            expected,
            ratios,
            frames,
        })
    }

    fn segment_frame(
        &self,
        frame: ArrayViewD<'_, f32>,
        axes: &AxisMap,
        ratios: ScaleRatios,
        predictor: &mut dyn Predictor,
        config: &SegmentationConfig,
    ) -> Result<(ArrayD<u32>, FrameSummary)> {
        let started = Instant::now();
        let input_shape = frame.shape().to_vec();
        let factors = ScaleFactors::for_axes(ratios, axes, frame.ndim());

        let scaled = if factors.is_identity() {
            frame.to_owned()
        } else {
            self.progress.update(&format!(
                "Scaling volume with factors: {:?}",
                factors.as_slice()
            ));
            let target = zoom_shape(&input_shape, factors.as_slice())?;
            resample_linear(&frame, &target)?
        };
        let scaled_shape = scaled.shape().to_vec();
        self.progress.update(&format!(
            "Scaled shape: {input_shape:?} -> {scaled_shape:?}"
        ));

        let scaled = if config.normalize {
            percentile_normalize(&scaled, DEFAULT_LOW_PERCENTILE, DEFAULT_HIGH_PERCENTILE)?
        } else {
            scaled
        };

        let predicted = predictor
            .predict_instances(scaled.view(), &config.thresholds)
            .map_err(SegmentationError::Predictor)?;
        if predicted.shape() != scaled_shape.as_slice() {
            return Err(SegmentationError::PredictionShape {
                expected: scaled_shape,
                actual: predicted.shape().to_vec(),
            });
        }
        tracing::debug!(?scaled_shape, ?input_shape, "restoring label geometry");

        let labels = if scaled_shape == input_shape {
            predicted
        } else {
            resample_nearest(&predicted, &input_shape)?
        };
        let summary = LabelSummary::of(&labels);

        Ok((
            labels,
            FrameSummary {
                timepoint: None,
                input_shape,
                scaled_shape,
                factors: factors.0,
                object_count: summary.object_count,
                max_label: summary.max_label,
                duration_ms: started.elapsed().as_millis() as u64,
            },
        ))
    }

    fn check_interrupted(&self, timepoint: usize, deadline: Option<Instant>) -> Result<()> {
        if self
            .cancellation
            .as_ref()
            .is_some_and(CancellationToken::is_cancelled)
        {
            return Err(SegmentationError::Cancelled { timepoint });
        }
        if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
            return Err(SegmentationError::DeadlineExceeded { timepoint });
        }
        Ok(())
    }
}
