use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::rc::Rc;
use std::time::Duration;

use ndarray::{Array, ArrayD, ArrayViewD, IxDyn};
use serde_json::{Value, json};
use tempfile::tempdir;

use crate::commands::OpsError;
use crate::model::{AxisKind, AxisMap};

use super::{
    AxisAwareVolumeRescaler, CancellationToken, ConfigError, LabelVolume, MASKS_OUTPUT,
    ModelCatalog, ModelExpectedSize, ModelSource, Predictor, PredictorError, PredictorLoader,
    RecordingProgress, ScaleFactors, ScaleRatios, SegmentationConfig, SegmentationError,
    TaskOutputs, ThresholdModelLoader, Thresholds, TracingProgress,
};

type Seen = Rc<RefCell<Vec<Vec<usize>>>>;

/// Marks the first voxel and the centre voxel of every input.
struct MarkerPredictor {
    seen: Seen,
}

impl Predictor for MarkerPredictor {
    fn predict_instances(
        &mut self,
        volume: ArrayViewD<'_, f32>,
        _thresholds: &Thresholds,
    ) -> Result<ArrayD<u32>, PredictorError> {
        self.seen.borrow_mut().push(volume.shape().to_vec());
        let mut labels = ArrayD::<u32>::zeros(volume.raw_dim());
        let centre = volume.shape().iter().map(|size| size / 2).collect::<Vec<_>>();
        labels[centre.as_slice()] = 1;
        if let Some(first) = labels.iter_mut().next() {
            *first = 2;
        }
        Ok(labels)
    }
}

struct ShapeMismatchPredictor;

impl Predictor for ShapeMismatchPredictor {
    fn predict_instances(
        &mut self,
        _volume: ArrayViewD<'_, f32>,
        _thresholds: &Thresholds,
    ) -> Result<ArrayD<u32>, PredictorError> {
        Ok(ArrayD::zeros(IxDyn(&[1, 1])))
    }
}

struct FailingPredictor;

impl Predictor for FailingPredictor {
    fn predict_instances(
        &mut self,
        _volume: ArrayViewD<'_, f32>,
        _thresholds: &Thresholds,
    ) -> Result<ArrayD<u32>, PredictorError> {
        Err("model exploded".into())
    }
}

#[derive(Clone, Copy)]
enum Behaviour {
    Marker,
    WrongShape,
    Fail,
}

struct CountingLoader {
    loads: Cell<usize>,
    seen: Seen,
    behaviour: Behaviour,
}

impl CountingLoader {
    fn new(behaviour: Behaviour) -> Self {
        Self {
            loads: Cell::new(0),
            seen: Rc::default(),
            behaviour,
        }
    }

    fn seen(&self) -> Vec<Vec<usize>> {
        self.seen.borrow().clone()
    }
}

impl PredictorLoader for CountingLoader {
    fn load(&self, _model: &ModelSource) -> super::Result<Box<dyn Predictor>> {
        self.loads.set(self.loads.get() + 1);
        Ok(match self.behaviour {
            Behaviour::Marker => Box::new(MarkerPredictor {
                seen: Rc::clone(&self.seen),
            }),
            Behaviour::WrongShape => Box::new(ShapeMismatchPredictor),
            Behaviour::Fail => Box::new(FailingPredictor),
        })
    }
}

fn config(model: &str, diameter_xy: f64, diameter_z: f64) -> SegmentationConfig {
    SegmentationConfig {
        model: ModelSource::Pretrained(model.to_string()),
        diameter_xy,
        diameter_z,
        ..SegmentationConfig::default()
    }
}

fn ramp(shape: &[usize]) -> ArrayD<f32> {
    let len = shape.iter().product::<usize>();
    Array::from_shape_vec(IxDyn(shape), (0..len).map(|v| v as f32).collect())
        .expect("shape")
}

fn params(pairs: &[(&str, Value)]) -> BTreeMap<String, Value> {
    pairs
        .iter()
        .map(|(key, value)| (key.to_string(), value.clone()))
        .collect()
}

fn required_params() -> BTreeMap<String, Value> {
    params(&[
        ("prob_thresh", json!(0.5)),
        ("nms_thresh", json!(0.4)),
        ("target_channel", json!(1)),
        ("diameter_xy", json!(35)),
        ("diameter_z", json!(8)),
    ])
}

#[test]
fn confocal_ratios_follow_expected_size() {
    let expected = ModelCatalog.expected_size("confocal");
    let ratios = ScaleRatios::new(expected, 20.0, 5.0);
    assert!((ratios.xy - 1.95).abs() < 1e-12);
    assert!((ratios.z - 1.4).abs() < 1e-12);
}

#[test]
fn unknown_model_falls_back_to_default_size() {
    let catalog = ModelCatalog;
    assert!(catalog.find("unknown_model").is_none());
    assert_eq!(catalog.expected_size("unknown_model"), ModelExpectedSize::DEFAULT);
    let ratios = ScaleRatios::new(catalog.expected_size("unknown_model"), 1.0, 1.0);
    assert_eq!(ratios.xy, 35.0);
    assert_eq!(ratios.z, 8.0);
}

#[test]
fn catalog_lists_pretrained_models() {
    let names = ModelCatalog
        .pretrained()
        .iter()
        .map(|model| model.name)
        .collect::<Vec<_>>();
    assert_eq!(names, vec!["confocal", "sospim", "spinning"]);
    assert_eq!(ModelCatalog.expected_size("sospim").xy, 27.5);
}

#[test]
fn factors_only_touch_spatial_axes() {
    let ratios = ScaleRatios { xy: 2.0, z: 0.5 };
    let axes = AxisMap::from_labels([("Time", 0), ("Z", 1), ("Y", 2), ("X", 3)]);
    let factors = ScaleFactors::for_axes(ratios, &axes, 4);
    assert_eq!(factors.as_slice(), &[1.0, 0.5, 2.0, 2.0]);

    let planar = AxisMap::from_labels([("Y", 0), ("X", 1)]);
    let factors = ScaleFactors::for_axes(ratios, &planar, 2);
    assert_eq!(factors.as_slice(), &[2.0, 2.0]);
}

#[test]
fn time_series_keeps_shape_and_loads_model_once() {
    let loader = CountingLoader::new(Behaviour::Marker);
    let progress = RecordingProgress::new();
    let rescaler = AxisAwareVolumeRescaler::new(&loader, &progress);
    let volume = ramp(&[3, 5, 20, 20]);
    let axes = AxisMap::from_labels([("Time", 0), ("Z", 1), ("Y", 2), ("X", 3)]);

    let result = rescaler
        .segment(&volume, &axes, &config("confocal", 20.0, 5.0))
        .expect("segment");

    assert_eq!(loader.loads.get(), 1);
    assert_eq!(result.masks.shape(), &[3, 5, 20, 20]);
    assert_eq!(result.masks.axes, axes);
    assert_eq!(loader.seen(), vec![vec![7, 39, 39]; 3]);
    assert_eq!(result.frames.len(), 3);
    for (index, frame) in result.frames.iter().enumerate() {
        assert_eq!(frame.timepoint, Some(index));
        assert_eq!(frame.input_shape, vec![5, 20, 20]);
        assert_eq!(frame.scaled_shape, vec![7, 39, 39]);
    }
}

#[test]
fn hyperstack_scenario_drops_channel_axis() {
    let loader = CountingLoader::new(Behaviour::Marker);
    let progress = RecordingProgress::new();
    let rescaler = AxisAwareVolumeRescaler::new(&loader, &progress);
    let volume = ArrayD::<f32>::zeros(IxDyn(&[3, 2, 10, 50, 50]));
    let axes = AxisMap::from_labels([("Time", 0), ("Channel", 1), ("Z", 2), ("Y", 3), ("X", 4)]);
    let mut config = config("confocal", 39.0, 7.0);
    config.target_channel = 2;

    let result = rescaler.segment(&volume, &axes, &config).expect("segment");

    assert_eq!(result.masks.shape(), &[3, 10, 50, 50]);
    assert_eq!(
        result.masks.axes,
        AxisMap::from_labels([("Time", 0), ("Z", 1), ("Y", 2), ("X", 3)])
    );
    assert!(result.ratios.is_identity());
    assert_eq!(loader.seen(), vec![vec![10, 50, 50]; 3]);
}

#[test]
fn time_axis_after_z_is_renumbered_per_frame() {
    let loader = CountingLoader::new(Behaviour::Marker);
    let progress = RecordingProgress::new();
    let rescaler = AxisAwareVolumeRescaler::new(&loader, &progress);
    let volume = ramp(&[5, 3, 2, 20, 20]);
    let axes = AxisMap::from_labels([("Z", 0), ("Time", 1), ("Channel", 2), ("Y", 3), ("X", 4)]);
    let mut config = config("confocal", 20.0, 5.0);
    config.target_channel = 2;

    let result = rescaler.segment(&volume, &axes, &config).expect("segment");

    assert_eq!(loader.loads.get(), 1);
    assert_eq!(result.masks.shape(), &[5, 3, 20, 20]);
    assert_eq!(
        result.masks.axes,
        AxisMap::from_labels([("Z", 0), ("Time", 1), ("Y", 2), ("X", 3)])
    );
    assert_eq!(loader.seen(), vec![vec![7, 39, 39]; 3]);
    for (timepoint, frame) in result.frames.iter().enumerate() {
        assert_eq!(frame.timepoint, Some(timepoint));
        assert_eq!(frame.input_shape, vec![5, 20, 20]);
        assert_eq!(result.masks.labels[[0, timepoint, 0, 0]], 2);
    }
}

#[test]
fn out_of_range_channel_fails_before_loading() {
    let loader = CountingLoader::new(Behaviour::Marker);
    let progress = RecordingProgress::new();
    let rescaler = AxisAwareVolumeRescaler::new(&loader, &progress);
    let volume = ArrayD::<f32>::zeros(IxDyn(&[2, 8, 8]));
    let axes = AxisMap::from_labels([("Channel", 0), ("Y", 1), ("X", 2)]);
    let mut config = config("confocal", 39.0, 7.0);
    config.target_channel = 5;

    let error = rescaler.segment(&volume, &axes, &config).expect_err("channel");

    assert!(matches!(
        error,
        SegmentationError::Ops(OpsError::ChannelOutOfRange {
            requested: 5,
            available: 2
        })
    ));
    assert_eq!(loader.loads.get(), 0);
}

#[test]
fn restored_labels_come_from_the_prediction() {
    let loader = CountingLoader::new(Behaviour::Marker);
    let progress = RecordingProgress::new();
    let rescaler = AxisAwareVolumeRescaler::new(&loader, &progress);
    let volume = ramp(&[6, 17, 23]);
    let axes = AxisMap::from_labels([("Z", 0), ("Y", 1), ("X", 2)]);

    let result = rescaler
        .segment(&volume, &axes, &config("spinning", 60.0, 3.0))
        .expect("segment");

    assert_eq!(result.masks.shape(), &[6, 17, 23]);
    let labels = result.masks.labels.iter().copied().collect::<BTreeSet<_>>();
    assert!(labels.is_subset(&BTreeSet::from([0, 1, 2])));
    assert_eq!(result.frames[0].timepoint, None);
    assert_eq!(result.frames[0].object_count, result.masks.summary().object_count);
}

#[test]
fn unknown_model_still_segments_with_default_size() {
    let loader = CountingLoader::new(Behaviour::Marker);
    let progress = TracingProgress;
    let rescaler = AxisAwareVolumeRescaler::new(&loader, &progress);
    let volume = ramp(&[8, 16, 16]);
    let axes = AxisMap::from_labels([("Z", 0), ("Y", 1), ("X", 2)]);

    let result = rescaler
        .segment(&volume, &axes, &config("unknown_model", 35.0, 8.0))
        .expect("segment");

    assert_eq!(result.expected, ModelExpectedSize::DEFAULT);
    assert!(result.ratios.is_identity());
    assert_eq!(loader.seen(), vec![vec![8, 16, 16]]);
}

#[test]
fn prediction_with_wrong_shape_is_rejected() {
    let loader = CountingLoader::new(Behaviour::WrongShape);
    let progress = RecordingProgress::new();
    let rescaler = AxisAwareVolumeRescaler::new(&loader, &progress);
    let volume = ramp(&[4, 4]);
    let axes = AxisMap::from_labels([("Y", 0), ("X", 1)]);

    let error = rescaler
        .segment(&volume, &axes, &config("confocal", 39.0, 7.0))
        .expect_err("shape");

    assert!(matches!(error, SegmentationError::PredictionShape { .. }));
}

#[test]
fn predictor_errors_are_passed_through() {
    let loader = CountingLoader::new(Behaviour::Fail);
    let progress = RecordingProgress::new();
    let rescaler = AxisAwareVolumeRescaler::new(&loader, &progress);
    let volume = ramp(&[4, 4]);
    let axes = AxisMap::from_labels([("Y", 0), ("X", 1)]);

    let error = rescaler
        .segment(&volume, &axes, &config("confocal", 39.0, 7.0))
        .expect_err("predictor");

    assert!(matches!(error, SegmentationError::Predictor(_)));
    assert!(error.to_string().contains("model exploded"));
}

#[test]
fn cancelled_run_stops_before_first_timepoint() {
    let loader = CountingLoader::new(Behaviour::Marker);
    let progress = RecordingProgress::new();
    let token = CancellationToken::new();
    token.cancel();
    let rescaler = AxisAwareVolumeRescaler::new(&loader, &progress).with_cancellation(token);
    let volume = ramp(&[2, 4, 4]);
    let axes = AxisMap::from_labels([("Time", 0), ("Y", 1), ("X", 2)]);

    let error = rescaler
        .segment(&volume, &axes, &config("confocal", 39.0, 7.0))
        .expect_err("cancelled");

    assert!(matches!(error, SegmentationError::Cancelled { timepoint: 0 }));
    assert!(loader.seen().is_empty());
}

#[test]
fn zero_timeout_exceeds_deadline() {
    let loader = CountingLoader::new(Behaviour::Marker);
    let progress = RecordingProgress::new();
    let rescaler = AxisAwareVolumeRescaler::new(&loader, &progress);
    let volume = ramp(&[4, 4]);
    let axes = AxisMap::from_labels([("Y", 0), ("X", 1)]);
    let mut config = config("confocal", 39.0, 7.0);
    config.timeout = Some(Duration::ZERO);

    let error = rescaler
        .segment(&volume, &axes, &config)
        .expect_err("deadline");

    assert!(matches!(
        error,
        SegmentationError::DeadlineExceeded { timepoint: 0 }
    ));
}

#[test]
fn invalid_axes_are_rejected() {
    let loader = CountingLoader::new(Behaviour::Marker);
    let progress = RecordingProgress::new();
    let rescaler = AxisAwareVolumeRescaler::new(&loader, &progress);
    let volume = ramp(&[4, 4]);
    let axes = AxisMap::from_labels([("Z", 0), ("Y", 1), ("X", 2)]);

    let error = rescaler
        .segment(&volume, &axes, &config("confocal", 39.0, 7.0))
        .expect_err("axes");

    assert!(matches!(error, SegmentationError::Core(_)));
    assert_eq!(loader.loads.get(), 0);
}

#[test]
fn progress_messages_follow_the_run() {
    let loader = CountingLoader::new(Behaviour::Marker);
    let progress = RecordingProgress::new();
    let rescaler = AxisAwareVolumeRescaler::new(&loader, &progress);
    let volume = ramp(&[2, 3, 8, 8]);
    let axes = AxisMap::from_labels([("Channel", 0), ("Z", 1), ("Y", 2), ("X", 3)]);

    rescaler
        .segment(&volume, &axes, &config("confocal", 39.0, 7.0))
        .expect("segment");

    let messages = progress.messages();
    assert_eq!(messages[0], "Original image shape: [2, 3, 8, 8]");
    assert_eq!(messages[1], "Axes mapping: {Channel: 0, Z: 1, Y: 2, X: 3}");
    let position = |prefix: &str| {
        messages
            .iter()
            .position(|message| message.starts_with(prefix))
            .unwrap_or_else(|| panic!("missing message starting with {prefix:?}"))
    };
    assert!(position("Scaling factors") < position("Selected channel 1"));
    assert!(position("Selected channel 1") < position("Loading model: confocal"));
    assert!(position("Loading model") < position("Processing single volume"));
    assert_eq!(
        messages.last().map(String::as_str),
        Some("Mask shape: [3, 8, 8]")
    );
}

#[test]
fn config_requires_core_parameters() {
    for key in [
        "prob_thresh",
        "nms_thresh",
        "target_channel",
        "diameter_xy",
        "diameter_z",
    ] {
        let mut params = required_params();
        params.remove(key);
        let error = SegmentationConfig::from_params(&params).expect_err("missing");
        assert!(matches!(error, ConfigError::Missing(missing) if missing == key));
    }
}

#[test]
fn config_accepts_string_values_and_defaults() {
    let params = params(&[
        ("prob_thresh", json!(" 0.6 ")),
        ("nms_thresh", json!("0.3")),
        ("target_channel", json!("2")),
        ("diameter_xy", json!("20")),
        ("diameter_z", json!(5.5)),
        ("normalize", json!("No")),
        ("model", json!("")),
        ("pixel_size_xy", json!("0.25")),
        ("pixel_size_z", json!(2)),
    ]);
    let config = SegmentationConfig::from_params(&params).expect("config");
    assert_eq!(config.model, ModelSource::Pretrained("confocal".to_string()));
    assert!((config.thresholds.probability - 0.6).abs() < 1e-6);
    assert_eq!(config.target_channel, 2);
    assert!(!config.normalize);
    assert_eq!(config.diameter_z, 5.5);
    assert_eq!(config.physical_diameters(), Some((5.0, 11.0)));
}

#[test]
fn config_reports_the_offending_parameter() {
    let mut params = required_params();
    params.insert("prob_thresh".to_string(), json!("high"));
    let error = SegmentationConfig::from_params(&params).expect_err("parse");
    assert!(matches!(error, ConfigError::Parse { key: "prob_thresh", .. }));

    let mut params = required_params();
    params.insert("nms_thresh".to_string(), json!(1.5));
    let error = SegmentationConfig::from_params(&params).expect_err("range");
    assert!(matches!(error, ConfigError::OutOfRange { key: "nms_thresh", .. }));

    let mut params = required_params();
    params.insert("diameter_z".to_string(), json!(0.5));
    let error = SegmentationConfig::from_params(&params).expect_err("range");
    assert!(matches!(error, ConfigError::OutOfRange { key: "diameter_z", .. }));

    let mut params = required_params();
    params.insert("normalize".to_string(), json!("maybe"));
    let error = SegmentationConfig::from_params(&params).expect_err("bool");
    assert!(matches!(error, ConfigError::Parse { key: "normalize", .. }));

    let mut params = required_params();
    params.insert("target_channel".to_string(), json!(0));
    let error = SegmentationConfig::from_params(&params).expect_err("channel");
    assert!(matches!(error, ConfigError::OutOfRange { key: "target_channel", .. }));
}

#[test]
fn custom_model_must_exist_and_names_the_model() {
    let mut params = required_params();
    params.insert(
        "custom_model".to_string(),
        json!("/definitely/not/a/model/dir"),
    );
    let error = SegmentationConfig::from_params(&params).expect_err("missing model");
    assert!(matches!(error, ConfigError::CustomModelMissing(_)));

    let dir = tempdir().expect("tempdir");
    let model_dir = dir.path().join("nuclei_v2");
    fs::create_dir(&model_dir).expect("model dir");
    let mut params = required_params();
    params.insert("model".to_string(), json!("sospim"));
    params.insert(
        "custom_model".to_string(),
        json!(model_dir.display().to_string()),
    );
    let config = SegmentationConfig::from_params(&params).expect("config");
    assert_eq!(config.custom_model_path(), Some(model_dir.as_path()));
    assert_eq!(config.model_name(), "nuclei_v2");
}

#[test]
fn threshold_loader_requires_a_model_definition() {
    let dir = tempdir().expect("tempdir");
    let loader = ThresholdModelLoader::new(dir.path());
    let error = loader
        .load(&ModelSource::Pretrained("confocal".to_string()))
        .err()
        .expect("missing model");
    assert!(matches!(error, SegmentationError::ModelNotFound(_)));

    let model_dir = dir.path().join("confocal");
    fs::create_dir(&model_dir).expect("model dir");
    fs::write(model_dir.join("config.json"), "{ not json").expect("write config");
    let error = loader
        .load(&ModelSource::Pretrained("confocal".to_string()))
        .err()
        .expect("invalid model");
    assert!(matches!(error, SegmentationError::InvalidModel { .. }));
}

#[test]
fn threshold_model_drops_small_objects() {
    let dir = tempdir().expect("tempdir");
    let model_dir = dir.path().join("confocal");
    fs::create_dir(&model_dir).expect("model dir");
    fs::write(model_dir.join("config.json"), r#"{"min_voxels": 3}"#).expect("write config");
    let loader = ThresholdModelLoader::new(dir.path());
    let mut predictor = loader
        .load(&ModelSource::Pretrained("confocal".to_string()))
        .expect("load");

    let volume = Array::from_shape_vec(
        (4, 5),
        vec![
            0.9_f32, 0.9, 0.0, 0.0, 0.0, //
            0.9, 0.0, 0.0, 0.0, 0.7, //
            0.0, 0.0, 0.0, 0.0, 0.0, //
            0.0, 0.6, 0.6, 0.6, 0.0, //
        ],
    )
    .expect("shape")
    .into_dyn();
    let thresholds = Thresholds {
        probability: 0.5,
        nms: 0.4,
    };
    let labels = predictor
        .predict_instances(volume.view(), &thresholds)
        .expect("predict");

    assert_eq!(labels[[0, 0]], 1);
    assert_eq!(labels[[1, 4]], 0);
    assert_eq!(labels[[3, 2]], 2);
    assert_eq!(labels.iter().filter(|label| **label == 2).count(), 3);
}

#[test]
fn threshold_model_runs_through_the_rescaler() {
    let dir = tempdir().expect("tempdir");
    let model_dir = dir.path().join("my_model");
    fs::create_dir(&model_dir).expect("model dir");
    fs::write(model_dir.join("config.json"), "{}").expect("write config");
    let loader = ThresholdModelLoader::new(dir.path());
    let progress = RecordingProgress::new();
    let rescaler = AxisAwareVolumeRescaler::new(&loader, &progress);

    let mut volume = ArrayD::<f32>::zeros(IxDyn(&[12, 12]));
    for y in 2..5 {
        for x in 2..5 {
            volume[[y, x]] = 100.0;
            volume[[y + 6, x + 6]] = 100.0;
        }
    }
    let axes = AxisMap::from_labels([("Y", 0), ("X", 1)]);
    let mut config = config("my_model", 17.5, 8.0);
    config.normalize = false;

    let result = rescaler.segment(&volume, &axes, &config).expect("segment");

    assert_eq!(result.ratios.xy, 2.0);
    assert_eq!(result.masks.shape(), &[12, 12]);
    assert_eq!(result.frames[0].scaled_shape, vec![24, 24]);
    assert_eq!(result.masks.summary().object_count, 2);
    assert_ne!(result.masks.labels[[3, 3]], 0);
    assert_ne!(result.masks.labels[[9, 9]], result.masks.labels[[3, 3]]);
    assert_eq!(result.masks.labels[[0, 11]], 0);
}

#[test]
fn masks_are_published_under_fixed_name() {
    let mut outputs = TaskOutputs::new();
    assert!(outputs.masks().is_none());
    outputs.set_masks(LabelVolume {
        labels: ArrayD::zeros(IxDyn(&[2, 2])),
        axes: AxisMap::new().with(AxisKind::Y, 0).with(AxisKind::X, 1),
    });
    assert_eq!(outputs.names().collect::<Vec<_>>(), vec![MASKS_OUTPUT]);
    assert_eq!(outputs.masks().map(LabelVolume::shape), Some(&[2, 2][..]));
    assert!(outputs.take_masks().is_some());
    assert!(outputs.is_empty());
}
