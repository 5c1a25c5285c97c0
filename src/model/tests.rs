use ndarray::Array;

use super::{AxisKind, AxisMap, CoreError, Dataset, Dim, Metadata, PixelType};

#[test]
fn metadata_roundtrip_json() {
    let mut metadata = Metadata::from_shape(&[4, 5, 3], PixelType::U8);
    metadata.channel_names = vec!["R".into(), "G".into(), "B".into()];
    metadata
        .extras
        .insert("dataset".into(), serde_json::json!("synthetic"));
    let serialized = serde_json::to_string_pretty(&metadata).expect("serialize metadata");
    let restored: Metadata = serde_json::from_str(&serialized).expect("deserialize metadata");
    assert_eq!(restored, metadata);
}

#[test]
fn dataset_rejects_invalid_metadata_shape() {
    let data = Array::from_shape_vec((2, 2), vec![0.0_f32, 1.0, 2.0, 3.0])
        .expect("shape")
        .into_dyn();
    let metadata = Metadata {
        dims: vec![Dim::new(AxisKind::X, 2)],
        pixel_type: PixelType::F32,
        ..Metadata::default()
    };
    assert!(Dataset::new(data, metadata).is_err());
}

#[test]
fn dataset_exposes_axis_map() {
    let data = Array::<f32, _>::zeros((2, 3, 4)).into_dyn();
    let metadata = Metadata {
        dims: vec![
            Dim::new(AxisKind::Z, 2),
            Dim::new(AxisKind::Y, 3),
            Dim::new(AxisKind::X, 4),
        ],
        ..Metadata::default()
    };
    let dataset = Dataset::new(data, metadata).expect("dataset");
    let axes = dataset.axis_map();
    assert_eq!(axes.get(AxisKind::Z), Some(0));
    assert_eq!(axes.get(AxisKind::X), Some(2));
    assert!(!axes.contains(AxisKind::Time));
}

#[test]
fn unknown_labels_are_ignored() {
    let axes = AxisMap::from_labels([("Time", 0), ("Lambda", 1), ("Y", 2), ("X", 3)]);
    assert_eq!(axes.len(), 3);
    assert_eq!(axes.get(AxisKind::Y), Some(2));
}

#[test]
fn removing_an_axis_renumbers_later_axes() {
    let mut axes = AxisMap::new()
        .with(AxisKind::Time, 0)
        .with(AxisKind::Channel, 1)
        .with(AxisKind::Z, 2)
        .with(AxisKind::Y, 3)
        .with(AxisKind::X, 4);
    assert_eq!(axes.remove(AxisKind::Channel), Some(1));
    assert_eq!(axes.get(AxisKind::Time), Some(0));
    assert_eq!(axes.get(AxisKind::Z), Some(1));
    assert_eq!(axes.get(AxisKind::Y), Some(2));
    assert_eq!(axes.get(AxisKind::X), Some(3));
    assert!(axes.validate(4).is_ok());
}

#[test]
fn removing_a_missing_axis_is_a_noop() {
    let mut axes = AxisMap::new().with(AxisKind::Y, 0).with(AxisKind::X, 1);
    let before = axes.clone();
    assert_eq!(axes.remove(AxisKind::Channel), None);
    assert_eq!(axes, before);
}

#[test]
fn validate_rejects_out_of_range_and_duplicates() {
    let out_of_range = AxisMap::new().with(AxisKind::Y, 0).with(AxisKind::X, 2);
    assert!(matches!(
        out_of_range.validate(2),
        Err(CoreError::AxisOutOfRange { index: 2, .. })
    ));

    let duplicate = AxisMap::new().with(AxisKind::Y, 1).with(AxisKind::X, 1);
    assert!(matches!(
        duplicate.validate(2),
        Err(CoreError::DuplicateAxisIndex { index: 1, .. })
    ));
}

#[test]
fn display_lists_axes_by_position() {
    let axes = AxisMap::from_labels([("X", 2), ("Z", 0), ("Y", 1)]);
    assert_eq!(axes.to_string(), "{Z: 0, Y: 1, X: 2}");
}

#[test]
fn metadata_without_channel_drops_names() {
    let mut metadata = Metadata {
        dims: vec![
            Dim::new(AxisKind::Y, 4),
            Dim::new(AxisKind::X, 5),
            Dim::new(AxisKind::Channel, 2),
        ],
        pixel_type: PixelType::U16,
        ..Metadata::default()
    };
    metadata.channel_names = vec!["dapi".into(), "gfp".into()];
    let reduced = metadata.without_axis(AxisKind::Channel);
    assert_eq!(reduced.shape(), vec![4, 5]);
    assert!(reduced.channel_names.is_empty());
}
