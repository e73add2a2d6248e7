//! Integration tests for reading time series out of experiment documents.

use kinfit_rs::document::{DocumentAccessor, EnzymeMlDocument, SpeciesRole};
use kinfit_rs::KinFitError;
use ndarray::array;
use std::io::Write;

use crate::test_helpers::fixture;

fn load() -> EnzymeMlDocument {
    EnzymeMlDocument::from_path(fixture("ldh_assay.json")).unwrap()
}

#[test]
fn test_load_from_path() {
    let doc = load();
    assert_eq!(doc.title(), "LDH NADH depletion");
    assert_eq!(doc.reaction("r0").unwrap().name, "pyruvate reduction");
    assert_eq!(doc.role_of("r0", "s3"), Some(SpeciesRole::Product));
}

#[test]
fn test_time_series_rows_are_replicates() {
    let course = load().time_series("r0", "s0").unwrap();
    assert_eq!(course.n_replicates(), 2);
    assert_eq!(course.n_points(), 4);
    assert_eq!(course.replicates().row(1).to_vec(), vec![0.0, 1.2, 1.8, 2.1]);
    assert_eq!(course.time(), &array![0.0, 1.0, 2.0, 3.0]);
}

#[test]
fn test_lookup_failures() {
    let doc = load();
    assert!(matches!(
        doc.time_series("missing", "s0"),
        Err(KinFitError::NotFound(_))
    ));
    assert!(matches!(
        doc.time_series("r1", "s2"),
        Err(KinFitError::NotFound(_))
    ));
    assert!(matches!(
        doc.time_series("r1", "s0"),
        Err(KinFitError::MalformedData(_))
    ));
}

#[test]
fn test_unsorted_times_are_rejected_as_shape_errors() {
    let json = r#"{
        "name": "bad clock",
        "reaction": [{
            "id": "r0",
            "name": "r",
            "educts": [{
                "species": "s0",
                "replicates": [{ "time": [0.0, 2.0, 1.0], "data": [1.0, 0.5, 0.7] }]
            }]
        }]
    }"#;
    let doc = EnzymeMlDocument::from_json(json).unwrap();
    assert!(matches!(
        doc.time_series("r0", "s0"),
        Err(KinFitError::InputShape(_))
    ));
}

#[test]
fn test_missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = EnzymeMlDocument::from_path(dir.path().join("absent.json")).unwrap_err();
    assert!(matches!(err, KinFitError::Io(_)));

    let path = dir.path().join("broken.json");
    let mut file = std::fs::File::create(&path).unwrap();
    file.write_all(b"{ not json").unwrap();
    let err = EnzymeMlDocument::from_path(&path).unwrap_err();
    assert!(matches!(err, KinFitError::Json(_)));
}
