use approx::assert_abs_diff_eq;
use geojson::{FeatureCollection, Value};
use gpx_summary_wasm::converter::to_feature_collection;
use gpx_summary_wasm::options::ConvertOptions;
use gpx_summary_wasm::parser::{parse_gpx, parse_gpx_file};
use gpx_summary_wasm::summary::summarize;
use gpx_summary_wasm::{Document, DocumentError, GpxError, TimestampError, TrackAggregates};

// Sufficient tolerance for comparing meters.
const METERS_TOL: f64 = 1e-4;

fn fixture_path(path: &str) -> String {
    format!("tests/fixtures/{path}")
}

fn load_fixture(path: &str) -> String {
    std::fs::read_to_string(fixture_path(path)).unwrap()
}

fn parse_fixture(path: &str) -> Document {
    parse_gpx(&load_fixture(path)).unwrap()
}

fn convert_with_opts(doc: &Document, opts: &ConvertOptions) -> FeatureCollection {
    to_feature_collection(doc, opts).unwrap()
}

fn invalid_document(path: &str) -> DocumentError {
    match parse_gpx(&load_fixture(path)) {
        Err(GpxError::InvalidDocument(e)) => e,
        other => panic!("expected an invalid document, got {other:?}"),
    }
}

// ---- basic/ ----

#[test]
fn test_01_two_points() {
    let doc = parse_fixture("basic/01_two_points.gpx");
    assert_eq!(doc.tracks.len(), 1);
    assert_eq!(doc.point_count(), 2);

    assert_abs_diff_eq!(doc.length_2d(), 1.493_610_5, epsilon = METERS_TOL);
    assert_abs_diff_eq!(doc.length_3d(), 1.797_462_8, epsilon = METERS_TOL);

    let span = doc.time_span().unwrap();
    assert_eq!(span.start().unwrap().timestamp(), 1716018600);
    assert_eq!(span.end().unwrap().timestamp(), 1716018601);

    let bounds = doc.bounds();
    assert_eq!(bounds.min().unwrap().latitude, 63.4305);
    assert_eq!(bounds.max().unwrap().longitude, 10.39512);
}

#[test]
fn test_01_reads_from_disk() {
    let doc = parse_gpx_file(fixture_path("basic/01_two_points.gpx")).unwrap();
    assert_eq!(doc.tracks[0].name.as_deref(), Some("Two points"));
}

// ---- tracks/ ----

#[test]
fn test_02_levels_sum_up() {
    let doc = parse_fixture("tracks/02_out_and_back.gpx");
    assert_eq!(doc.name.as_deref(), Some("Out and back"));
    assert_eq!(doc.tracks.len(), 2);
    assert_eq!(doc.segments().count(), 3);

    let out = &doc.tracks[0];
    assert_eq!(out.number, Some(1));
    assert_eq!(out.track_type.as_deref(), Some("hiking"));
    assert_abs_diff_eq!(out.segments[0].length_2d(), 111.319_490_793, epsilon = METERS_TOL);
    assert_abs_diff_eq!(out.segments[1].length_2d(), 134.741_174_700, epsilon = METERS_TOL);
    assert_abs_diff_eq!(out.length_2d(), 246.060_665_493, epsilon = METERS_TOL);
    assert_abs_diff_eq!(out.length_3d(), 246.601_659_171, epsilon = METERS_TOL);

    let back = &doc.tracks[1];
    assert_abs_diff_eq!(back.length_2d(), 366.856_199_130, epsilon = METERS_TOL);
    assert_abs_diff_eq!(back.length_3d(), 367.162_730_734, epsilon = METERS_TOL);

    assert_eq!(doc.length_2d(), out.length_2d() + back.length_2d());
    assert_abs_diff_eq!(doc.length_2d(), 612.916_864_623, epsilon = METERS_TOL);
    assert_abs_diff_eq!(doc.length_3d(), 613.764_389_904, epsilon = METERS_TOL);
}

#[test]
fn test_02_time_spans_fold_offsets() {
    let doc = parse_fixture("tracks/02_out_and_back.gpx");

    let out = doc.tracks[0].time_span().unwrap();
    assert_eq!(out.start().unwrap().timestamp(), 1717228800);
    assert_eq!(out.end().unwrap().timestamp(), 1717229190);

    let back = doc.tracks[1].time_span().unwrap();
    assert_eq!(back.start().unwrap().timestamp_millis(), 1717229400250);
    assert_eq!(back.end().unwrap().timestamp(), 1717230000);

    let span = doc.time_span().unwrap();
    assert_eq!(span.start().unwrap().timestamp(), 1717228800);
    assert_eq!(span.end().unwrap().timestamp(), 1717230000);
    assert_eq!(span.duration().unwrap().num_seconds(), 1200);
}

#[test]
fn test_02_bounds() {
    let doc = parse_fixture("tracks/02_out_and_back.gpx");
    assert_eq!(doc.bounds().to_bbox(), Some([8.0, 47.0, 8.002, 47.003]));
    assert_eq!(
        doc.tracks[0].segments[1].bounds().to_bbox(),
        Some([8.001, 47.002, 8.002, 47.003])
    );
}

#[test]
fn test_02_geojson() {
    let doc = parse_fixture("tracks/02_out_and_back.gpx");
    let fc = convert_with_opts(&doc, &ConvertOptions::default());

    // Two segments out, one back.
    assert_eq!(fc.features.len(), 3);
    assert_eq!(fc.bbox, Some(vec![8.0, 47.0, 8.002, 47.003]));

    let back = fc.features[2].properties.as_ref().unwrap();
    assert_eq!(back["name"], "Back");
    assert_eq!(back["startTime"], "2024-06-01T08:10:00.250Z");
    assert_eq!(back["endTime"], "2024-06-01T08:20:00.000Z");
    let times = back["coordinateProperties"]["times"].as_array().unwrap();
    assert_eq!(times[0], "2024-06-01T08:10:00.250Z");

    let joined = convert_with_opts(
        &doc,
        &ConvertOptions {
            join_track_segments: true,
            ..Default::default()
        },
    );
    assert_eq!(joined.features.len(), 2);
    let geom = joined.features[0].geometry.as_ref().unwrap();
    match &geom.value {
        Value::MultiLineString(lines) => {
            assert_eq!(lines.len(), 2);
            assert_eq!(lines[1][1], vec![8.002, 47.003, 415.0]);
        }
        _ => panic!("Expected MultiLineString"),
    }
    let out = joined.features[0].properties.as_ref().unwrap();
    assert_abs_diff_eq!(
        out["length2d"].as_f64().unwrap(),
        246.060_665_493,
        epsilon = METERS_TOL
    );
}

#[test]
fn test_02_summary() {
    let doc = parse_fixture("tracks/02_out_and_back.gpx");
    let summary = summarize(&doc).unwrap();

    assert_eq!(summary.track_count, 2);
    assert_eq!(summary.segment_count, 3);
    assert_eq!(summary.point_count, 6);
    assert_eq!(summary.duration_seconds, Some(1200.0));
    assert_eq!(summary.start_time.as_deref(), Some("2024-06-01T08:00:00.000Z"));
    assert_eq!(summary.tracks[0].name.as_deref(), Some("Out"));
    assert_eq!(summary.tracks[1].bounds, Some([8.0, 47.0, 8.002, 47.003]));

    let json = serde_json::to_value(&summary).unwrap();
    assert_eq!(json["name"], "Out and back");
    assert_eq!(json["tracks"][1]["endTime"], "2024-06-01T08:20:00.000Z");
}

// ---- time/ ----

#[test]
fn test_03_offsets() {
    let doc = parse_fixture("time/03_offsets.gpx");
    let points = &doc.tracks[0].segments[0].points;

    let instants: Vec<i64> = points
        .iter()
        .map(|p| p.instant().unwrap().unwrap().timestamp())
        .collect();
    assert_eq!(instants, vec![1731793453, 1731854653, 1731852852]);

    let span = doc.time_span().unwrap();
    assert_eq!(span.start().unwrap().timestamp(), 1731793453);
    assert_eq!(span.end().unwrap().timestamp(), 1731854653);

    // Identical positions contribute nothing to the length.
    assert_eq!(doc.length_2d(), 0.0);
}

#[test]
fn test_04_bad_timestamp() {
    let doc = parse_fixture("time/04_bad_timestamp.gpx");

    assert_abs_diff_eq!(doc.length_2d(), 111.319_490_793, epsilon = METERS_TOL);
    assert!(!doc.bounds().is_empty());

    let err = doc.time_span().unwrap_err();
    assert_eq!(
        err,
        TimestampError::MalformedTimestamp {
            byte_range: 10..11,
            reason: gpx_summary_wasm::datetime::MalformedReason::UnexpectedCharacter {
                expected: "T"
            },
        }
    );
    let annotated = err.annotate("2024-06-01 08:01:00");
    assert!(annotated.ends_with("             ^"));

    let summary_err = summarize(&doc).unwrap_err();
    assert!(matches!(summary_err, GpxError::Timestamp(_)));

    let fc = convert_with_opts(
        &doc,
        &ConvertOptions {
            include_time: false,
            ..Default::default()
        },
    );
    assert_eq!(fc.features.len(), 1);
}

// ---- edge/ ----

#[test]
fn test_05_empty() {
    let doc = parse_fixture("edge/05_empty.gpx");
    assert_eq!(doc.name.as_deref(), Some("Nothing recorded"));
    assert_eq!(doc.tracks.len(), 1);
    assert_eq!(doc.tracks[0].segments.len(), 1);
    assert_eq!(doc.length_2d(), 0.0);
    assert_eq!(doc.length_3d(), 0.0);
    assert!(doc.bounds().is_empty());
    assert!(doc.time_span().unwrap().is_empty());

    let fc = convert_with_opts(&doc, &ConvertOptions::default());
    assert!(fc.features.is_empty());
    assert!(fc.bbox.is_none());
}

#[test]
fn test_06_not_gpx() {
    match invalid_document("edge/06_not_gpx.xml") {
        DocumentError::UnrecognizedRoot { name } => assert_eq!(name, "kml"),
        other => panic!("expected an unrecognized root, got {other:?}"),
    }
}

#[test]
fn test_07_malformed() {
    assert!(matches!(
        invalid_document("edge/07_malformed.gpx"),
        DocumentError::Xml(_)
    ));
}

#[test]
fn test_08_gpx10() {
    let doc = parse_fixture("edge/08_gpx10.gpx");
    assert_eq!(doc.name.as_deref(), Some("Legacy export"));
    let points = &doc.tracks[0].segments[0].points;
    assert_eq!(points.len(), 2);
    assert_eq!(points[0].elevation, 5.0);
    assert_eq!(points[1].elevation, 0.0);
    assert!(doc.time_span().unwrap().is_empty());
}

#[test]
fn test_missing_file() {
    let err = parse_gpx_file(fixture_path("edge/does_not_exist.gpx")).unwrap_err();
    assert!(matches!(err, GpxError::Io { .. }));
    assert!(err.to_string().contains("does_not_exist.gpx"));
}
