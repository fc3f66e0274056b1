use geojson::{Feature, FeatureCollection, Geometry, Value};
use serde_json::{Map, Value as JsonValue};

use crate::bounds::Bounds;
use crate::datetime::format_gpx_time;
use crate::error::Result;
use crate::gpx_types::*;
use crate::options::ConvertOptions;

/// Convert a parsed document to a GeoJSON FeatureCollection.
///
/// Fails only when `include_time` is set and a track holds a timestamp that
/// cannot be parsed.
pub fn to_feature_collection(doc: &Document, opts: &ConvertOptions) -> Result<FeatureCollection> {
    let mut features = Vec::new();
    for track in &doc.tracks {
        features.extend(track_to_features(track, opts)?);
    }

    Ok(FeatureCollection {
        bbox: bbox(doc.bounds(), opts),
        features,
        foreign_members: None,
    })
}

fn track_to_features(track: &Track, opts: &ConvertOptions) -> Result<Vec<Feature>> {
    let non_empty_segments: Vec<&Segment> = track
        .segments
        .iter()
        .filter(|s| !s.points.is_empty())
        .collect();

    if non_empty_segments.is_empty() {
        return Ok(Vec::new());
    }

    // Single point across all segments → Point Feature
    if track.point_count() == 1 {
        let coords = point_coords(&non_empty_segments[0].points[0], opts.include_elevation);
        let feature = track_feature(track, track, Value::Point(coords), None, opts)?;
        return Ok(vec![feature]);
    }

    let lines: Vec<&Segment> = non_empty_segments
        .into_iter()
        .filter(|s| s.points.len() >= 2)
        .collect();

    if opts.join_track_segments && lines.len() > 1 {
        let geometry = Value::MultiLineString(
            lines
                .iter()
                .map(|seg| line_coords(seg, opts.include_elevation))
                .collect(),
        );
        let mut times = None;
        if opts.include_time {
            let per_segment = lines
                .iter()
                .map(|seg| coordinate_times(&seg.points))
                .collect::<Result<Vec<_>>>()?;
            if per_segment.iter().flatten().any(|t| !t.is_null()) {
                let nested = per_segment.into_iter().map(JsonValue::Array).collect();
                times = Some(JsonValue::Array(nested));
            }
        }
        let feature = track_feature(track, track, geometry, times, opts)?;
        return Ok(vec![feature]);
    }

    // One LineString per segment, each carrying its own aggregates.
    lines
        .into_iter()
        .map(|seg| {
            let geometry = Value::LineString(line_coords(seg, opts.include_elevation));
            let mut times = None;
            if opts.include_time {
                let per_point = coordinate_times(&seg.points)?;
                if per_point.iter().any(|t| !t.is_null()) {
                    times = Some(JsonValue::Array(per_point));
                }
            }
            track_feature(track, seg, geometry, times, opts)
        })
        .collect()
}

/// Build a feature for `geometry`, taking metadata from `track` and
/// lengths, bbox and times from `source`.
fn track_feature<A: TrackAggregates>(
    track: &Track,
    source: &A,
    geometry: Value,
    coordinate_times: Option<JsonValue>,
    opts: &ConvertOptions,
) -> Result<Feature> {
    let mut props = Map::new();
    props.insert(
        "gpxType".to_string(),
        JsonValue::String("track".to_string()),
    );

    if opts.include_metadata {
        insert_optional(&mut props, "name", &track.name);
        insert_optional(&mut props, "cmt", &track.comment);
        insert_optional(&mut props, "desc", &track.description);
        insert_optional(&mut props, "type", &track.track_type);
        if let Some(n) = track.number {
            props.insert("number".to_string(), JsonValue::Number(n.into()));
        }
    }

    if opts.include_length {
        props.insert("length2d".to_string(), JsonValue::from(source.length_2d()));
        props.insert("length3d".to_string(), JsonValue::from(source.length_3d()));
    }

    if opts.include_time {
        let span = source.time_span()?;
        if let (Some(start), Some(end)) = (span.start(), span.end()) {
            props.insert("startTime".to_string(), JsonValue::String(format_gpx_time(&start)));
            props.insert("endTime".to_string(), JsonValue::String(format_gpx_time(&end)));
        }
    }

    if let Some(times) = coordinate_times {
        let mut coord_props = Map::new();
        coord_props.insert("times".to_string(), times);
        props.insert(
            "coordinateProperties".to_string(),
            JsonValue::Object(coord_props),
        );
    }

    Ok(Feature {
        bbox: bbox(source.bounds(), opts),
        geometry: Some(Geometry::new(geometry)),
        id: None,
        properties: Some(props),
        foreign_members: None,
    })
}

fn bbox(bounds: &Bounds, opts: &ConvertOptions) -> Option<Vec<f64>> {
    if !opts.include_bbox {
        return None;
    }
    bounds.to_bbox().map(Vec::from)
}

/// Build [lon, lat] or [lon, lat, ele] coordinate array.
fn point_coords(pt: &GeoPoint, include_elevation: bool) -> Vec<f64> {
    if include_elevation {
        vec![pt.longitude, pt.latitude, pt.elevation]
    } else {
        vec![pt.longitude, pt.latitude]
    }
}

fn line_coords(seg: &Segment, include_elevation: bool) -> Vec<Vec<f64>> {
    seg.points
        .iter()
        .map(|pt| point_coords(pt, include_elevation))
        .collect()
}

/// One entry per point: the instant in UTC, like `startTime`, or null.
fn coordinate_times(points: &[GeoPoint]) -> Result<Vec<JsonValue>> {
    points
        .iter()
        .map(|pt| {
            Ok(match pt.instant()? {
                Some(instant) => JsonValue::String(format_gpx_time(&instant)),
                None => JsonValue::Null,
            })
        })
        .collect()
}

fn insert_optional(props: &mut Map<String, JsonValue>, key: &str, value: &Option<String>) {
    if let Some(v) = value {
        props.insert(key.to_string(), JsonValue::String(v.clone()));
    }
}
