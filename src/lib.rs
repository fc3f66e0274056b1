//! GPX track parsing with lazily computed, cached aggregates.
//!
//! [`parser::parse_gpx`] builds a [`Document`] of tracks, segments and
//! points. Lengths, bounds and time spans are answered through
//! [`TrackAggregates`] at every level and computed only when first read.
//! The document can be exported as GeoJSON or summarized, both natively and
//! from JavaScript through the `wasm-bindgen` entry points below.

pub mod bounds;
pub mod converter;
pub mod datetime;
pub mod error;
pub mod geom;
pub mod gpx_types;
pub mod options;
pub mod parser;
pub mod summary;

use serde::Serialize;
use wasm_bindgen::prelude::*;

pub use crate::bounds::{Bounds, TimeSpan};
pub use crate::datetime::{parse_gpx_time, TimePoint, TimestampError};
pub use crate::error::{DocumentError, GpxError};
pub use crate::gpx_types::{Document, GeoPoint, Segment, Track, TrackAggregates};
pub use crate::options::ConvertOptions;
pub use crate::parser::{parse_gpx, parse_gpx_file};

/// Summarize a GPX string: counts, lengths, bounds and time range.
#[wasm_bindgen(js_name = gpxSummary)]
pub fn gpx_summary(gpx_string: &str) -> Result<JsValue, JsValue> {
    console_error_panic_hook::set_once();

    let doc = parser::parse_gpx(gpx_string)?;
    let summary = summary::summarize(&doc)?;
    let serializer = serde_wasm_bindgen::Serializer::json_compatible();
    summary
        .serialize(&serializer)
        .map_err(|e| JsValue::from_str(&e.to_string()))
}

/// Convert GPX string to GeoJSON, returned as a JS object.
#[wasm_bindgen(js_name = gpxToGeoJson)]
pub fn gpx_to_geojson(gpx_string: &str, options: JsValue) -> Result<JsValue, JsValue> {
    console_error_panic_hook::set_once();

    let opts = parse_options(options)?;
    let doc = parser::parse_gpx(gpx_string)?;
    let fc = converter::to_feature_collection(&doc, &opts)?;
    serde_wasm_bindgen::to_value(&fc).map_err(|e| JsValue::from_str(&e.to_string()))
}

/// Convert GPX string to GeoJSON, returned as a JSON string.
#[wasm_bindgen(js_name = gpxToGeoJsonString)]
pub fn gpx_to_geojson_string(gpx_string: &str, options: JsValue) -> Result<String, JsValue> {
    console_error_panic_hook::set_once();

    let opts = parse_options(options)?;
    let doc = parser::parse_gpx(gpx_string)?;
    let fc = converter::to_feature_collection(&doc, &opts)?;
    serde_json::to_string(&fc).map_err(|e| JsValue::from_str(&e.to_string()))
}

fn parse_options(options: JsValue) -> Result<ConvertOptions, JsValue> {
    if options.is_undefined() || options.is_null() {
        Ok(ConvertOptions::default())
    } else {
        serde_wasm_bindgen::from_value(options).map_err(|e| JsValue::from_str(&e.to_string()))
    }
}
