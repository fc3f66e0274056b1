use serde::Deserialize;

/// Options for GPX to GeoJSON conversion.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConvertOptions {
    /// Include elevation as the 3rd coordinate value (default: true)
    #[serde(default = "default_true")]
    pub include_elevation: bool,

    /// Include start/end times and coordinateProperties.times, all as UTC (default: true)
    #[serde(default = "default_true")]
    pub include_time: bool,

    /// Include track name, cmt, desc, number and type (default: true)
    #[serde(default = "default_true")]
    pub include_metadata: bool,

    /// Include length2d/length3d in meters (default: true)
    #[serde(default = "default_true")]
    pub include_length: bool,

    /// Include RFC 7946 bounding boxes (default: true)
    #[serde(default = "default_true")]
    pub include_bbox: bool,

    /// Join track segments into a single MultiLineString (default: false)
    #[serde(default)]
    pub join_track_segments: bool,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            include_elevation: true,
            include_time: true,
            include_metadata: true,
            include_length: true,
            include_bbox: true,
            join_track_segments: false,
        }
    }
}

fn default_true() -> bool {
    true
}
