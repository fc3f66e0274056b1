use std::path::Path;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::datetime::TimePoint;
use crate::error::{DocumentError, GpxError, Result};
use crate::gpx_types::*;

type Parse<T> = std::result::Result<T, DocumentError>;

/// Parse a GPX XML string into a [`Document`].
///
/// Only tracks are read. Waypoints, routes and extensions are skipped, and
/// timestamps are kept as text until a time span is requested.
#[tracing::instrument(level = "debug", skip_all, fields(bytes = xml.len()))]
pub fn parse_gpx(xml: &str) -> Result<Document> {
    let mut reader = Reader::from_str(xml);
    let document = parse_document(&mut reader)?;

    tracing::debug!(
        tracks = document.tracks.len(),
        segments = document.segments().count(),
        points = document.point_count(),
        "parsed GPX document"
    );
    Ok(document)
}

/// Read and parse a GPX file from disk.
pub fn parse_gpx_file(path: impl AsRef<Path>) -> Result<Document> {
    let path = path.as_ref();
    let xml = std::fs::read_to_string(path).map_err(|source| GpxError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_gpx(&xml)
}

fn parse_document<'a>(reader: &mut Reader<&'a [u8]>) -> Parse<Document> {
    let document = loop {
        match reader.read_event()? {
            Event::Start(e) => {
                expect_root(&e)?;
                break parse_root(reader)?;
            }
            Event::Empty(e) => {
                expect_root(&e)?;
                break Document::default();
            }
            Event::Eof => return Err(DocumentError::MissingRoot),
            _ => {}
        }
    };

    // Only comments, processing instructions and whitespace may follow.
    loop {
        match reader.read_event()? {
            Event::Start(e) | Event::Empty(e) => {
                return Err(DocumentError::TrailingElement {
                    name: element_name(&e),
                });
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(document)
}

fn expect_root(e: &BytesStart<'_>) -> Parse<()> {
    if e.local_name().as_ref() == b"gpx" {
        Ok(())
    } else {
        Err(DocumentError::UnrecognizedRoot {
            name: element_name(e),
        })
    }
}

fn element_name(e: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(e.name().as_ref()).into_owned()
}

fn unexpected_eof(element: &str) -> DocumentError {
    DocumentError::UnexpectedEof {
        element: element.to_string(),
    }
}

fn skip_element<'a>(reader: &mut Reader<&'a [u8]>, e: &BytesStart<'_>) -> Parse<()> {
    reader.read_to_end(e.name())?;
    Ok(())
}

/// Parse the children of `<gpx>`.
fn parse_root<'a>(reader: &mut Reader<&'a [u8]>) -> Parse<Document> {
    let mut document = Document::default();

    loop {
        match reader.read_event()? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"trk" => document.tracks.push(parse_track(reader)?),
                b"metadata" => {
                    if let Some(name) = parse_metadata(reader)? {
                        document.name = Some(name);
                    }
                }
                // GPX 1.0 keeps the name directly under the root.
                b"name" => document.name = Some(read_text_owned(reader, &e)?),
                _ => skip_element(reader, &e)?,
            },
            Event::Empty(e) if e.local_name().as_ref() == b"trk" => {
                document.tracks.push(Track::default());
            }
            Event::End(e) if e.local_name().as_ref() == b"gpx" => break,
            Event::Eof => return Err(unexpected_eof("gpx")),
            _ => {}
        }
    }

    Ok(document)
}

/// Parse a `<metadata>` element, returning its `<name>` if any.
fn parse_metadata<'a>(reader: &mut Reader<&'a [u8]>) -> Parse<Option<String>> {
    let mut name = None;

    loop {
        match reader.read_event()? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"name" => name = Some(read_text_owned(reader, &e)?),
                _ => skip_element(reader, &e)?,
            },
            Event::End(e) if e.local_name().as_ref() == b"metadata" => break,
            Event::Eof => return Err(unexpected_eof("metadata")),
            _ => {}
        }
    }

    Ok(name)
}

/// Parse a `<trk>` element. Empty segments are kept.
fn parse_track<'a>(reader: &mut Reader<&'a [u8]>) -> Parse<Track> {
    let mut track = Track::default();

    loop {
        match reader.read_event()? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"name" => track.name = Some(read_text_owned(reader, &e)?),
                b"cmt" => track.comment = Some(read_text_owned(reader, &e)?),
                b"desc" => track.description = Some(read_text_owned(reader, &e)?),
                b"type" => track.track_type = Some(read_text_owned(reader, &e)?),
                b"number" => {
                    let text = read_text_owned(reader, &e)?;
                    track.number = text.trim().parse::<u32>().ok();
                }
                b"trkseg" => track.segments.push(parse_segment(reader)?),
                _ => skip_element(reader, &e)?,
            },
            Event::Empty(e) if e.local_name().as_ref() == b"trkseg" => {
                track.segments.push(Segment::default());
            }
            Event::End(e) if e.local_name().as_ref() == b"trk" => break,
            Event::Eof => return Err(unexpected_eof("trk")),
            _ => {}
        }
    }

    Ok(track)
}

/// Parse a `<trkseg>` element.
fn parse_segment<'a>(reader: &mut Reader<&'a [u8]>) -> Parse<Segment> {
    let mut points = Vec::new();

    loop {
        match reader.read_event()? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"trkpt" => points.push(parse_point(&e, reader)?),
                _ => skip_element(reader, &e)?,
            },
            Event::Empty(e) if e.local_name().as_ref() == b"trkpt" => {
                let (lat, lon) = parse_lat_lon(&e)?;
                points.push(GeoPoint::new(lat, lon));
            }
            Event::End(e) if e.local_name().as_ref() == b"trkseg" => break,
            Event::Eof => return Err(unexpected_eof("trkseg")),
            _ => {}
        }
    }

    Ok(Segment::new(points))
}

/// Parse lat/lon attributes from a `<trkpt>` start tag.
fn parse_lat_lon(e: &BytesStart<'_>) -> Parse<(f64, f64)> {
    let mut lat: Option<f64> = None;
    let mut lon: Option<f64> = None;

    for attr_result in e.attributes() {
        let attr = attr_result.map_err(|e| DocumentError::Xml(e.into()))?;
        let val = std::str::from_utf8(&attr.value).unwrap_or_default();
        let (slot, attribute) = match attr.key.local_name().as_ref() {
            b"lat" => (&mut lat, "lat"),
            b"lon" => (&mut lon, "lon"),
            _ => continue,
        };
        *slot = Some(val.trim().parse::<f64>().map_err(|_| {
            DocumentError::InvalidAttribute {
                element: "trkpt",
                attribute,
                value: val.to_string(),
            }
        })?);
    }

    let lat = lat.ok_or(DocumentError::MissingAttribute {
        element: "trkpt",
        attribute: "lat",
    })?;
    let lon = lon.ok_or(DocumentError::MissingAttribute {
        element: "trkpt",
        attribute: "lon",
    })?;

    Ok((lat, lon))
}

/// Parse a `<trkpt>` element and its children.
/// Called after receiving Event::Start for the point element.
fn parse_point<'a>(start: &BytesStart<'a>, reader: &mut Reader<&'a [u8]>) -> Parse<GeoPoint> {
    let (lat, lon) = parse_lat_lon(start)?;
    let mut point = GeoPoint::new(lat, lon);
    let end_name = start.name().0.to_vec();

    loop {
        match reader.read_event()? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"ele" => {
                    let text = read_text_owned(reader, &e)?;
                    match text.trim().parse::<f64>() {
                        Ok(elevation) => point.elevation = elevation,
                        Err(_) => tracing::warn!(
                            latitude = lat,
                            longitude = lon,
                            ele = %text,
                            "ignoring unparseable elevation"
                        ),
                    }
                }
                b"time" => {
                    let text = read_text_owned(reader, &e)?;
                    point.time = Some(TimePoint::from_text(text.trim()));
                }
                _ => skip_element(reader, &e)?,
            },
            Event::End(e) if e.name().0 == end_name.as_slice() => break,
            Event::Eof => return Err(unexpected_eof("trkpt")),
            _ => {}
        }
    }

    Ok(point)
}

/// Read text content of an element as an owned String.
/// Handles regular text, CDATA sections, and entity references (Event::GeneralRef).
fn read_text_owned<'a>(reader: &mut Reader<&'a [u8]>, start: &BytesStart<'_>) -> Parse<String> {
    let end_name = start.name().0.to_vec();
    let mut text = String::new();

    loop {
        match reader.read_event()? {
            Event::Text(e) => {
                text.push_str(std::str::from_utf8(e.as_ref()).unwrap_or_default());
            }
            Event::CData(e) => {
                text.push_str(std::str::from_utf8(e.as_ref()).unwrap_or_default());
            }
            Event::GeneralRef(e) => {
                if let Ok(Some(ch)) = e.resolve_char_ref() {
                    text.push(ch);
                } else {
                    match std::str::from_utf8(e.as_ref()).unwrap_or_default() {
                        "amp" => text.push('&'),
                        "lt" => text.push('<'),
                        "gt" => text.push('>'),
                        "quot" => text.push('"'),
                        "apos" => text.push('\''),
                        _ => {}
                    }
                }
            }
            Event::End(e) if e.name().0 == end_name.as_slice() => break,
            Event::Eof => return Err(unexpected_eof(&element_name(start))),
            _ => {}
        }
    }

    Ok(text)
}
