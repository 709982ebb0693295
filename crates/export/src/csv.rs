//! CSV marker export.
//!
//! Rows are tab-delimited in a fixed column order and encoded as UTF-16LE
//! with a byte-order mark and CRLF line endings, the dialect spreadsheet
//! applications expect from this file's consumers. Quoting follows RFC
//! 4180 but is applied selectively: only fields carrying a tab, line
//! break, or quote are wrapped, with embedded quotes doubled.

use std::borrow::Cow;
use std::io::{self, Write};

use byteorder::{LittleEndian, WriteBytesExt};
use lc_common::{format_timecode, Rational, TickTime};
use lc_marker::Marker;

/// One export row, one marker.
#[derive(Clone, Debug)]
pub struct MarkerRow {
    pub asset_name: String,
    pub bin_path: String,
    pub marker_name: String,
    pub comment: String,
    pub in_point: TickTime,
    pub out_point: TickTime,
    pub marker_type: String,
    /// Tag names joined with `", "`.
    pub tags: String,
    pub media_path: String,
    /// Relative thumbnail reference, set when thumbnails are exported
    /// alongside. Ignored by the CSV writer.
    pub thumbnail: Option<String>,
}

impl MarkerRow {
    /// Builds a row from a marker and the asset it belongs to.
    pub fn from_marker(
        asset_name: &str,
        bin_path: &str,
        media_path: &str,
        marker: &Marker,
    ) -> MarkerRow {
        let tags: Vec<&str> = marker.tag_values().map(|tag| tag.name.as_str()).collect();
        MarkerRow {
            asset_name: asset_name.into(),
            bin_path: bin_path.into(),
            marker_name: marker.name.clone(),
            comment: marker.comment.clone(),
            in_point: marker.start(),
            out_point: marker.end(),
            marker_type: marker.marker_type.clone(),
            tags: tags.join(", "),
            media_path: media_path.into(),
            thumbnail: None,
        }
    }

    pub fn duration(&self) -> TickTime {
        self.out_point - self.in_point
    }
}

const HEADER: [&str; 10] = [
    "Asset Name",
    "Bin Path",
    "Marker Name",
    "Comment",
    "In",
    "Out",
    "Duration",
    "Type",
    "Tags",
    "Media Path",
];

/// Writes the header and one line per row to `w` as UTF-16LE with a BOM.
/// Time columns render as `HH:MM:SS:FF` timecode at `frame_rate`.
pub fn write_marker_csv<W: Write>(
    w: &mut W,
    rows: &[MarkerRow],
    frame_rate: Rational,
) -> io::Result<()> {
    w.write_u16::<LittleEndian>(0xFEFF)?;
    write_line(w, &HEADER)?;
    for row in rows {
        let in_tc = format_timecode(row.in_point, frame_rate);
        let out_tc = format_timecode(row.out_point, frame_rate);
        let duration_tc = format_timecode(row.duration(), frame_rate);
        let fields = [
            row.asset_name.as_str(),
            row.bin_path.as_str(),
            row.marker_name.as_str(),
            row.comment.as_str(),
            in_tc.as_str(),
            out_tc.as_str(),
            duration_tc.as_str(),
            row.marker_type.as_str(),
            row.tags.as_str(),
            row.media_path.as_str(),
        ];
        write_line(w, &fields)?;
    }
    Ok(())
}

fn write_line<W: Write>(w: &mut W, fields: &[&str]) -> io::Result<()> {
    for (index, field) in fields.iter().enumerate() {
        if index > 0 {
            write_utf16(w, "\t")?;
        }
        write_utf16(w, &quote_field(field))?;
    }
    write_utf16(w, "\r\n")
}

fn write_utf16<W: Write>(w: &mut W, text: &str) -> io::Result<()> {
    for unit in text.encode_utf16() {
        w.write_u16::<LittleEndian>(unit)?;
    }
    Ok(())
}

/// Quotes only when the field carries a delimiter, line break, or quote.
fn quote_field(field: &str) -> Cow<'_, str> {
    if !field.contains(['\t', '\r', '\n', '"']) {
        return Cow::Borrowed(field);
    }
    let mut quoted = String::with_capacity(field.len() + 2);
    quoted.push('"');
    for ch in field.chars() {
        if ch == '"' {
            quoted.push('"');
        }
        quoted.push(ch);
    }
    quoted.push('"');
    Cow::Owned(quoted)
}
