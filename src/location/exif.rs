/// EXIF GPS extraction
///
/// Pulls embedded GPS coordinates out of uploaded image bytes. GPS tags
/// store degrees/minutes/seconds as unsigned rationals with a separate
/// hemisphere reference tag; south and west become negative.
use exif::{In, Rational, Reader, Tag, Value};
use std::io::Cursor;

/// Extract a (latitude, longitude) pair from image bytes.
///
/// Returns `None` for images without EXIF data, without GPS tags, or
/// with values that don't form a valid coordinate pair. This is a
/// metadata probe, never an error.
pub fn extract_gps(data: &[u8]) -> Option<(f64, f64)> {
    let exif = Reader::new()
        .read_from_container(&mut Cursor::new(data))
        .ok()?;

    let lat = coordinate(
        &exif,
        Tag::GPSLatitude,
        Tag::GPSLatitudeRef,
        "S",
        90.0,
    )?;
    let lng = coordinate(
        &exif,
        Tag::GPSLongitude,
        Tag::GPSLongitudeRef,
        "W",
        180.0,
    )?;

    Some((lat, lng))
}

fn coordinate(
    exif: &exif::Exif,
    value_tag: Tag,
    ref_tag: Tag,
    negative_ref: &str,
    max_abs: f64,
) -> Option<f64> {
    let field = exif.get_field(value_tag, In::PRIMARY)?;
    let rationals = match &field.value {
        Value::Rational(values) => values.as_slice(),
        _ => return None,
    };

    let mut decimal = dms_to_decimal(rationals)?;

    if let Some(reference) = exif.get_field(ref_tag, In::PRIMARY) {
        let reference = reference.display_value().to_string();
        if reference.trim() == negative_ref {
            decimal = -decimal;
        }
    }

    (decimal.is_finite() && decimal.abs() <= max_abs).then_some(decimal)
}

/// Convert a degrees/minutes/seconds rational triple to decimal degrees
fn dms_to_decimal(values: &[Rational]) -> Option<f64> {
    if values.len() != 3 || values.iter().any(|r| r.denom == 0) {
        return None;
    }
    let degrees = values[0].to_f64();
    let minutes = values[1].to_f64();
    let seconds = values[2].to_f64();
    Some(degrees + minutes / 60.0 + seconds / 3600.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rational(num: u32, denom: u32) -> Rational {
        Rational { num, denom }
    }

    #[test]
    fn test_dms_to_decimal() {
        // 12° 58' 17.76" ≈ 12.9716
        let dms = [rational(12, 1), rational(58, 1), rational(1776, 100)];
        let decimal = dms_to_decimal(&dms).unwrap();
        assert!((decimal - 12.9716).abs() < 1e-4);
    }

    #[test]
    fn test_dms_rejects_wrong_arity() {
        assert_eq!(dms_to_decimal(&[rational(12, 1)]), None);
        assert_eq!(dms_to_decimal(&[]), None);
    }

    #[test]
    fn test_dms_rejects_zero_denominator() {
        let dms = [rational(12, 1), rational(58, 0), rational(17, 1)];
        assert_eq!(dms_to_decimal(&dms), None);
    }

    #[test]
    fn test_non_image_bytes_yield_none() {
        assert_eq!(extract_gps(b"definitely not a jpeg"), None);
        assert_eq!(extract_gps(&[]), None);
    }

    #[test]
    fn test_image_without_exif_yields_none() {
        // Minimal JPEG SOI/EOI with no APP1 segment
        let bare_jpeg = [0xFF, 0xD8, 0xFF, 0xD9];
        assert_eq!(extract_gps(&bare_jpeg), None);
    }
}
