//! Best-effort EXIF carry-over for JPEG re-encodes.
//!
//! Re-encoding through the `image` crate drops the APP1 Exif segment. When
//! both source and output are JPEG the original segment is spliced back in
//! after the output's SOI/APP0 header.

const SOI: [u8; 2] = [0xFF, 0xD8];
const APP0: u8 = 0xE0;
const APP1: u8 = 0xE1;
const SOS: u8 = 0xDA;
const EOI: u8 = 0xD9;
const EXIF_HEADER: &[u8] = b"Exif\0\0";

/// A marker segment: `(marker, start, end)` with `end` exclusive and the
/// range covering the `FF xx` marker, length field and payload.
fn segments(jpeg: &[u8]) -> Vec<(u8, usize, usize)> {
    let mut found = Vec::new();
    if !jpeg.starts_with(&SOI) {
        return found;
    }

    let mut pos = SOI.len();
    while pos + 4 <= jpeg.len() && jpeg[pos] == 0xFF {
        let marker = jpeg[pos + 1];
        if marker == SOS || marker == EOI {
            break;
        }
        let len = u16::from_be_bytes([jpeg[pos + 2], jpeg[pos + 3]]) as usize;
        let end = pos + 2 + len;
        if len < 2 || end > jpeg.len() {
            break;
        }
        found.push((marker, pos, end));
        pos = end;
    }
    found
}

/// Returns the whole APP1 Exif segment (marker included) if present.
pub fn extract_exif_segment(jpeg: &[u8]) -> Option<&[u8]> {
    segments(jpeg)
        .into_iter()
        .find(|&(marker, start, end)| marker == APP1 && jpeg[start + 4..end].starts_with(EXIF_HEADER))
        .map(|(_, start, end)| &jpeg[start..end])
}

fn is_valid_exif(segment: &[u8]) -> bool {
    let tiff = segment[4 + EXIF_HEADER.len()..].to_vec();
    ::exif::Reader::new().read_raw(tiff).is_ok()
}

/// Copies the Exif segment of `source` into `target`.
///
/// Returns `None` when there is nothing to carry: `source` has no valid
/// Exif, `target` is not a JPEG, or `target` already has Exif.
pub fn carry_exif(source: &[u8], target: &[u8]) -> Option<Vec<u8>> {
    let segment = extract_exif_segment(source)?;
    if !is_valid_exif(segment) {
        tracing::warn!("source EXIF segment failed to parse; not preserving it");
        return None;
    }
    if !target.starts_with(&SOI) || extract_exif_segment(target).is_some() {
        return None;
    }

    let insert_at = segments(target)
        .first()
        .filter(|&&(marker, _, _)| marker == APP0)
        .map(|&(_, _, end)| end)
        .unwrap_or(SOI.len());

    let mut out = Vec::with_capacity(target.len() + segment.len());
    out.extend_from_slice(&target[..insert_at]);
    out.extend_from_slice(segment);
    out.extend_from_slice(&target[insert_at..]);
    Some(out)
}
