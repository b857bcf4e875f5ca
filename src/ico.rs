//! Icon Encoder - Single-Image ICO Container
//!
//! Wraps one PNG payload in an ICONDIR + ICONDIRENTRY header. Width and height
//! bytes are 0, which readers interpret as 256 and which also tells them the
//! payload is PNG rather than a BMP/DIB.
//!
//! ```text
//! offset  size  field
//!      0     2  reserved = 0
//!      2     2  type = 1 (icon)
//!      4     2  count = 1
//!      6     1  width = 0
//!      7     1  height = 0
//!      8     1  color count = 0
//!      9     1  reserved = 0
//!     10     2  color planes = 1
//!     12     2  bits per pixel = 32
//!     14     4  payload size
//!     18     4  payload offset = 22
//!     22     n  PNG payload
//! ```

use thiserror::Error;

/// ICONDIR length in bytes.
pub const ICONDIR_LEN: usize = 6;
/// ICONDIRENTRY length in bytes.
pub const ICONDIRENTRY_LEN: usize = 16;
/// Where the single payload starts.
pub const PAYLOAD_OFFSET: u32 = (ICONDIR_LEN + ICONDIRENTRY_LEN) as u32;

const RESOURCE_TYPE_ICON: u16 = 1;
const IMAGE_COUNT: u16 = 1;
const COLOR_PLANES: u16 = 1;
const BITS_PER_PIXEL: u16 = 32;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum IcoError {
    #[error("Empty payload: ICO image data must not be zero-length")]
    EmptyPayload,

    #[error("Payload of {0} bytes does not fit the ICO size field")]
    PayloadTooLarge(usize),
}

/// Wrap PNG bytes in a single-entry ICO container.
///
/// The PNG itself is not re-validated.
pub fn encode_ico(png: &[u8]) -> Result<Vec<u8>, IcoError> {
    if png.is_empty() {
        return Err(IcoError::EmptyPayload);
    }
    let data_size = u32::try_from(png.len())
        .ok()
        .filter(|len| len.checked_add(PAYLOAD_OFFSET).is_some())
        .ok_or(IcoError::PayloadTooLarge(png.len()))?;

    let mut out = Vec::with_capacity(PAYLOAD_OFFSET as usize + png.len());

    // ICONDIR
    out.extend_from_slice(&0u16.to_le_bytes());
    out.extend_from_slice(&RESOURCE_TYPE_ICON.to_le_bytes());
    out.extend_from_slice(&IMAGE_COUNT.to_le_bytes());

    // ICONDIRENTRY
    out.push(0); // width: 256
    out.push(0); // height: 256
    out.push(0); // no palette
    out.push(0);
    out.extend_from_slice(&COLOR_PLANES.to_le_bytes());
    out.extend_from_slice(&BITS_PER_PIXEL.to_le_bytes());
    out.extend_from_slice(&data_size.to_le_bytes());
    out.extend_from_slice(&PAYLOAD_OFFSET.to_le_bytes());

    out.extend_from_slice(png);
    Ok(out)
}

/// `<prefix>-<label-or-default>.ico`
pub fn ico_filename(prefix: &str, label: &str, default_label: &str) -> String {
    let label = label.trim();
    let stem = if label.is_empty() { default_label } else { label };
    format!("{}-{}.ico", prefix, stem)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_payload_rejected() {
        assert_eq!(encode_ico(&[]), Err(IcoError::EmptyPayload));
    }

    #[test]
    fn test_header_layout() {
        let payload = [0xAAu8; 5];
        let ico = encode_ico(&payload).unwrap();
        assert_eq!(
            ico,
            vec![
                0, 0, 1, 0, 1, 0, // ICONDIR
                0, 0, 0, 0, 1, 0, 32, 0, // dims, colors, planes, bpp
                5, 0, 0, 0, // size
                22, 0, 0, 0, // offset
                0xAA, 0xAA, 0xAA, 0xAA, 0xAA,
            ]
        );
    }

    #[test]
    fn test_ten_thousand_byte_payload() {
        let payload = vec![7u8; 10_000];
        let ico = encode_ico(&payload).unwrap();
        assert_eq!(ico.len(), 10_022);
        assert_eq!(&ico[14..18], &10_000u32.to_le_bytes());
        assert_eq!(&ico[22..], payload.as_slice());
    }

    #[test]
    fn test_filename() {
        assert_eq!(ico_filename("browser-profile", "DEV", "icon"), "browser-profile-DEV.ico");
        assert_eq!(ico_filename("browser-profile", "", "icon"), "browser-profile-icon.ico");
        assert_eq!(ico_filename("browser-profile", "  ", "icon"), "browser-profile-icon.ico");
    }
}
