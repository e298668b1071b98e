//! Minimal image fixtures.

/// Builds a little-endian TIFF whose IFD0 carries `DateTime` and, when given,
/// an Exif sub-IFD carrying `DateTimeOriginal`.
///
/// Timestamps use the EXIF layout `YYYY:MM:DD HH:MM:SS`.
#[must_use]
pub fn tiff_with_timestamps(date_time: &str, original: Option<&str>) -> Vec<u8> {
    const TAG_DATE_TIME: u16 = 0x0132;
    const TAG_EXIF_IFD: u16 = 0x8769;
    const TAG_DATE_TIME_ORIGINAL: u16 = 0x9003;
    const TYPE_ASCII: u16 = 2;
    const TYPE_LONG: u16 = 4;

    fn ascii(value: &str) -> Vec<u8> {
        let mut bytes = value.as_bytes().to_vec();
        bytes.push(0);
        if bytes.len() % 2 == 1 {
            bytes.push(0);
        }
        bytes
    }

    fn len_u32(bytes: &[u8]) -> u32 {
        u32::try_from(bytes.len()).unwrap_or(u32::MAX)
    }

    fn entry(buf: &mut Vec<u8>, tag: u16, kind: u16, count: u32, value: u32) {
        buf.extend_from_slice(&tag.to_le_bytes());
        buf.extend_from_slice(&kind.to_le_bytes());
        buf.extend_from_slice(&count.to_le_bytes());
        buf.extend_from_slice(&value.to_le_bytes());
    }

    let date_time_count = len_u32(date_time.as_bytes()) + 1;
    let date_time_data = ascii(date_time);
    let ifd0_entries: u16 = if original.is_some() { 2 } else { 1 };
    let ifd0_len = 2 + 12 * u32::from(ifd0_entries) + 4;
    let date_time_offset = 8 + ifd0_len;
    let exif_ifd_offset = date_time_offset + len_u32(&date_time_data);

    let mut buf = b"II*\0".to_vec();
    buf.extend_from_slice(&8u32.to_le_bytes());

    buf.extend_from_slice(&ifd0_entries.to_le_bytes());
    entry(&mut buf, TAG_DATE_TIME, TYPE_ASCII, date_time_count, date_time_offset);
    if original.is_some() {
        entry(&mut buf, TAG_EXIF_IFD, TYPE_LONG, 1, exif_ifd_offset);
    }
    buf.extend_from_slice(&0u32.to_le_bytes());
    buf.extend_from_slice(&date_time_data);

    if let Some(original) = original {
        let original_count = len_u32(original.as_bytes()) + 1;
        let original_data = ascii(original);
        let original_offset = exif_ifd_offset + 2 + 12 + 4;

        buf.extend_from_slice(&1u16.to_le_bytes());
        entry(
            &mut buf,
            TAG_DATE_TIME_ORIGINAL,
            TYPE_ASCII,
            original_count,
            original_offset,
        );
        buf.extend_from_slice(&0u32.to_le_bytes());
        buf.extend_from_slice(&original_data);
    }

    buf
}
