//! Container sniffing and duration probing for provider output
//!
//! Only the two containers text-to-video models emit are recognised. The
//! duration comes from the MP4 movie header (`moov/mvhd`); WebM and MP4
//! files without a readable header report zero.

const EBML_MAGIC: [u8; 4] = [0x1A, 0x45, 0xDF, 0xA3];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VideoContainer {
    Mp4,
    WebM,
}

impl VideoContainer {
    pub fn extension(self) -> &'static str {
        match self {
            VideoContainer::Mp4 => "mp4",
            VideoContainer::WebM => "webm",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            VideoContainer::Mp4 => "video/mp4",
            VideoContainer::WebM => "video/webm",
        }
    }
}

/// Identify the container from magic bytes, falling back to the declared
/// content type. `None` means the payload is not a video.
pub fn sniff_container(bytes: &[u8], content_type: Option<&str>) -> Option<VideoContainer> {
    if bytes.len() >= 8 && &bytes[4..8] == b"ftyp" {
        return Some(VideoContainer::Mp4);
    }
    if bytes.starts_with(&EBML_MAGIC) {
        return Some(VideoContainer::WebM);
    }

    let declared = content_type?.split(';').next()?.trim().to_ascii_lowercase();
    match declared.as_str() {
        "video/webm" => Some(VideoContainer::WebM),
        ct if ct.starts_with("video/") && !bytes.is_empty() => Some(VideoContainer::Mp4),
        _ => None,
    }
}

/// Playback length in seconds from the MP4 `mvhd` box, if present.
pub fn mp4_duration_secs(bytes: &[u8]) -> Option<f64> {
    let moov = find_box(bytes, b"moov")?;
    let mvhd = find_box(moov, b"mvhd")?;

    let version = *mvhd.first()?;
    let (timescale, duration) = if version == 1 {
        (read_u32(mvhd, 20)?, read_u64(mvhd, 24)?)
    } else {
        (read_u32(mvhd, 12)?, u64::from(read_u32(mvhd, 16)?))
    };

    if timescale == 0 {
        return None;
    }
    Some(duration as f64 / f64::from(timescale))
}

/// Body of the first top-level box of type `kind` within `data`.
fn find_box<'a>(data: &'a [u8], kind: &[u8; 4]) -> Option<&'a [u8]> {
    let mut offset = 0usize;
    while offset + 8 <= data.len() {
        let size32 = read_u32(data, offset)?;
        let box_type = &data[offset + 4..offset + 8];

        let (header_len, box_len) = match size32 {
            0 => (8, data.len() - offset),
            1 => (16, usize::try_from(read_u64(data, offset + 8)?).ok()?),
            n => (8, n as usize),
        };
        if box_len < header_len {
            return None;
        }
        let end = offset.checked_add(box_len)?.min(data.len());

        if box_type == kind {
            return data.get(offset + header_len..end);
        }
        offset = end;
    }
    None
}

fn read_u32(data: &[u8], at: usize) -> Option<u32> {
    let raw = data.get(at..at.checked_add(4)?)?;
    Some(u32::from_be_bytes(raw.try_into().ok()?))
}

fn read_u64(data: &[u8], at: usize) -> Option<u64> {
    let raw = data.get(at..at.checked_add(8)?)?;
    Some(u64::from_be_bytes(raw.try_into().ok()?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::test_support::tiny_mp4;

    fn mvhd_v1(timescale: u32, duration: u64) -> Vec<u8> {
        let mut body = vec![0u8; 112];
        body[0] = 1;
        body[20..24].copy_from_slice(&timescale.to_be_bytes());
        body[24..32].copy_from_slice(&duration.to_be_bytes());

        let mut mvhd = ((8 + body.len()) as u32).to_be_bytes().to_vec();
        mvhd.extend_from_slice(b"mvhd");
        mvhd.extend_from_slice(&body);

        // moov with a 64-bit largesize header
        let mut moov = 1u32.to_be_bytes().to_vec();
        moov.extend_from_slice(b"moov");
        moov.extend_from_slice(&((16 + mvhd.len()) as u64).to_be_bytes());
        moov.extend_from_slice(&mvhd);
        moov
    }

    #[test]
    fn test_sniff_by_magic_bytes() {
        assert_eq!(sniff_container(&tiny_mp4(1000, 0), None), Some(VideoContainer::Mp4));
        assert_eq!(
            sniff_container(&[0x1A, 0x45, 0xDF, 0xA3, 0x01], Some("application/json")),
            Some(VideoContainer::WebM)
        );
    }

    #[test]
    fn test_sniff_falls_back_to_content_type() {
        assert_eq!(
            sniff_container(b"opaque", Some("video/webm; codecs=vp9")),
            Some(VideoContainer::WebM)
        );
        assert_eq!(sniff_container(b"opaque", Some("video/mp4")), Some(VideoContainer::Mp4));
        assert_eq!(sniff_container(b"{\"error\":1}", Some("application/json")), None);
        assert_eq!(sniff_container(b"", Some("video/mp4")), None);
        assert_eq!(sniff_container(b"abc", None), None);
    }

    #[test]
    fn test_duration_version_0() {
        let secs = mp4_duration_secs(&tiny_mp4(1000, 5500)).unwrap();
        assert!((secs - 5.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_duration_version_1_with_largesize() {
        let mut file = vec![0, 0, 0, 16];
        file.extend_from_slice(b"ftypisom");
        file.extend_from_slice(&[0, 0, 2, 0]);
        file.extend_from_slice(&mvhd_v1(600, 2400));

        let secs = mp4_duration_secs(&file).unwrap();
        assert!((secs - 4.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_missing_or_truncated_header() {
        assert_eq!(mp4_duration_secs(b"\0\0\0\x10ftypisom\0\0\x02\0"), None);
        let mut truncated = tiny_mp4(1000, 5000);
        truncated.truncate(40);
        assert_eq!(mp4_duration_secs(&truncated), None);
        assert_eq!(mp4_duration_secs(&tiny_mp4(0, 5000)), None);
    }
}
