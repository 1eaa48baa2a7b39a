//! WebP container detection.

/// Kind of WebP container, from the first chunk after the RIFF header.
#[non_exhaustive]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ContainerFormat {
    /// `VP8 ` chunk: simple lossy file.
    Lossy,
    /// `VP8L` chunk: simple lossless file.
    Lossless,
    /// `VP8X` chunk: extended file (alpha, animation, metadata).
    Extended,
}

impl ContainerFormat {
    /// Bytes needed by [`detect`](Self::detect): RIFF header plus one
    /// chunk tag.
    pub const HEADER_LEN: usize = 16;

    /// Detect the container from magic bytes. Returns `None` if `data` does
    /// not start with `RIFF....WEBP` followed by a known chunk tag.
    pub fn detect(data: &[u8]) -> Option<Self> {
        if data.len() < Self::HEADER_LEN || data[..4] != *b"RIFF" || data[8..12] != *b"WEBP" {
            return None;
        }
        match &data[12..16] {
            b"VP8 " => Some(Self::Lossy),
            b"VP8L" => Some(Self::Lossless),
            b"VP8X" => Some(Self::Extended),
            _ => None,
        }
    }

    /// Whether a file extension names a WebP file (case-insensitive).
    pub fn is_webp_extension(ext: &str) -> bool {
        ext.eq_ignore_ascii_case("webp")
    }

    /// Whether `path` has a WebP file extension.
    pub fn is_webp_path(path: &std::path::Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(Self::is_webp_extension)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn header(tag: &[u8; 4]) -> Vec<u8> {
        let mut data = b"RIFF\x24\x00\x00\x00WEBP".to_vec();
        data.extend_from_slice(tag);
        data
    }

    #[test]
    fn detect_chunk_kinds() {
        assert_eq!(ContainerFormat::detect(&header(b"VP8 ")), Some(ContainerFormat::Lossy));
        assert_eq!(
            ContainerFormat::detect(&header(b"VP8L")),
            Some(ContainerFormat::Lossless)
        );
        assert_eq!(
            ContainerFormat::detect(&header(b"VP8X")),
            Some(ContainerFormat::Extended)
        );
    }

    #[test]
    fn detect_rejects_other_data() {
        assert_eq!(ContainerFormat::detect(&header(b"ANMF")), None);
        assert_eq!(ContainerFormat::detect(b"RIFF"), None);
        assert_eq!(ContainerFormat::detect(&[0x89, b'P', b'N', b'G'][..]), None);
        let mut avi = header(b"VP8 ");
        avi[8..12].copy_from_slice(b"AVI ");
        assert_eq!(ContainerFormat::detect(&avi), None);
    }

    #[test]
    fn extensions() {
        assert!(ContainerFormat::is_webp_extension("webp"));
        assert!(ContainerFormat::is_webp_extension("WebP"));
        assert!(!ContainerFormat::is_webp_extension("png"));
        assert!(ContainerFormat::is_webp_path(Path::new("/tmp/cat.WEBP")));
        assert!(!ContainerFormat::is_webp_path(Path::new("/tmp/webp")));
    }
}
