//! Host-facing preview and thumbnail entry points.
//!
//! A preview host hands over a file identifier and expects exactly one
//! answer through a completion callback. [`PreviewProvider::prepare_preview`]
//! guarantees that: every path out of it, including a file that cannot be
//! opened or decoded, calls the completion before returning.

use std::fs::File;
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};

use thiserror::Error;
use url::Url;

use crate::decode::Decoder;
use crate::descriptor::{DecodeDescriptor, Size};
use crate::info::BitstreamFeatures;
use crate::limits::ResourceLimits;
use crate::output::OwnedImage;

/// Read size for full previews.
pub const PREVIEW_CHUNK_SIZE: usize = 128 * 1024;

/// Read size for thumbnails; only the start of the file is needed before
/// scaling kicks in.
pub const THUMBNAIL_CHUNK_SIZE: usize = 16 * 1024;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PreviewError {
    #[error("cannot open {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot decode {path}: {reason}")]
    Decode { path: PathBuf, reason: String },
}

/// A decoded preview, ready to hand to the host.
#[derive(Clone, Debug)]
pub struct PreviewImage {
    /// Packed BGRA pixels at the preview size.
    pub image: OwnedImage,
    /// Features of the source file; `width`/`height` are the natural size.
    pub features: BitstreamFeatures,
}

/// Decodes previews and thumbnails for a host.
#[derive(Clone, Debug, Default)]
pub struct PreviewProvider {
    limits: ResourceLimits,
}

impl PreviewProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Limits applied to every file this provider decodes.
    #[must_use]
    pub fn with_limits(mut self, limits: ResourceLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Produce a natural-size preview of the file named by `identifier`
    /// and report it through `completion`.
    ///
    /// `identifier` is a filesystem path or a `file://` URL. `query` is the
    /// host's content-type hint; it is logged and otherwise ignored.
    /// `completion` runs exactly once, before this returns.
    pub fn prepare_preview<C>(&self, identifier: &str, query: &str, completion: C)
    where
        C: FnOnce(Result<PreviewImage, PreviewError>),
    {
        log::debug!("preview requested for {identifier} ({query})");
        let result = path_from_identifier(identifier).and_then(|path| {
            self.decode_file(&path, PREVIEW_CHUNK_SIZE, DecodeDescriptor::natural)
        });
        if let Err(err) = &result {
            log::warn!("{err}");
        }
        completion(result);
    }

    /// Decode `path` scaled to fit inside `max_size`, keeping the aspect
    /// ratio. A `max_size` with a non-positive side decodes at natural size.
    pub fn thumbnail(&self, path: &Path, max_size: Size) -> Result<PreviewImage, PreviewError> {
        self.decode_file(path, THUMBNAIL_CHUNK_SIZE, |features| {
            DecodeDescriptor::fit_within(features, max_size)
        })
    }

    fn decode_file<F>(
        &self,
        path: &Path,
        chunk_size: usize,
        configure: F,
    ) -> Result<PreviewImage, PreviewError>
    where
        F: FnOnce(&BitstreamFeatures) -> DecodeDescriptor,
    {
        let file = File::open(path).map_err(|source| PreviewError::Open {
            path: path.to_path_buf(),
            source,
        })?;

        let mut probed = None;
        let decoder = Decoder::new()
            .with_limits(self.limits)
            .with_chunk_size(chunk_size);
        let image = decoder
            .try_decode_stream(
                BufReader::with_capacity(chunk_size, file),
                |features| {
                    probed = Some(*features);
                    configure(features)
                },
                |image| image.to_owned_image(),
            )
            .map_err(|err| PreviewError::Decode {
                path: path.to_path_buf(),
                reason: err.error().to_string(),
            })?;

        Ok(PreviewImage {
            features: probed.unwrap_or_default(),
            image,
        })
    }
}

/// Accept plain paths and `file:` URLs. A URL naming another host is an
/// [`PreviewError::Open`]; anything that does not parse as a `file:` URL is
/// taken as a path.
fn path_from_identifier(identifier: &str) -> Result<PathBuf, PreviewError> {
    let url = match Url::parse(identifier) {
        Ok(url) if url.scheme() == "file" => url,
        _ => return Ok(PathBuf::from(identifier)),
    };
    url.to_file_path().map_err(|()| PreviewError::Open {
        path: PathBuf::from(identifier),
        source: io::Error::new(
            io::ErrorKind::InvalidInput,
            "file URL does not name a local path",
        ),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifiers_become_paths() {
        let path = |id: &str| path_from_identifier(id).unwrap();
        assert_eq!(path("/tmp/a.webp"), PathBuf::from("/tmp/a.webp"));
        assert_eq!(path("relative/a.webp"), PathBuf::from("relative/a.webp"));
        assert_eq!(path("file:///tmp/my%20cat.webp"), PathBuf::from("/tmp/my cat.webp"));
        assert_eq!(path("file://localhost/tmp/a.webp"), PathBuf::from("/tmp/a.webp"));
    }

    #[cfg(unix)]
    #[test]
    fn escapes_decode_to_raw_bytes() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let path = path_from_identifier("file:///tmp/a%FF.webp").unwrap();
        assert_eq!(path.as_os_str(), OsStr::from_bytes(b"/tmp/a\xFF.webp"));
    }

    #[test]
    fn remote_hosts_are_rejected() {
        let err = path_from_identifier("file://otherhost/x.webp").unwrap_err();
        assert!(matches!(err, PreviewError::Open { .. }));

        let mut calls = 0;
        PreviewProvider::new().prepare_preview("file://otherhost/x.webp", "", |result| {
            calls += 1;
            assert!(matches!(result, Err(PreviewError::Open { .. })));
        });
        assert_eq!(calls, 1);
    }

    #[test]
    fn missing_file_still_completes() {
        let mut calls = 0;
        PreviewProvider::new().prepare_preview(
            "/definitely/not/here.webp",
            "org.webmproject.webp",
            |result| {
                calls += 1;
                assert!(matches!(result, Err(PreviewError::Open { .. })));
            },
        );
        assert_eq!(calls, 1);
    }
}
