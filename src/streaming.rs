//! Incremental decoding from a byte stream.
//!
//! The stream is read in fixed-size chunks. Chunks are collected into a
//! header buffer until the bitstream features can be probed, then the
//! header and every later chunk are appended to a libwebp incremental
//! decoder that writes straight into the scratch buffer:
//!
//! ```text
//! read ─→ header buffer ─→ probe ─→ configure ─→ WebPIDecode
//!                                                   │
//!         read ─→ WebPIAppend ←─────────────────────┘  (until OK or EOF)
//! ```
//!
//! A read of zero bytes is end of stream. The decode succeeds only if the
//! last append reported completion; a stream that ends early is treated like
//! a corrupt one and produces no partial image.

use core::marker::PhantomData;
use core::ptr::NonNull;
use std::io::{self, Read};

use libwebp_sys::{WebPDecoderConfig, WebPIDecoder};
use whereat::at;

use crate::decode::Decoder;
use crate::descriptor::DecodeDescriptor;
use crate::error::{DecodeError, DecodeResult, DecodeStatus};
use crate::info::BitstreamFeatures;
use crate::output::DecodedImage;

/// Default read size for streaming decodes (64 KiB).
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

/// Owned libwebp incremental decoder.
///
/// Borrows the configuration it was created from: libwebp keeps pointers to
/// its output and options for the decoder's whole lifetime.
pub(crate) struct IncrementalDecoder<'c> {
    raw: NonNull<WebPIDecoder>,
    _config: PhantomData<&'c mut WebPDecoderConfig>,
}

impl<'c> IncrementalDecoder<'c> {
    /// Create a decoder for `config`. `header` must already probe
    /// successfully; it fills `config.input` but is not consumed.
    pub(crate) fn new(config: &'c mut WebPDecoderConfig, header: &[u8]) -> DecodeResult<Self> {
        // SAFETY: `header` is valid for reads of its length and `config` is
        // an initialized configuration that stays mutably borrowed, and so
        // pinned in place, for `'c`.
        let raw = unsafe { libwebp_sys::WebPIDecode(header.as_ptr(), header.len(), config) };
        let raw = NonNull::new(raw)
            .ok_or_else(|| at!(DecodeError::Status(DecodeStatus::OutOfMemory)))?;
        Ok(Self {
            raw,
            _config: PhantomData,
        })
    }

    /// Feed the next bytes of the stream.
    pub(crate) fn append(&mut self, data: &[u8]) -> DecodeStatus {
        // SAFETY: `raw` is a live decoder and `data` is valid for reads of
        // its length. libwebp copies what it needs before returning.
        let status =
            unsafe { libwebp_sys::WebPIAppend(self.raw.as_ptr(), data.as_ptr(), data.len()) };
        DecodeStatus::from(status)
    }
}

impl Drop for IncrementalDecoder<'_> {
    fn drop(&mut self) {
        // SAFETY: `raw` came from `WebPIDecode` and is deleted exactly once.
        unsafe { libwebp_sys::WebPIDelete(self.raw.as_ptr()) };
    }
}

impl Decoder<'_> {
    /// Decode a WebP stream, returning `None` on any failure.
    ///
    /// Same contract as [`decode`](Self::decode), but the input is pulled
    /// from `reader` in chunks of [`chunk_size`](Self::chunk_size) bytes. An
    /// empty or truncated stream returns `None`.
    ///
    /// Reading stops as soon as libwebp reports the image complete. Bytes
    /// after that point are left unread, and the reader is positioned at the
    /// end of the last chunk, which may lie past the end of the image.
    pub fn decode_stream<Rd, F, T, R>(&self, reader: Rd, configure: F, transform: T) -> Option<R>
    where
        Rd: Read,
        F: FnOnce(&BitstreamFeatures) -> DecodeDescriptor,
        T: FnOnce(DecodedImage<'_>) -> R,
    {
        self.try_decode_stream(reader, configure, transform)
            .map_err(|err| log::debug!("webp stream decode failed: {}", err.error()))
            .ok()
    }

    /// Decode a WebP stream, keeping the reason for a failure.
    pub fn try_decode_stream<Rd, F, T, R>(
        &self,
        mut reader: Rd,
        configure: F,
        transform: T,
    ) -> DecodeResult<R>
    where
        Rd: Read,
        F: FnOnce(&BitstreamFeatures) -> DecodeDescriptor,
        T: FnOnce(DecodedImage<'_>) -> R,
    {
        let mut chunk = vec![0u8; self.chunk_size()];
        let mut consumed = 0u64;

        // A short first read is normal for pipes and sockets: keep reading
        // until the header can be probed.
        let mut header = Vec::new();
        let features = loop {
            let n = self.read_chunk(&mut reader, &mut chunk, &mut consumed)?;
            if n == 0 {
                return Err(at!(DecodeError::InsufficientData));
            }
            header.extend_from_slice(&chunk[..n]);
            match BitstreamFeatures::probe(&header) {
                Ok(features) => break features,
                Err(err) if matches!(err.error(), DecodeError::InsufficientData) => continue,
                Err(err) => return Err(err),
            }
        };

        let mut target = self.prepare(features, configure)?;
        let status = {
            let mut decoder = IncrementalDecoder::new(&mut target.config, &header)?;
            let mut status = decoder.append(&header);
            drop(header);
            loop {
                log::trace!("webp append: {status}, {consumed} bytes read");
                if status == DecodeStatus::Ok {
                    break status;
                }
                if !status.is_resumable() {
                    return Err(at!(DecodeError::from(status)));
                }
                let n = self.read_chunk(&mut reader, &mut chunk, &mut consumed)?;
                if n == 0 {
                    break status;
                }
                status = decoder.append(&chunk[..n]);
            }
        };

        if status != DecodeStatus::Ok {
            // Stream ended while libwebp still wanted more.
            return Err(at!(DecodeError::InsufficientData));
        }
        Ok(transform(target.image()?))
    }

    /// Read one chunk, retrying interrupted reads. Checks the stop token
    /// before reading and the file size limit after.
    fn read_chunk<Rd: Read>(
        &self,
        reader: &mut Rd,
        buf: &mut [u8],
        consumed: &mut u64,
    ) -> DecodeResult<usize> {
        self.check_stop()?;
        let n = loop {
            match reader.read(buf) {
                Ok(n) => break n,
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => return Err(at!(DecodeError::Io(err))),
            }
        };
        *consumed += n as u64;
        self.limits()
            .check_file_size(*consumed)
            .map_err(|e| at!(DecodeError::from(e)))?;
        Ok(n)
    }
}

/// Decode a WebP stream with a default [`Decoder`].
pub fn decode_webp_stream<Rd, F, T, R>(reader: Rd, configure: F, transform: T) -> Option<R>
where
    Rd: Read,
    F: FnOnce(&BitstreamFeatures) -> DecodeDescriptor,
    T: FnOnce(DecodedImage<'_>) -> R,
{
    Decoder::new().decode_stream(reader, configure, transform)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::limits::ResourceLimits;

    /// Fails once with `Interrupted`, then yields nothing.
    struct InterruptedOnce(bool);

    impl Read for InterruptedOnce {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            if core::mem::replace(&mut self.0, true) {
                Ok(0)
            } else {
                Err(io::ErrorKind::Interrupted.into())
            }
        }
    }

    struct Broken;

    impl Read for Broken {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::other("disk on fire"))
        }
    }

    #[test]
    fn empty_stream_is_absent() {
        let result = decode_webp_stream(io::empty(), DecodeDescriptor::natural, |_| ());
        assert!(result.is_none());

        let err = Decoder::new()
            .try_decode_stream(&[][..], DecodeDescriptor::natural, |_| ())
            .unwrap_err();
        assert!(matches!(err.error(), DecodeError::InsufficientData));
    }

    #[test]
    fn interrupted_reads_are_retried() {
        let err = Decoder::new()
            .try_decode_stream(InterruptedOnce(false), DecodeDescriptor::natural, |_| ())
            .unwrap_err();
        // Retried, then reached end of stream.
        assert!(matches!(err.error(), DecodeError::InsufficientData));
    }

    #[test]
    fn io_errors_abort() {
        let err = Decoder::new()
            .try_decode_stream(Broken, DecodeDescriptor::natural, |_| ())
            .unwrap_err();
        assert!(matches!(err.error(), DecodeError::Io(_)));
    }

    #[test]
    fn garbage_stream_fails_fast() {
        let garbage = vec![0x5Au8; 4 * DEFAULT_CHUNK_SIZE];
        let err = Decoder::new()
            .with_chunk_size(16)
            .try_decode_stream(&garbage[..], DecodeDescriptor::natural, |_| ())
            .unwrap_err();
        assert!(matches!(
            err.error(),
            DecodeError::Status(_) | DecodeError::InsufficientData
        ));
    }

    #[test]
    fn file_size_limit_applies_to_stream() {
        let data = vec![0u8; 100];
        let err = Decoder::new()
            .with_chunk_size(64)
            .with_limits(ResourceLimits::none().with_max_file_size(80))
            .try_decode_stream(&data[..], DecodeDescriptor::natural, |_| ())
            .unwrap_err();
        // 64 bytes of zeros are not a header, the second read crosses the limit.
        assert!(matches!(
            err.error(),
            DecodeError::LimitExceeded(_) | DecodeError::Status(_)
        ));
    }
}
