use std::fmt;
use std::io;
use std::pin::Pin;
use std::str::FromStr;
use std::sync::{Arc, OnceLock};
use std::task::{Context, Poll, ready};

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use pin_project_lite::pin_project;
use serde::{Deserialize, Serialize};
use sha1::Sha1;
use sha2::digest::DynDigest;
use sha2::{Sha256, Sha512};
use thiserror::Error;
use tokio::io::{AsyncRead, ReadBuf};

#[derive(Debug, Error)]
pub enum ChecksumError {
    /// The configured digest algorithm is not available. Fatal at startup.
    #[error("unsupported checksum algorithm: {0}")]
    UnsupportedAlgorithm(String),

    #[error("checksum is not available before the stream is fully read")]
    Incomplete,
}

/// Digest algorithm used to compute file checksums.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChecksumAlgorithm {
    Sha1,
    Sha256,
    Sha512,
}

impl ChecksumAlgorithm {
    /// Canonical algorithm name, e.g. `SHA-1`.
    pub fn name(self) -> &'static str {
        match self {
            Self::Sha1 => "SHA-1",
            Self::Sha256 => "SHA-256",
            Self::Sha512 => "SHA-512",
        }
    }

    /// Digest a complete buffer in one call.
    pub fn digest(self, data: &[u8]) -> Vec<u8> {
        let mut hasher = self.hasher();
        hasher.update(data);
        hasher.finalize().into_vec()
    }

    fn hasher(self) -> Box<dyn DynDigest + Send> {
        match self {
            Self::Sha1 => Box::new(Sha1::default()),
            Self::Sha256 => Box::new(Sha256::default()),
            Self::Sha512 => Box::new(Sha512::default()),
        }
    }
}

impl FromStr for ChecksumAlgorithm {
    type Err = ChecksumError;

    /// Accepts `SHA-1`, `sha1`, `SHA-256`, `sha256`, `SHA-512`, `sha512`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_uppercase().replace('-', "");
        match normalized.as_str() {
            "SHA1" => Ok(Self::Sha1),
            "SHA256" => Ok(Self::Sha256),
            "SHA512" => Ok(Self::Sha512),
            _ => Err(ChecksumError::UnsupportedAlgorithm(s.to_string())),
        }
    }
}

impl fmt::Display for ChecksumAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Text encoding of a stored checksum.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChecksumEncoding {
    #[default]
    Base64,
    Hex,
}

/// Final digest and byte count of a fully consumed stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Checksum {
    pub size: u64,
    pub digest: Vec<u8>,
}

impl Checksum {
    pub fn encode(&self, encoding: ChecksumEncoding) -> String {
        match encoding {
            ChecksumEncoding::Base64 => STANDARD.encode(&self.digest),
            ChecksumEncoding::Hex => hex::encode(&self.digest),
        }
    }
}

pin_project! {
    /// Pass-through reader that digests and counts every byte it forwards.
    ///
    /// The result is sealed when the inner reader reports end of stream and
    /// can then be read through the paired [`ChecksumHandle`].
    pub struct ChecksumReader<R> {
        #[pin]
        inner: R,
        hasher: Option<Box<dyn DynDigest + Send>>,
        size: u64,
        sealed: Arc<OnceLock<Checksum>>,
    }
}

impl<R: AsyncRead> ChecksumReader<R> {
    pub fn new(inner: R, algorithm: ChecksumAlgorithm) -> (Self, ChecksumHandle) {
        let sealed = Arc::new(OnceLock::new());
        let reader = Self {
            inner,
            hasher: Some(algorithm.hasher()),
            size: 0,
            sealed: Arc::clone(&sealed),
        };
        (reader, ChecksumHandle { sealed })
    }
}

impl<R: AsyncRead> AsyncRead for ChecksumReader<R> {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.project();
        let had_capacity = buf.remaining() > 0;
        let before = buf.filled().len();

        ready!(this.inner.poll_read(cx, buf))?;

        let read = &buf.filled()[before..];
        if !read.is_empty() {
            if let Some(hasher) = this.hasher.as_mut() {
                hasher.update(read);
            }
            *this.size += read.len() as u64;
        } else if had_capacity && let Some(hasher) = this.hasher.take() {
            // Zero bytes into a non-empty buffer: end of stream.
            let _ = this.sealed.set(Checksum {
                size: *this.size,
                digest: hasher.finalize().into_vec(),
            });
        }

        Poll::Ready(Ok(()))
    }
}

/// Read side of a [`ChecksumReader`], kept by whoever hands the reader away.
#[derive(Debug, Clone)]
pub struct ChecksumHandle {
    sealed: Arc<OnceLock<Checksum>>,
}

impl ChecksumHandle {
    pub fn is_complete(&self) -> bool {
        self.sealed.get().is_some()
    }

    /// Returns the checksum once the stream has been read to the end.
    pub fn finish(&self) -> Result<Checksum, ChecksumError> {
        self.sealed.get().cloned().ok_or(ChecksumError::Incomplete)
    }
}
