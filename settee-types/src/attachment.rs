//! File attachments and their content checksums.

use crate::error::{Error, Result};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use md5::{Digest, Md5};
use std::fmt;
use std::io::{Cursor, Read};

/// A 128-bit MD5 checksum of an attachment's content.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Checksum([u8; 16]);

impl Checksum {
    /// Wraps raw digest bytes.
    pub const fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }

    /// Computes the checksum of `data`.
    pub fn compute(data: &[u8]) -> Self {
        Self(Md5::digest(data).into())
    }

    /// Returns the digest bytes.
    pub const fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }

    /// Lowercase hex rendering.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// The `md5-<base64>` form used in attachment stubs.
    pub fn to_digest(&self) -> String {
        format!("md5-{}", STANDARD.encode(self.0))
    }

    /// Parses the `md5-<base64>` stub form.
    pub fn from_digest(digest: &str) -> Result<Self> {
        let encoded = digest
            .strip_prefix("md5-")
            .ok_or_else(|| Error::bad_request(format!("unsupported digest: {digest}")))?;
        let raw = STANDARD
            .decode(encoded)
            .map_err(|e| Error::bad_request(format!("invalid digest: {e}")))?;
        let bytes: [u8; 16] = raw
            .try_into()
            .map_err(|_| Error::bad_request("digest must be 16 bytes"))?;
        Ok(Self(bytes))
    }
}

impl fmt::Debug for Checksum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Checksum({})", self.to_hex())
    }
}

impl fmt::Display for Checksum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

enum Body {
    Stream(Box<dyn Read + Send>),
    Buffered(Cursor<Vec<u8>>),
}

/// A named binary payload attached to a document.
///
/// The body is a stream owned by the attachment. Dropping the attachment,
/// or calling [`Attachment::close`], releases it.
pub struct Attachment {
    /// Attachment filename.
    pub filename: String,
    /// Declared content type.
    pub content_type: String,
    /// Checksum as reported by the backend.
    pub md5: Checksum,
    body: Body,
}

impl Attachment {
    /// Creates an attachment over a streaming body. The checksum is left
    /// zeroed until the caller sets it or computes it with [`Attachment::checksum`].
    pub fn new(
        filename: impl Into<String>,
        content_type: impl Into<String>,
        body: impl Read + Send + 'static,
    ) -> Self {
        Self {
            filename: filename.into(),
            content_type: content_type.into(),
            md5: Checksum::default(),
            body: Body::Stream(Box::new(body)),
        }
    }

    /// Creates an attachment from in-memory content, computing its checksum.
    pub fn from_bytes(
        filename: impl Into<String>,
        content_type: impl Into<String>,
        data: Vec<u8>,
    ) -> Self {
        Self {
            filename: filename.into(),
            content_type: content_type.into(),
            md5: Checksum::compute(&data),
            body: Body::Buffered(Cursor::new(data)),
        }
    }

    /// Sets the checksum reported alongside the body.
    pub fn with_checksum(mut self, md5: Checksum) -> Self {
        self.md5 = md5;
        self
    }

    /// Reads the whole body, caching it so later calls return the same bytes.
    pub fn bytes(&mut self) -> Result<&[u8]> {
        if let Body::Stream(stream) = &mut self.body {
            let mut buf = Vec::new();
            stream
                .read_to_end(&mut buf)
                .map_err(|e| Error::internal(format!("reading attachment: {e}")))?;
            self.body = Body::Buffered(Cursor::new(buf));
        }
        match &self.body {
            Body::Buffered(cursor) => Ok(cursor.get_ref().as_slice()),
            Body::Stream(_) => unreachable!("body buffered above"),
        }
    }

    /// Computes the checksum of the (cached) content.
    pub fn checksum(&mut self) -> Result<Checksum> {
        Ok(Checksum::compute(self.bytes()?))
    }

    /// Releases the body stream without reading it.
    pub fn close(&mut self) {
        self.body = Body::Buffered(Cursor::new(Vec::new()));
    }
}

impl Read for Attachment {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match &mut self.body {
            Body::Stream(stream) => stream.read(buf),
            Body::Buffered(cursor) => cursor.read(buf),
        }
    }
}

impl fmt::Debug for Attachment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Attachment")
            .field("filename", &self.filename)
            .field("content_type", &self.content_type)
            .field("md5", &self.md5)
            .finish_non_exhaustive()
    }
}
