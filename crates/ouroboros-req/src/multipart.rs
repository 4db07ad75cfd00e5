//! Streaming multipart/form-data upload with a redacted diagnostic copy
//!
//! A producer task encodes fields and files into one end of a bounded
//! duplex pipe while the transport reads the other end as the request
//! body. The same parts are written to an in-memory writer with file
//! contents replaced by [`PLACEHOLDER`], which becomes the request body
//! shown in dumps.

use std::fmt::Write as _;
use std::io;

use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, DuplexStream};
use tokio::task::JoinHandle;

use crate::ingredient::FileUpload;

/// Stands in for file contents in the diagnostic copy
pub const PLACEHOLDER: &str = "******";

const PIPE_CAPACITY: usize = 64 * 1024;
const READ_CHUNK: usize = 16 * 1024;

/// Minimal multipart/form-data encoder over an async writer
pub(crate) struct MultipartWriter<W> {
    inner: W,
    boundary: String,
    started: bool,
}

impl<W: AsyncWrite + Unpin> MultipartWriter<W> {
    pub(crate) fn new(inner: W) -> Self {
        Self {
            inner,
            boundary: uuid::Uuid::new_v4().simple().to_string(),
            started: false,
        }
    }

    #[cfg(test)]
    pub(crate) fn with_boundary(inner: W, boundary: &str) -> Self {
        Self {
            inner,
            boundary: boundary.to_string(),
            started: false,
        }
    }

    pub(crate) fn content_type(&self) -> String {
        format!("multipart/form-data; boundary={}", self.boundary)
    }

    async fn begin_part(&mut self, headers: &[(&str, String)]) -> io::Result<()> {
        let mut head = String::new();
        if self.started {
            head.push_str("\r\n");
        }
        self.started = true;
        let _ = write!(head, "--{}\r\n", self.boundary);
        for (name, value) in headers {
            let _ = write!(head, "{}: {}\r\n", name, value);
        }
        head.push_str("\r\n");
        self.inner.write_all(head.as_bytes()).await
    }

    async fn begin_file(&mut self, field: &str, file_name: &str) -> io::Result<()> {
        self.begin_part(&[
            (
                "Content-Disposition",
                format!(
                    "form-data; name=\"{}\"; filename=\"{}\"",
                    escape_quotes(field),
                    escape_quotes(file_name)
                ),
            ),
            ("Content-Type", "application/octet-stream".to_string()),
        ])
        .await
    }

    pub(crate) async fn write_field(&mut self, name: &str, value: &str) -> io::Result<()> {
        self.begin_part(&[(
            "Content-Disposition",
            format!("form-data; name=\"{}\"", escape_quotes(name)),
        )])
        .await?;
        self.inner.write_all(value.as_bytes()).await
    }

    /// Write a file part and copy all of `content` into it
    pub(crate) async fn write_file<R>(
        &mut self,
        field: &str,
        file_name: &str,
        content: &mut R,
    ) -> io::Result<u64>
    where
        R: AsyncRead + Unpin + ?Sized,
    {
        self.begin_file(field, file_name).await?;
        tokio::io::copy(content, &mut self.inner).await
    }

    /// Write a file part whose content is the placeholder token
    pub(crate) async fn write_placeholder(&mut self, field: &str, file_name: &str) -> io::Result<()> {
        self.begin_file(field, file_name).await?;
        self.inner.write_all(PLACEHOLDER.as_bytes()).await
    }

    /// Write the closing delimiter and shut the writer down
    pub(crate) async fn finish(mut self) -> io::Result<W> {
        let mut tail = String::new();
        if self.started {
            tail.push_str("\r\n");
        }
        let _ = write!(tail, "--{}--\r\n", self.boundary);
        self.inner.write_all(tail.as_bytes()).await?;
        self.inner.shutdown().await?;
        Ok(self.inner)
    }
}

fn escape_quotes(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

/// A multipart body being produced in the background
pub(crate) struct Upload {
    /// `multipart/form-data` content type carrying the wire boundary
    pub content_type: String,
    /// Read side of the pipe, ready to attach to the request
    pub body: reqwest::Body,
    /// Resolves to the redacted snapshot, or the first write/copy error
    pub completion: JoinHandle<io::Result<Bytes>>,
}

/// Start streaming `fields` then `files` into a new multipart body.
///
/// Must be called from within a Tokio runtime.
pub(crate) fn spawn_upload(fields: Vec<(String, String)>, files: Vec<FileUpload>) -> Upload {
    let (writer, reader) = tokio::io::duplex(PIPE_CAPACITY);
    let wire = MultipartWriter::new(writer);
    let content_type = wire.content_type();
    let snapshot = MultipartWriter::new(Vec::new());

    tracing::debug!(
        fields = fields.len(),
        files = files.len(),
        "Starting multipart upload"
    );
    let completion = tokio::spawn(produce(wire, snapshot, fields, files));

    Upload {
        content_type,
        body: pipe_to_body(reader),
        completion,
    }
}

pub(crate) async fn produce<W>(
    mut wire: MultipartWriter<W>,
    mut snapshot: MultipartWriter<Vec<u8>>,
    fields: Vec<(String, String)>,
    files: Vec<FileUpload>,
) -> io::Result<Bytes>
where
    W: AsyncWrite + Unpin,
{
    for (name, value) in &fields {
        wire.write_field(name, value).await?;
        snapshot.write_field(name, value).await?;
    }

    let mut unnamed = 0;
    for upload in files {
        let FileUpload {
            field_name,
            file_name,
            mut content,
        } = upload;
        let field = match field_name {
            Some(name) if !name.is_empty() => name,
            _ => {
                unnamed += 1;
                format!("file{}", unnamed)
            }
        };

        let copied = wire.write_file(&field, &file_name, &mut content).await?;
        drop(content);
        tracing::trace!(field = %field, file_name = %file_name, bytes = copied, "Streamed file part");

        snapshot.write_placeholder(&field, &file_name).await?;
    }

    wire.finish().await?;
    let snapshot = snapshot.finish().await?;
    Ok(Bytes::from(snapshot))
}

fn pipe_to_body(reader: DuplexStream) -> reqwest::Body {
    let stream = futures::stream::try_unfold(reader, |mut reader| async move {
        let mut buf = vec![0u8; READ_CHUNK];
        let n = reader.read(&mut buf).await?;
        if n == 0 {
            Ok::<Option<(Bytes, DuplexStream)>, io::Error>(None)
        } else {
            buf.truncate(n);
            Ok(Some((Bytes::from(buf), reader)))
        }
    });
    reqwest::Body::wrap_stream(stream)
}
