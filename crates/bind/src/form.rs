//! Decoding of form payloads.
//!
//! Both `application/x-www-form-urlencoded` and `multipart/form-data` payloads are decoded into
//! one [`FormData`], at most once per request. Multipart file parts are kept in memory while
//! they fit the memory threshold; larger parts are written to a temporary file.

use crate::body::{OptionReqBody, ReqBody};
use crate::error::{BoxError, ResolveError};
use bytes::Bytes;
use http::header::CONTENT_TYPE;
use http::request::Parts;
use http::{HeaderMap, Method};
use http_body_util::{BodyDataStream, Collected, BodyExt, LengthLimitError, Limited};
use mime::Mime;
use std::io;
use std::path::Path;
use std::pin::Pin;
use std::sync::Arc;
use tempfile::NamedTempFile;
use tokio::io::AsyncWriteExt;
use tracing::debug;

/// A file received as a part of a `multipart/form-data` request.
#[derive(Debug, Clone, Default)]
pub struct UploadedFile {
    file_name: Option<String>,
    content_type: Option<Mime>,
    headers: HeaderMap,
    size: u64,
    content: FileContent,
}

#[derive(Debug, Clone)]
enum FileContent {
    Memory(Bytes),
    Disk(Arc<NamedTempFile>),
}

impl Default for FileContent {
    fn default() -> Self {
        FileContent::Memory(Bytes::new())
    }
}

impl UploadedFile {
    /// The file name the client sent, if any.
    pub fn file_name(&self) -> Option<&str> {
        self.file_name.as_deref()
    }

    pub fn content_type(&self) -> Option<&Mime> {
        self.content_type.as_ref()
    }

    /// The headers of the multipart part.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Size of the content in bytes.
    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn is_in_memory(&self) -> bool {
        matches!(self.content, FileContent::Memory(_))
    }

    /// The temporary file holding the content, when the part did not fit in memory. The file is
    /// removed once the last clone of this handle is dropped.
    pub fn path(&self) -> Option<&Path> {
        match &self.content {
            FileContent::Memory(_) => None,
            FileContent::Disk(file) => Some(file.path()),
        }
    }

    /// Reads the whole content.
    pub async fn bytes(&self) -> io::Result<Bytes> {
        match &self.content {
            FileContent::Memory(bytes) => Ok(bytes.clone()),
            FileContent::Disk(file) => tokio::fs::read(file.path()).await.map(Bytes::from),
        }
    }
}

/// The decoded form payload of one request.
#[derive(Debug, Default)]
pub(crate) struct FormData {
    multipart: bool,
    values: Vec<(String, String)>,
    files: Vec<(String, UploadedFile)>,
}

enum FormEncoding {
    UrlEncoded,
    Multipart { boundary: String },
}

impl FormData {
    pub(crate) fn is_multipart(&self) -> bool {
        self.multipart
    }

    /// The first value submitted under `name`.
    pub(crate) fn value(&self, name: &str) -> Option<&str> {
        self.values.iter().find(|(key, _)| key == name).map(|(_, value)| value.as_str())
    }

    /// The first file submitted under `name`.
    pub(crate) fn file(&self, name: &str) -> Option<&UploadedFile> {
        self.files.iter().find(|(key, _)| key == name).map(|(_, file)| file)
    }

    /// Decodes the form payload of a request.
    ///
    /// A request that carries no form payload yields an empty form and leaves the body unread.
    /// Url-encoded payloads are only read for `POST`, `PUT` and `PATCH`.
    pub(crate) async fn parse(head: &Parts, body: &mut OptionReqBody, max_memory: u64) -> Result<Self, ResolveError> {
        match form_encoding(head)? {
            None => Ok(FormData::default()),

            Some(FormEncoding::UrlEncoded) => {
                let bytes = body.apply(|b| read_limited(b, max_memory)).await?;
                let values =
                    serde_urlencoded::from_bytes::<Vec<(String, String)>>(&bytes).map_err(ResolveError::form_decode)?;
                Ok(FormData { multipart: false, values, files: Vec::new() })
            }

            Some(FormEncoding::Multipart { boundary }) => {
                body.apply(|b| parse_multipart(b, boundary, max_memory)).await
            }
        }
    }
}

/// Collects the payload, failing as soon as it grows past `max_memory`.
async fn read_limited(body: ReqBody, max_memory: u64) -> Result<Bytes, ResolveError> {
    let limit = usize::try_from(max_memory).unwrap_or(usize::MAX);
    // boxed as `Send` here, where the body type is concrete, to sidestep a rustc higher-ranked
    // lifetime error when the enclosing `async_trait` future is checked for `Send`
    let collect: Pin<Box<dyn Future<Output = Result<Collected<Bytes>, BoxError>> + Send>> =
        Box::pin(Limited::new(body, limit).collect());
    match collect.await {
        Ok(collected) => Ok(collected.to_bytes()),
        Err(e) if e.is::<LengthLimitError>() => Err(ResolveError::FormTooLarge { limit: max_memory }),
        Err(e) => Err(ResolveError::body_read(e)),
    }
}

fn form_encoding(head: &Parts) -> Result<Option<FormEncoding>, ResolveError> {
    let Some(content_type) = head.headers.get(CONTENT_TYPE).and_then(|value| value.to_str().ok()) else {
        return Ok(None);
    };
    let Ok(media_type) = content_type.parse::<Mime>() else {
        return Ok(None);
    };

    if media_type.type_() == mime::MULTIPART && media_type.subtype() == mime::FORM_DATA {
        let boundary = multer::parse_boundary(content_type).map_err(ResolveError::form_decode)?;
        return Ok(Some(FormEncoding::Multipart { boundary }));
    }

    let reads_payload = head.method == Method::POST || head.method == Method::PUT || head.method == Method::PATCH;
    if reads_payload && media_type.type_() == mime::APPLICATION && media_type.subtype() == mime::WWW_FORM_URLENCODED {
        return Ok(Some(FormEncoding::UrlEncoded));
    }

    Ok(None)
}

async fn parse_multipart(body: ReqBody, boundary: String, max_memory: u64) -> Result<FormData, ResolveError> {
    let mut multipart = multer::Multipart::new(BodyDataStream::new(body), boundary);
    let mut form = FormData { multipart: true, ..FormData::default() };
    // shared by text values and in-memory files
    let mut remaining = max_memory;

    while let Some(mut field) = multipart.next_field().await.map_err(ResolveError::form_decode)? {
        let Some(name) = field.name().map(str::to_owned) else {
            continue;
        };

        if field.file_name().is_none() {
            let value = read_value(&mut field, &mut remaining, max_memory).await?;
            form.values.push((name, value));
        } else {
            let file = read_file(&mut field, &mut remaining).await?;
            debug!(part = %name, size = file.size(), in_memory = file.is_in_memory(), "received multipart file");
            form.files.push((name, file));
        }
    }

    Ok(form)
}

async fn read_value(field: &mut multer::Field<'static>, remaining: &mut u64, limit: u64) -> Result<String, ResolveError> {
    let mut buf = Vec::new();
    while let Some(chunk) = field.chunk().await.map_err(ResolveError::form_decode)? {
        let len = chunk.len() as u64;
        if len > *remaining {
            return Err(ResolveError::FormTooLarge { limit });
        }
        *remaining -= len;
        buf.extend_from_slice(&chunk);
    }
    String::from_utf8(buf).map_err(ResolveError::form_decode)
}

async fn read_file(field: &mut multer::Field<'static>, remaining: &mut u64) -> Result<UploadedFile, ResolveError> {
    let file_name = field.file_name().map(str::to_owned);
    let content_type = field.content_type().cloned();
    let headers = field.headers().clone();

    let mut size = 0_u64;
    let mut buffered = Vec::new();
    let mut spilled: Option<(NamedTempFile, tokio::fs::File)> = None;

    while let Some(chunk) = field.chunk().await.map_err(ResolveError::form_decode)? {
        size += chunk.len() as u64;

        if let Some((_, writer)) = spilled.as_mut() {
            writer.write_all(&chunk).await.map_err(ResolveError::file_store)?;
        } else if size > *remaining {
            let (temp, mut writer) = spill_file().map_err(ResolveError::file_store)?;
            writer.write_all(&buffered).await.map_err(ResolveError::file_store)?;
            writer.write_all(&chunk).await.map_err(ResolveError::file_store)?;
            buffered = Vec::new();
            spilled = Some((temp, writer));
        } else {
            buffered.extend_from_slice(&chunk);
        }
    }

    let content = match spilled {
        Some((temp, mut writer)) => {
            writer.flush().await.map_err(ResolveError::file_store)?;
            FileContent::Disk(Arc::new(temp))
        }
        None => {
            *remaining -= size;
            FileContent::Memory(Bytes::from(buffered))
        }
    };

    Ok(UploadedFile { file_name, content_type, headers, size, content })
}

fn spill_file() -> io::Result<(NamedTempFile, tokio::fs::File)> {
    let temp = NamedTempFile::new()?;
    let writer = tokio::fs::File::from_std(temp.as_file().try_clone()?);
    Ok((temp, writer))
}
