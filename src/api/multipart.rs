//
//  bkt-cli
//  api/multipart.rs
//
//  Created by Ngonidzashe Mangudya on 2026/01/12.
//  Copyright (c) 2025 IAMNGONI. All rights reserved.
//

//! # Multipart Uploads
//!
//! Turns [`MultipartFile`]s into a reqwest [`Form`] for uploads (Cloud issue
//! attachments). String fields come first, then one part per file, each
//! sent as `application/octet-stream`. The boundary is random per form.
//!
//! In-memory parts carry their length. A part backed by a reader is streamed
//! lazily and drained exactly once, so multipart requests are never retried.

use std::path::Path;

use bytes::Bytes;
use reqwest::multipart::{Form, Part};
use reqwest::Body;
use tokio::io::AsyncRead;
use tokio_util::io::ReaderStream;

use super::common::ApiError;

const OCTET_STREAM: &str = "application/octet-stream";

enum FileSource {
    Memory(Bytes),
    Reader(Box<dyn AsyncRead + Send + Unpin>),
}

/// One file part of a multipart upload.
pub struct MultipartFile {
    field_name: String,
    file_name: String,
    source: FileSource,
}

impl std::fmt::Debug for MultipartFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let source = match &self.source {
            FileSource::Memory(b) => format!("{} bytes", b.len()),
            FileSource::Reader(_) => "reader".to_string(),
        };
        f.debug_struct("MultipartFile")
            .field("field_name", &self.field_name)
            .field("file_name", &self.file_name)
            .field("source", &source)
            .finish()
    }
}

impl MultipartFile {
    /// A part whose content is already in memory.
    pub fn from_bytes(
        field_name: impl Into<String>,
        file_name: impl Into<String>,
        content: impl Into<Bytes>,
    ) -> Self {
        Self {
            field_name: field_name.into(),
            file_name: file_name.into(),
            source: FileSource::Memory(content.into()),
        }
    }

    /// A part streamed from `reader`, consumed once.
    pub fn from_reader<R>(field_name: impl Into<String>, file_name: impl Into<String>, reader: R) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
    {
        Self {
            field_name: field_name.into(),
            file_name: file_name.into(),
            source: FileSource::Reader(Box::new(reader)),
        }
    }

    /// Opens a local file as a streamed part named after the file.
    pub async fn open(field_name: impl Into<String>, path: impl AsRef<Path>) -> Result<Self, ApiError> {
        let path = path.as_ref();
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| ApiError::Validation(format!("{} is not a file", path.display())))?;
        let file = tokio::fs::File::open(path).await?;
        Ok(Self::from_reader(field_name, file_name, file))
    }

    /// Form field name.
    pub fn field_name(&self) -> &str {
        &self.field_name
    }

    /// File name sent in `Content-Disposition`.
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    fn into_part(self) -> Result<Part, ApiError> {
        let part = match self.source {
            FileSource::Memory(content) => {
                let len = content.len() as u64;
                Part::stream_with_length(Body::from(content), len)
            }
            FileSource::Reader(reader) => Part::stream(Body::wrap_stream(ReaderStream::new(reader))),
        };
        Ok(part.file_name(self.file_name).mime_str(OCTET_STREAM)?)
    }
}

/// Builds a form with `fields` first, then one part per file.
pub fn form(fields: &[(String, String)], files: Vec<MultipartFile>) -> Result<Form, ApiError> {
    let mut form = Form::new();
    for (name, value) in fields {
        form = form.text(name.clone(), value.clone());
    }
    for file in files {
        let field = file.field_name.clone();
        form = form.part(field, file.into_part()?);
    }
    Ok(form)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn content_type(form: Form) -> String {
        let request = reqwest::Client::new()
            .post("https://example.com/upload")
            .multipart(form)
            .build()
            .unwrap();
        request.headers()["content-type"].to_str().unwrap().to_string()
    }

    #[test]
    fn test_boundary_is_random() {
        let a = form(&[], vec![MultipartFile::from_bytes("files", "a.txt", "a")]).unwrap();
        let b = form(&[], vec![MultipartFile::from_bytes("files", "a.txt", "a")]).unwrap();
        assert_ne!(a.boundary(), b.boundary());
    }

    #[test]
    fn test_content_type_carries_boundary() {
        let form = form(
            &[("comment".to_string(), "hi".to_string())],
            vec![MultipartFile::from_bytes("files", "a.txt", "hello")],
        )
        .unwrap();
        let expected = format!("multipart/form-data; boundary={}", form.boundary());
        assert_eq!(content_type(form), expected);
    }

    #[test]
    fn test_reader_part_is_streamed() {
        let reader = std::io::Cursor::new(b"streamed".to_vec());
        let form = form(&[], vec![MultipartFile::from_reader("files", "b.bin", reader)]).unwrap();
        let request = reqwest::Client::new()
            .post("https://example.com/upload")
            .multipart(form)
            .build()
            .unwrap();
        assert!(request.body().and_then(|b| b.as_bytes()).is_none());
        assert!(request.try_clone().is_none());
    }

    #[tokio::test]
    async fn test_open_names_part_after_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("crash.log");
        std::fs::write(&path, "boom").unwrap();
        let file = MultipartFile::open("files", &path).await.unwrap();
        assert_eq!(file.file_name(), "crash.log");
        assert_eq!(file.field_name(), "files");
    }
}
