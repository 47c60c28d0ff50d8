use super::ImageDownloader;
use super::error::{ErrorKind, Result};
use async_trait::async_trait;
use exn::OptionExt;
use std::collections::HashMap;
use std::io::Cursor;
use std::sync::Mutex;

/// Serves canned bytes per URL and records every request. Unknown URLs fail
/// like an unreachable host.
#[derive(Default)]
pub(crate) struct MockDownloader {
    files: HashMap<String, Vec<u8>>,
    requests: Mutex<Vec<String>>,
}

impl MockDownloader {
    pub(crate) fn with_file(mut self, url: impl Into<String>, bytes: Vec<u8>) -> Self {
        self.files.insert(url.into(), bytes);
        self
    }

    pub(crate) fn requests(&self) -> Vec<String> {
        self.requests.lock().map(|requests| requests.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl ImageDownloader for MockDownloader {
    async fn download(&self, url: &str) -> Result<Vec<u8>> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(url.to_string());
        }
        self.files.get(url).cloned().ok_or_raise(|| ErrorKind::Download(url.to_string()))
    }
}

/// A solid-colour image of the given size.
pub(crate) fn encode(width: u32, height: u32, format: image::ImageFormat) -> Vec<u8> {
    let mut bytes = Vec::new();
    image::DynamicImage::new_rgb8(width, height).write_to(&mut Cursor::new(&mut bytes), format).unwrap();
    bytes
}
