//! Token sources
//!
//! A source reads one candidate token from one channel of an inbound request.
//! Sources are pure with respect to the token store; `None` and an empty
//! string both mean "this channel carries no token".

use crate::config::{DEFAULT_FIELD_NAME, DEFAULT_HEADER_NAME};
use bytes::Bytes;
use http::Request;
use http::header::CONTENT_TYPE;

/// Extracts a candidate token from a request
pub trait TokenSource<B>: Send + Sync {
    /// Read the token carried by this channel, if any
    fn extract(&self, request: &Request<B>) -> Option<String>;
}

impl<B, F> TokenSource<B> for F
where
    F: Fn(&Request<B>) -> Option<String> + Send + Sync,
{
    fn extract(&self, request: &Request<B>) -> Option<String> {
        self(request)
    }
}

/// Boxed source, for building source lists at runtime
pub type BoxedTokenSource<B> = Box<dyn TokenSource<B>>;

/// Token placed into request extensions by an earlier layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextToken(pub String);

/// Reads the [`ContextToken`] request extension
#[derive(Debug, Clone, Copy, Default)]
pub struct ContextSource;

impl<B> TokenSource<B> for ContextSource {
    fn extract(&self, request: &Request<B>) -> Option<String> {
        request
            .extensions()
            .get::<ContextToken>()
            .map(|token| token.0.clone())
    }
}

/// Reads a named request header
#[derive(Debug, Clone)]
pub struct HeaderSource {
    name: String,
}

impl HeaderSource {
    /// Source reading the given header
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    /// Header name this source reads
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Default for HeaderSource {
    fn default() -> Self {
        Self::new(DEFAULT_HEADER_NAME)
    }
}

impl<B> TokenSource<B> for HeaderSource {
    fn extract(&self, request: &Request<B>) -> Option<String> {
        // Header names are case-insensitive; `HeaderMap` lowercases them.
        request
            .headers()
            .get(self.name.as_str())
            .and_then(|value| value.to_str().ok())
            .map(str::to_string)
    }
}

/// Reads a named form field.
///
/// Looks in an urlencoded, multipart or JSON object body first, then the
/// query string.
#[derive(Debug, Clone)]
pub struct FormSource {
    field: String,
}

impl FormSource {
    /// Source reading the given field
    pub fn new(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
        }
    }

    /// Field name this source reads
    pub fn field(&self) -> &str {
        &self.field
    }

    fn find_urlencoded(&self, bytes: &[u8]) -> Option<String> {
        serde_urlencoded::from_bytes::<Vec<(String, String)>>(bytes)
            .ok()?
            .into_iter()
            .find(|(key, _)| *key == self.field)
            .map(|(_, value)| value)
    }

    fn find_json(&self, bytes: &[u8]) -> Option<String> {
        let json = serde_json::from_slice::<serde_json::Value>(bytes).ok()?;
        json.get(&self.field)?.as_str().map(str::to_string)
    }

    fn find_multipart(&self, content_type: &str, bytes: &[u8]) -> Option<String> {
        let boundary = multer::parse_boundary(content_type).ok()?;
        let chunk = Bytes::copy_from_slice(bytes);
        let stream = futures::stream::once(async move { Ok::<_, std::io::Error>(chunk) });
        let mut multipart = multer::Multipart::new(stream, boundary);

        // The whole body is already in memory, so the stream never pends.
        futures::executor::block_on(async {
            while let Some(field) = multipart.next_field().await.ok()? {
                if field.file_name().is_none() && field.name() == Some(self.field.as_str()) {
                    return field.text().await.ok();
                }
            }
            None
        })
    }
}

impl Default for FormSource {
    fn default() -> Self {
        Self::new(DEFAULT_FIELD_NAME)
    }
}

impl<B> TokenSource<B> for FormSource
where
    B: AsRef<[u8]>,
{
    fn extract(&self, request: &Request<B>) -> Option<String> {
        let body: &[u8] = request.body().as_ref();
        // The multipart boundary is case-sensitive, so only the media type
        // is compared lowercased.
        let content_type = request
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default();
        let media_type = content_type.to_ascii_lowercase();

        let from_body = if body.is_empty() {
            None
        } else if media_type.starts_with("application/x-www-form-urlencoded") {
            self.find_urlencoded(body)
        } else if media_type.starts_with("multipart/form-data") {
            self.find_multipart(content_type, body)
        } else if media_type.starts_with("application/json") {
            self.find_json(body)
        } else {
            None
        };

        from_body.or_else(|| {
            request
                .uri()
                .query()
                .and_then(|query| self.find_urlencoded(query.as_bytes()))
        })
    }
}

/// Source reading the [`ContextToken`] extension
pub fn context_source() -> ContextSource {
    ContextSource
}

/// Source reading the `X-Csrf-Token` header
pub fn header_source() -> HeaderSource {
    HeaderSource::default()
}

/// Source reading the given form field
pub fn form_source(field: impl Into<String>) -> FormSource {
    FormSource::new(field)
}
