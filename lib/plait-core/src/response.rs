//! Responses as they travel back up the pipeline.

use std::collections::HashMap;

use bytes::Bytes;

/// Status, headers and a fully buffered body.
///
/// Handlers see the response after every link below them has returned it and may
/// rewrite its headers before handing it further out. A 4xx or 5xx status is still
/// a response; only transport-level failures become an [`crate::Error`].
#[derive(Debug, Clone)]
pub struct Response<B = Bytes> {
    status: u16,
    headers: HashMap<String, String>,
    body: B,
}

impl<B> Response<B> {
    /// Assemble a response from its parts.
    #[must_use]
    pub fn new(status: u16, headers: HashMap<String, String>, body: B) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    /// Status code.
    #[must_use]
    pub const fn status(&self) -> u16 {
        self.status
    }

    /// All headers, keyed by the name the server sent.
    #[must_use]
    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    /// Headers, for rewriting on the way out.
    #[must_use]
    pub fn headers_mut(&mut self) -> &mut HashMap<String, String> {
        &mut self.headers
    }

    /// Look up a header by its exact name.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }

    /// Buffered body.
    #[must_use]
    pub const fn body(&self) -> &B {
        &self.body
    }

    /// `true` for any 2xx status.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.class() == 2
    }

    /// `true` for any 4xx status.
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        self.class() == 4
    }

    const fn class(&self) -> u16 {
        self.status / 100
    }
}

impl<B: Default> Response<B> {
    /// An answer produced without reaching the transport: bare status, empty body.
    #[must_use]
    pub fn with_status(status: u16) -> Self {
        Self::new(status, HashMap::new(), B::default())
    }
}

impl Response<Bytes> {
    /// Decode the body as JSON.
    ///
    /// # Errors
    ///
    /// See [`crate::from_json`].
    pub fn json<T: serde::de::DeserializeOwned>(&self) -> crate::Result<T> {
        crate::from_json(&self.body)
    }

    /// Take the body as UTF-8 text.
    ///
    /// # Errors
    ///
    /// Hands back the raw bytes inside the error when they are not valid UTF-8.
    pub fn text(self) -> Result<String, std::string::FromUtf8Error> {
        String::from_utf8(Vec::from(self.body))
    }
}
