//! Requests as they travel down the pipeline.
//!
//! A [`Request`] is handed to each link by value, so a handler owns it outright and
//! can rewrite the URL, headers or the typed property bag before delegating.
//!
//! ```
//! use plait_core::{Method, Request};
//!
//! let url = "https://api.example.com/orders".parse().expect("static URL");
//! let request = Request::<bytes::Bytes>::builder(Method::Get, url)
//!     .header("Accept", "application/json")
//!     .build();
//! assert_eq!(request.header("Accept"), Some("application/json"));
//! ```

use std::collections::HashMap;

use bytes::Bytes;
use http::Extensions;
use url::Url;

use crate::Method;

/// Method, target, headers, optional body and per-request properties.
#[derive(Debug, Clone)]
pub struct Request<B = Bytes> {
    method: Method,
    url: Url,
    headers: HashMap<String, String>,
    body: Option<B>,
    extensions: Extensions,
}

/// A [`Request`] taken apart, for transports and handlers that rebuild the message.
#[derive(Debug)]
pub struct RequestParts<B = Bytes> {
    /// Request method.
    pub method: Method,
    /// Absolute target URL.
    pub url: Url,
    /// Headers as set by the caller and the handlers so far.
    pub headers: HashMap<String, String>,
    /// Body, if any.
    pub body: Option<B>,
    /// Typed properties.
    pub extensions: Extensions,
}

impl<B> Request<B> {
    /// Start a request for `method` on `url`.
    #[must_use]
    pub fn builder(method: Method, url: Url) -> RequestBuilder<B> {
        RequestBuilder {
            request: Self {
                method,
                url,
                headers: HashMap::new(),
                body: None,
                extensions: Extensions::new(),
            },
        }
    }

    /// Method.
    #[must_use]
    pub const fn method(&self) -> Method {
        self.method
    }

    /// Target URL.
    #[must_use]
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Target URL, for handlers that redirect the request.
    #[must_use]
    pub fn url_mut(&mut self) -> &mut Url {
        &mut self.url
    }

    /// All headers.
    #[must_use]
    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    /// All headers, mutably.
    #[must_use]
    pub fn headers_mut(&mut self) -> &mut HashMap<String, String> {
        &mut self.headers
    }

    /// Look up a header by its exact name.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }

    /// Body, if one was set.
    #[must_use]
    pub const fn body(&self) -> Option<&B> {
        self.body.as_ref()
    }

    /// Typed properties; each type holds at most one value.
    #[must_use]
    pub fn extensions(&self) -> &Extensions {
        &self.extensions
    }

    /// Typed properties, mutably.
    #[must_use]
    pub fn extensions_mut(&mut self) -> &mut Extensions {
        &mut self.extensions
    }

    /// Take the request apart.
    #[must_use]
    pub fn into_parts(self) -> RequestParts<B> {
        let Self {
            method,
            url,
            headers,
            body,
            extensions,
        } = self;
        RequestParts {
            method,
            url,
            headers,
            body,
            extensions,
        }
    }
}

/// Fluent construction of a [`Request`].
#[derive(Debug, Clone)]
pub struct RequestBuilder<B = Bytes> {
    request: Request<B>,
}

impl<B> RequestBuilder<B> {
    /// Set `name` to `value`, replacing an earlier value under the same name.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.request.headers.insert(name.into(), value.into());
        self
    }

    /// Attach a body.
    #[must_use]
    pub fn body(mut self, body: B) -> Self {
        self.request.body = Some(body);
        self
    }

    /// Attach a typed property, replacing any earlier value of type `T`.
    #[must_use]
    pub fn extension<T: Clone + Send + Sync + 'static>(mut self, value: T) -> Self {
        self.request.extensions.insert(value);
        self
    }

    /// Finish.
    #[must_use]
    pub fn build(self) -> Request<B> {
        self.request
    }
}

impl RequestBuilder<Bytes> {
    /// Encode `value` as the body and mark it `application/json`.
    ///
    /// # Errors
    ///
    /// See [`crate::to_json`].
    pub fn json<T: serde::Serialize>(self, value: &T) -> crate::Result<Self> {
        let body = crate::to_json(value)?;
        Ok(self.header("Content-Type", "application/json").body(body))
    }
}
