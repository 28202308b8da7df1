pub use client::{Client, ClientError, Method, Response, StatusCode};
pub use url::{InvalidUrlError, Url};

mod url {
    use std::fmt::Display;
    use std::str::FromStr;

    use serde::Serialize;
    use thiserror::Error;

    #[derive(Debug, Error)]
    pub struct InvalidUrlError(String);

    impl Display for InvalidUrlError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            self.0.fmt(f)
        }
    }

    /// An absolute http(s) URL.
    ///
    /// The text is kept exactly as given so that URLs assembled by
    /// concatenation read back unchanged; parsing only validates it.
    #[derive(Debug, Clone, PartialEq, Eq, Hash)]
    pub struct Url(String);

    impl Url {
        pub fn parse(src: &str) -> Result<Self, InvalidUrlError> {
            let parsed = reqwest::Url::parse(src)
                .map_err(|e| InvalidUrlError(format!("invalid URL '{src}': {e}")))?;

            if !matches!(parsed.scheme(), "http" | "https") || !parsed.has_host() {
                return Err(InvalidUrlError(format!(
                    "invalid URL '{src}': expected an absolute http(s) URL"
                )));
            }

            Ok(Self(src.to_owned()))
        }

        /// Append `fragment` to this URL verbatim and validate the result.
        pub fn join_path(&self, fragment: &str) -> Result<Self, InvalidUrlError> {
            Self::parse(&format!("{}{fragment}", self.0))
        }

        pub fn as_str(&self) -> &str {
            self.0.as_str()
        }
    }

    impl Display for Url {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            self.0.fmt(f)
        }
    }

    impl FromStr for Url {
        type Err = InvalidUrlError;

        fn from_str(s: &str) -> Result<Self, Self::Err> {
            Self::parse(s)
        }
    }

    impl Serialize for Url {
        fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
        where
            S: serde::Serializer,
        {
            serializer.serialize_str(&self.0)
        }
    }
}

mod client {
    use std::time::Duration;

    use reqwest::RequestBuilder;
    use serde::Serialize;

    use super::url::Url;

    pub type Method = reqwest::Method;
    pub type StatusCode = reqwest::StatusCode;

    #[derive(Debug, thiserror::Error)]
    pub enum ClientError {
        #[error("failed to build request: {0}")]
        Request(String),

        #[error("server replied with status: {0}")]
        Response(StatusCode),

        #[error(transparent)]
        Client(reqwest::Error),

        #[error(transparent)]
        Server(reqwest::Error),
    }

    impl ClientError {
        /// True if the request or the body read ran out of time.
        pub fn is_timeout(&self) -> bool {
            match self {
                Self::Client(err) | Self::Server(err) => err.is_timeout(),
                _ => false,
            }
        }
    }

    #[derive(Debug)]
    pub struct Response(reqwest::Response);

    impl Response {
        pub fn status(&self) -> StatusCode {
            self.0.status()
        }

        pub async fn text(self) -> Result<String, ClientError> {
            self.0.text().await.map_err(ClientError::Server)
        }
    }

    #[derive(Debug, Clone)]
    pub struct Client {
        client: reqwest::Client,
        timeout: Option<Duration>,
    }

    impl Default for Client {
        /// Default client with a timeout of 5 seconds.
        fn default() -> Self {
            Self::new(Some(Duration::from_secs(5)))
        }
    }

    impl Client {
        pub fn new(timeout: Option<Duration>) -> Self {
            Self {
                client: reqwest::Client::new(),
                timeout,
            }
        }

        /// GET `url`, failing on a 4xx or 5xx status.
        pub async fn get(&self, url: &Url) -> Result<Response, ClientError> {
            wrap_status_error(
                self.request(Method::GET, url, |req| {
                    Ok(req.header("Accept", "application/json"))
                })
                .await?,
            )
        }

        /// PUT `payload` as JSON to `url`, failing on a 4xx or 5xx status.
        pub async fn put<Payload>(
            &self,
            url: &Url,
            payload: &Payload,
        ) -> Result<Response, ClientError>
        where
            Payload: Serialize + ?Sized,
        {
            let body =
                serde_json::to_vec(payload).map_err(|e| ClientError::Request(e.to_string()))?;
            wrap_status_error(
                self.request(Method::PUT, url, |req| {
                    Ok(req.header("Content-Type", "application/json").body(body))
                })
                .await?,
            )
        }

        /// Thin wrapper around [reqwest::Request], this is your gateway to
        /// a fully customizable client if this type's methods won't do.
        pub async fn request<D>(
            &self,
            method: Method,
            url: &Url,
            decorator: D,
        ) -> Result<Response, ClientError>
        where
            D: FnOnce(RequestBuilder) -> Result<RequestBuilder, ClientError>,
        {
            let mut request = self.client.request(method, url.as_str());

            if let Some(timeout) = self.timeout {
                request = request.timeout(timeout);
            }

            request = decorator(request)?;

            Ok(Response(request.send().await.map_err(ClientError::Client)?))
        }
    }

    fn wrap_status_error(res: Response) -> Result<Response, ClientError> {
        match res.status() {
            status if status.is_client_error() || status.is_server_error() => {
                Err(ClientError::Response(status))
            }
            _ => Ok(res),
        }
    }
}
