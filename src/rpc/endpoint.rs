use url::Url;

use crate::rpc::Error;

/// Conversion trait for values that can name an RPC endpoint.
///
/// Used when building [`Provider`](crate::Provider) records so endpoint lists can be given as string
/// literals, owned strings or already-parsed [`Url`]s. Only `http` and `https` endpoints are
/// accepted since the selector and poller speak HTTP JSON-RPC.
pub trait IntoEndpointUrl {
    /// Convert `self` into a validated endpoint [`Url`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidEndpoint`] if the value does not parse or uses another scheme.
    fn into_endpoint_url(self) -> Result<Url, Error>;
}

impl IntoEndpointUrl for Url {
    fn into_endpoint_url(self) -> Result<Url, Error> {
        match self.scheme() {
            "http" | "https" => Ok(self),
            other => Err(Error::InvalidEndpoint(format!("unsupported scheme `{other}` in {self}"))),
        }
    }
}

impl IntoEndpointUrl for &str {
    fn into_endpoint_url(self) -> Result<Url, Error> {
        let url = Url::parse(self).map_err(|e| Error::InvalidEndpoint(format!("{self}: {e}")))?;
        url.into_endpoint_url()
    }
}

impl IntoEndpointUrl for String {
    fn into_endpoint_url(self) -> Result<Url, Error> {
        self.as_str().into_endpoint_url()
    }
}

impl IntoEndpointUrl for &Url {
    fn into_endpoint_url(self) -> Result<Url, Error> {
        self.clone().into_endpoint_url()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_http_and_https() {
        assert!("http://localhost:8545".into_endpoint_url().is_ok());
        assert!(String::from("https://rpc.example.org/v1").into_endpoint_url().is_ok());
    }

    #[test]
    fn rejects_other_schemes() {
        let err = "wss://rpc.example.org".into_endpoint_url().unwrap_err();
        assert!(matches!(err, Error::InvalidEndpoint(_)));
    }

    #[test]
    fn rejects_garbage() {
        let err = "not a url".into_endpoint_url().unwrap_err();
        assert!(matches!(err, Error::InvalidEndpoint(_)));
    }
}
