use std::time::Duration;

use async_trait::async_trait;
use reqwest::{
    header::CONTENT_TYPE,
    multipart::{Form, Part},
};
use tracing::warn;
use url::Url;

use crate::error::ClientError;
use crate::request::{FormPart, RawResponse, RequestBody, RequestDescriptor};
use crate::services::transport::client::Transport;

/// reqwest-backed transport.
///
/// Relative request urls are resolved against `base_url` by concatenation, so a
/// base with a path (`https://api.example.com/v1`) keeps it.
#[derive(Clone, Debug)]
pub struct ReqwestTransport {
    http: reqwest::Client,
    base_url: Url,
}

impl ReqwestTransport {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ClientError::Configuration(format!("http client: {e}")))?;
        let base_url = Url::parse(base_url)
            .map_err(|e| ClientError::Configuration(format!("base url {base_url:?}: {e}")))?;

        Ok(Self::with_client(http, base_url))
    }

    pub fn with_client(http: reqwest::Client, base_url: Url) -> Self {
        Self { http, base_url }
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn resolve(&self, url: &str) -> Result<Url, url::ParseError> {
        match Url::parse(url) {
            Ok(absolute) => Ok(absolute),
            Err(url::ParseError::RelativeUrlWithoutBase) => Url::parse(&format!(
                "{}/{}",
                self.base_url.as_str().trim_end_matches('/'),
                url.trim_start_matches('/')
            )),
            Err(e) => Err(e),
        }
    }
}

fn build_form(parts: &[FormPart]) -> Result<Form, ClientError> {
    parts.iter().try_fold(Form::new(), |form, part| {
        let mut p = Part::bytes(part.data.clone());
        if let Some(file_name) = &part.file_name {
            p = p.file_name(file_name.clone());
        }
        if let Some(content_type) = &part.content_type {
            p = p.mime_str(content_type).map_err(|e| {
                ClientError::InvalidRequest(format!("part {:?} content type: {e}", part.name))
            })?;
        }
        Ok(form.part(part.name.clone(), p))
    })
}

fn transport_error(request: &RequestDescriptor, err: reqwest::Error) -> ClientError {
    warn!(
        method = %request.method,
        url = %request.url,
        timeout = err.is_timeout(),
        connect = err.is_connect(),
        error = %err,
        "transport failure"
    );
    ClientError::Transport {
        message: err.to_string(),
        status: err.status(),
        request: Some(Box::new(request.clone())),
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    fn backend_name(&self) -> &'static str {
        "reqwest"
    }

    async fn send(&self, request: &RequestDescriptor) -> Result<RawResponse, ClientError> {
        let url = self.resolve(&request.url).map_err(|e| ClientError::Transport {
            message: format!("invalid url {:?}: {e}", request.url),
            status: None,
            request: Some(Box::new(request.clone())),
        })?;

        let mut headers = request.headers.clone();
        let builder = self.http.request(request.method.clone(), url);
        let builder = match &request.body {
            RequestBody::Empty => builder.headers(headers),
            RequestBody::Json(value) => {
                let bytes = serde_json::to_vec(value)
                    .map_err(|e| ClientError::InvalidRequest(format!("json body: {e}")))?;
                builder.headers(headers).body(bytes)
            }
            RequestBody::Text(text) => builder.headers(headers).body(text.clone()),
            RequestBody::Binary(bytes) => builder.headers(headers).body(bytes.clone()),
            RequestBody::Multipart(parts) => {
                // reqwest writes the boundary content type itself
                headers.remove(CONTENT_TYPE);
                builder.headers(headers).multipart(build_form(parts)?)
            }
        };

        let response = builder
            .send()
            .await
            .map_err(|e| transport_error(request, e))?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = response
            .bytes()
            .await
            .map_err(|e| transport_error(request, e))?
            .to_vec();

        Ok(RawResponse {
            status,
            headers,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_urls_keep_the_base_path() {
        let t =
            ReqwestTransport::new("https://api.example.com/v1/", Duration::from_secs(5)).unwrap();
        assert_eq!(
            t.resolve("/clients?page=1").unwrap().as_str(),
            "https://api.example.com/v1/clients?page=1"
        );
        assert_eq!(
            t.resolve("irpf-declarations/2024").unwrap().as_str(),
            "https://api.example.com/v1/irpf-declarations/2024"
        );
    }

    #[test]
    fn absolute_urls_pass_through() {
        let t =
            ReqwestTransport::new("https://api.example.com/v1", Duration::from_secs(5)).unwrap();
        assert_eq!(
            t.resolve("https://other.example.com/x").unwrap().as_str(),
            "https://other.example.com/x"
        );
    }

    #[test]
    fn invalid_base_url_is_a_configuration_error() {
        let err = ReqwestTransport::new("not a url", Duration::from_secs(5)).unwrap_err();
        assert!(matches!(err, ClientError::Configuration(_)));
    }
}
