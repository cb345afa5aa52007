//! reqwest-backed transport

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::multipart::{Form, Part};
use std::time::Duration;

use super::{
    FormPart, HttpResponse, HttpTransport, Method, OutboundRequest, RequestBody, TransportError,
};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Production transport; one pooled client shared by every call
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new() -> Result<Self, TransportError> {
        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| TransportError::Other(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self { client })
    }
}

fn build_form(parts: Vec<FormPart>) -> Result<Form, TransportError> {
    let mut form = Form::new();
    for part in parts {
        form = match part {
            FormPart::Text { name, value } => form.text(name, value),
            FormPart::File {
                name,
                file_name,
                content_type,
                bytes,
            } => {
                let mut file = Part::bytes(bytes).file_name(file_name);
                if let Some(content_type) = content_type {
                    file = file.mime_str(&content_type).map_err(|e| {
                        TransportError::Other(format!("Invalid content type: {}", e))
                    })?;
                }
                form.part(name, file)
            }
        };
    }
    Ok(form)
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: OutboundRequest) -> Result<HttpResponse, TransportError> {
        let mut builder = match request.method {
            Method::Get => self.client.get(&request.url),
            Method::Post => self.client.post(&request.url),
        }
        .timeout(request.timeout);

        if let Some(token) = &request.bearer {
            builder = builder.header(AUTHORIZATION, format!("Bearer {}", token));
        }
        if let Some(accept) = &request.accept {
            builder = builder.header(ACCEPT, accept);
        }

        builder = match request.body {
            RequestBody::Empty => builder,
            RequestBody::Json(value) => builder.json(&value),
            RequestBody::Multipart(parts) => builder.multipart(build_form(parts)?),
        };

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                TransportError::Timeout(request.timeout)
            } else if e.is_connect() {
                TransportError::Connect(e.to_string())
            } else {
                TransportError::Other(e.to_string())
            }
        })?;

        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let body = response.bytes().await.map_err(|e| {
            if e.is_timeout() {
                TransportError::Timeout(request.timeout)
            } else {
                TransportError::Other(format!("Error reading response: {}", e))
            }
        })?;

        Ok(HttpResponse {
            status,
            content_type,
            body: body.to_vec(),
        })
    }
}
