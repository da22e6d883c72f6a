//! `OpendalTransport` — selects an OpenDAL service builder by URL scheme,
//! grounded in `otlp2parquet-writer::storage::initialize_storage`'s backend
//! `match`.

use async_trait::async_trait;
use opendal::{Operator, services};

use crate::error::TransportError;
use crate::transport::Transport;

pub struct OpendalTransport {
    operator: Option<Operator>,
    last_error: Option<String>,
}

impl Default for OpendalTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl OpendalTransport {
    pub fn new() -> Self {
        Self {
            operator: None,
            last_error: None,
        }
    }

    fn operator(&self) -> Result<&Operator, TransportError> {
        self.operator.as_ref().ok_or(TransportError::NotOpen)
    }

    fn record<T>(&mut self, result: Result<T, TransportError>) -> Result<T, TransportError> {
        if let Err(ref e) = result {
            self.last_error = Some(e.to_string());
        }
        result
    }
}

fn build_operator(url: &str) -> Result<Operator, TransportError> {
    if let Some(path) = url.strip_prefix("file://") {
        let root = if path.is_empty() { "." } else { path };
        let builder = services::Fs::default().root(root);
        return Ok(Operator::new(builder)?.finish());
    }

    if let Some(rest) = url.strip_prefix("s3://") {
        let (bucket, prefix) = rest.split_once('/').unwrap_or((rest, ""));
        let region = std::env::var("AWS_REGION").unwrap_or_else(|_| "us-east-1".to_string());
        let mut builder = services::S3::default().bucket(bucket).region(&region);
        if !prefix.is_empty() {
            builder = builder.root(&format!("/{prefix}"));
        }
        if let Ok(endpoint) = std::env::var("AWS_ENDPOINT_URL") {
            builder = builder.endpoint(&endpoint);
        }
        return Ok(Operator::new(builder)?.finish());
    }

    if url.starts_with("http://") || url.starts_with("https://") {
        let mut builder = services::Http::default().endpoint(url);
        let auth = embr_config::env::auth_override();
        // `EB_AUTH_TOKEN` rides as a bearer-style username with no password,
        // the common convention for token-over-basic-auth HTTP APIs.
        if let Some(token) = &auth.token {
            builder = builder.username(token);
        } else {
            if let Some(user) = &auth.user {
                builder = builder.username(user);
            }
            if let Some(password) = &auth.password {
                builder = builder.password(password);
            }
        }
        return Ok(Operator::new(builder)?.finish());
    }

    Err(TransportError::UnsupportedScheme(url.to_string()))
}

#[async_trait]
impl Transport for OpendalTransport {
    async fn open(&mut self, url: &str) -> Result<(), TransportError> {
        let result = build_operator(url);
        match self.record(result) {
            Ok(operator) => {
                self.operator = Some(operator);
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    async fn connect(&mut self) -> Result<(), TransportError> {
        // OpenDAL operators are stateless handles; no separate connect step.
        self.operator().map(|_| ())
    }

    async fn send_data(&mut self, buf: &[u8], remote_key: &str) -> Result<(), TransportError> {
        let operator = self.operator()?.clone();
        let result = operator
            .write(remote_key, buf.to_vec())
            .await
            .map_err(TransportError::from);
        self.record(result)
    }

    async fn receive_data(&mut self, remote_key: &str, cap: usize) -> Result<Vec<u8>, TransportError> {
        let operator = self.operator()?.clone();
        let result = async {
            let data = operator.read(remote_key).await?;
            let bytes = data.to_vec();
            if bytes.len() > cap {
                return Err(TransportError::Io(std::io::Error::new(
                    std::io::ErrorKind::InvalidData,
                    format!("remote object {remote_key} exceeds cap of {cap} bytes"),
                )));
            }
            Ok(bytes)
        }
        .await;
        self.record(result)
    }

    async fn list_files(&mut self, prefix: &str) -> Result<Vec<String>, TransportError> {
        let operator = self.operator()?.clone();
        let result = async {
            let entries = operator.list(prefix).await?;
            Ok(entries.into_iter().map(|e| e.path().to_string()).collect())
        }
        .await;
        self.record(result)
    }

    async fn delete_files(&mut self, _prefix: &str, keys: &[String]) -> Result<(), TransportError> {
        let operator = self.operator()?.clone();
        let result = async {
            for key in keys {
                operator.delete(key).await?;
            }
            Ok(())
        }
        .await;
        self.record(result)
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.operator = None;
        Ok(())
    }

    fn get_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }
}
