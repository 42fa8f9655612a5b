/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use std::time::Duration;

use aws_config::stalled_stream_protection::StalledStreamProtectionConfig;
use aws_config::BehaviorVersion;
use aws_sdk_s3::config::{Credentials, RequestChecksumCalculation, ResponseChecksumValidation};
use aws_smithy_http_client::tls::{self, rustls_provider::CryptoMode, TlsContext, TrustStore};
use aws_smithy_runtime_api::client::http::SharedHttpClient;
use aws_smithy_types::retry::RetryConfig;
use aws_smithy_types::timeout::TimeoutConfig;
use aws_types::region::Region;

use crate::error::{self, Error};

const DEFAULT_REGION: &str = "us-east-1";
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_MAX_IDLE_CONNECTIONS_PER_HOST: usize = 4096;
const CREDENTIALS_PROVIDER_NAME: &str = "s3-benchmark";

/// How server certificates are verified on `https` endpoints
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[non_exhaustive]
pub enum TlsVerification {
    /// Trust the platform's native root certificates
    #[default]
    NativeRoots,

    /// Trust the given PEM encoded certificates in addition to the native roots
    WithCertificates(Vec<u8>),

    /// Trust only the given PEM encoded certificates, e.g. the CA of a private deployment
    CertificatesOnly(Vec<u8>),
}

impl TlsVerification {
    fn trust_store(&self) -> TrustStore {
        match self {
            TlsVerification::NativeRoots => TrustStore::default(),
            TlsVerification::WithCertificates(pem) => {
                TrustStore::default().with_pem_certificate(pem.clone())
            }
            TlsVerification::CertificatesOnly(pem) => {
                TrustStore::empty().with_pem_certificate(pem.clone())
            }
        }
    }
}

/// HTTP transport tuning applied to the S3 client.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    connect_timeout: Duration,
    read_timeout: Option<Duration>,
    operation_timeout: Option<Duration>,
    max_attempts: u32,
    stalled_stream_protection: bool,
    max_idle_connections_per_host: usize,
    pool_idle_timeout: Option<Duration>,
    tls_verification: TlsVerification,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            read_timeout: None,
            operation_timeout: None,
            // every failed request is counted by the benchmark rather than retried by the SDK
            max_attempts: 1,
            stalled_stream_protection: false,
            // every worker keeps its connection alive between requests
            max_idle_connections_per_host: DEFAULT_MAX_IDLE_CONNECTIONS_PER_HOST,
            pool_idle_timeout: None,
            tls_verification: TlsVerification::default(),
        }
    }
}

impl TransportConfig {
    /// Timeout for establishing a connection. Default is 30 seconds.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Timeout for reading the first byte of a response. Default is unset.
    pub fn read_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.read_timeout = timeout;
        self
    }

    /// Timeout for a complete operation including all attempts. Default is unset.
    pub fn operation_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.operation_timeout = timeout;
        self
    }

    /// Maximum SDK attempts per request. Default is 1 (no SDK level retries).
    pub fn max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Enable the SDK's stalled stream protection. Default is disabled.
    pub fn stalled_stream_protection(mut self, enabled: bool) -> Self {
        self.stalled_stream_protection = enabled;
        self
    }

    /// Idle connections kept in the pool per host. Default is 4096.
    pub fn max_idle_connections_per_host(mut self, max_idle: usize) -> Self {
        self.max_idle_connections_per_host = max_idle;
        self
    }

    /// How long an idle pooled connection is kept. Default is the HTTP client's own (90 seconds).
    pub fn pool_idle_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.pool_idle_timeout = timeout;
        self
    }

    /// Server certificate verification policy. Default is [`TlsVerification::NativeRoots`].
    pub fn tls_verification(mut self, tls_verification: TlsVerification) -> Self {
        self.tls_verification = tls_verification;
        self
    }

    /// Server certificate verification policy
    pub fn get_tls_verification(&self) -> &TlsVerification {
        &self.tls_verification
    }

    /// Idle connections kept in the pool per host
    pub fn get_max_idle_connections_per_host(&self) -> usize {
        self.max_idle_connections_per_host
    }

    /// Build the HTTP client with the pool and TLS settings.
    fn http_client(&self) -> Result<SharedHttpClient, Error> {
        let tls_context = TlsContext::builder()
            .with_trust_store(self.tls_verification.trust_store())
            .build()
            .map_err(error::invalid_input)?;

        let mut builder = aws_smithy_http_client::Builder::new()
            .pool_max_idle_per_host(self.max_idle_connections_per_host);
        if let Some(timeout) = self.pool_idle_timeout {
            builder = builder.pool_idle_timeout(timeout);
        }
        Ok(builder
            .tls_provider(tls::Provider::Rustls(CryptoMode::AwsLc))
            .tls_context(tls_context)
            .build_https())
    }

    fn timeout_config(&self) -> TimeoutConfig {
        let mut builder = TimeoutConfig::builder().connect_timeout(self.connect_timeout);
        builder
            .set_read_timeout(self.read_timeout)
            .set_operation_timeout(self.operation_timeout);
        builder.build()
    }

    fn stalled_stream_protection_config(&self) -> StalledStreamProtectionConfig {
        if self.stalled_stream_protection {
            StalledStreamProtectionConfig::enabled().build()
        } else {
            StalledStreamProtectionConfig::disabled()
        }
    }
}

/// Validated connection settings for the object store.
#[derive(Clone)]
pub struct ClientConfig {
    access_key: String,
    secret_key: String,
    endpoint_url: String,
    region: String,
    transport: TransportConfig,
}

impl ClientConfig {
    /// Endpoint the client sends requests to, including the scheme
    pub fn endpoint_url(&self) -> &str {
        &self.endpoint_url
    }

    /// Signing region
    pub fn region(&self) -> &str {
        &self.region
    }

    /// Transport settings
    pub fn transport(&self) -> &TransportConfig {
        &self.transport
    }

    /// Build a path-style S3 client for these settings
    pub async fn load(&self) -> Result<aws_sdk_s3::Client, Error> {
        let transport = &self.transport;
        let http_client = transport.http_client()?;
        let credentials = Credentials::new(
            self.access_key.as_str(),
            self.secret_key.as_str(),
            None,
            None,
            CREDENTIALS_PROVIDER_NAME,
        );

        let shared_config = aws_config::defaults(BehaviorVersion::latest())
            .credentials_provider(credentials)
            .http_client(http_client)
            .region(Region::new(self.region.clone()))
            .endpoint_url(self.endpoint_url.as_str())
            .timeout_config(transport.timeout_config())
            .retry_config(RetryConfig::standard().with_max_attempts(transport.max_attempts))
            .stalled_stream_protection(transport.stalled_stream_protection_config())
            .load()
            .await;

        let s3_config = aws_sdk_s3::config::Builder::from(&shared_config)
            .force_path_style(true)
            .request_checksum_calculation(RequestChecksumCalculation::WhenRequired)
            .response_checksum_validation(ResponseChecksumValidation::WhenRequired)
            .build();

        tracing::debug!(
            endpoint = self.endpoint_url.as_str(),
            region = self.region.as_str(),
            "S3 client configured"
        );
        Ok(aws_sdk_s3::Client::from_conf(s3_config))
    }
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("access_key", &self.access_key)
            .field("secret_key", &"** redacted **")
            .field("endpoint_url", &self.endpoint_url)
            .field("region", &self.region)
            .field("transport", &self.transport)
            .finish()
    }
}

/// Load an S3 [`Client`](aws_sdk_s3::Client) for the benchmark.
#[derive(Debug, Default)]
pub struct ConfigLoader {
    access_key: Option<String>,
    secret_key: Option<String>,
    endpoint_url: Option<String>,
    region: Option<String>,
    transport: TransportConfig,
}

impl ConfigLoader {
    /// Access key used to sign requests. Required.
    pub fn access_key(self, access_key: impl Into<String>) -> Self {
        self.set_access_key(Some(access_key.into()))
    }

    /// Access key used to sign requests. Required.
    pub fn set_access_key(mut self, access_key: Option<String>) -> Self {
        self.access_key = access_key;
        self
    }

    /// Secret key used to sign requests. Required.
    pub fn secret_key(self, secret_key: impl Into<String>) -> Self {
        self.set_secret_key(Some(secret_key.into()))
    }

    /// Secret key used to sign requests. Required.
    pub fn set_secret_key(mut self, secret_key: Option<String>) -> Self {
        self.secret_key = secret_key;
        self
    }

    /// Object store endpoint, e.g. `http://10.0.0.1:9000`. Required.
    ///
    /// An endpoint without a scheme is assumed to be `https`.
    pub fn endpoint_url(self, endpoint_url: impl Into<String>) -> Self {
        self.set_endpoint_url(Some(endpoint_url.into()))
    }

    /// Object store endpoint. Required.
    pub fn set_endpoint_url(mut self, endpoint_url: Option<String>) -> Self {
        self.endpoint_url = endpoint_url;
        self
    }

    /// Signing region. Default is `us-east-1`.
    pub fn region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    /// HTTP transport tuning
    pub fn transport(mut self, transport: TransportConfig) -> Self {
        self.transport = transport;
        self
    }

    /// Validate the settings without building a client
    pub fn client_config(self) -> Result<ClientConfig, Error> {
        let access_key = required(self.access_key, "access key")?;
        let secret_key = required(self.secret_key, "secret key")?;
        let endpoint_url = required(self.endpoint_url, "endpoint URL")?;
        let endpoint_url = if endpoint_url.contains("://") {
            endpoint_url
        } else {
            format!("https://{endpoint_url}")
        };

        Ok(ClientConfig {
            access_key,
            secret_key,
            endpoint_url,
            region: self.region.unwrap_or_else(|| DEFAULT_REGION.to_owned()),
            transport: self.transport,
        })
    }

    /// Load the client
    ///
    /// Fails with [`ErrorKind::InputInvalid`](crate::error::ErrorKind::InputInvalid) when the
    /// credentials or the endpoint are missing.
    pub async fn load(self) -> Result<aws_sdk_s3::Client, Error> {
        self.client_config()?.load().await
    }
}

fn required(value: Option<String>, name: &str) -> Result<String, Error> {
    match value {
        Some(value) if !value.is_empty() => Ok(value),
        _ => Err(error::invalid_input(format!("missing {name}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::{ConfigLoader, TlsVerification, TransportConfig};
    use crate::error::ErrorKind;
    use std::time::Duration;

    fn loader() -> ConfigLoader {
        ConfigLoader::default()
            .access_key("AKID")
            .secret_key("SECRET")
            .endpoint_url("http://127.0.0.1:9000")
    }

    #[test]
    fn test_missing_credentials() {
        let err = loader()
            .set_access_key(None)
            .client_config()
            .unwrap_err();
        assert_eq!(&ErrorKind::InputInvalid, err.kind());

        let err = loader()
            .set_secret_key(Some(String::new()))
            .client_config()
            .unwrap_err();
        assert_eq!(&ErrorKind::InputInvalid, err.kind());
    }

    #[test]
    fn test_missing_endpoint() {
        let err = loader().set_endpoint_url(None).client_config().unwrap_err();
        assert_eq!(&ErrorKind::InputInvalid, err.kind());
    }

    #[test]
    fn test_endpoint_scheme() {
        let config = loader().client_config().unwrap();
        assert_eq!("http://127.0.0.1:9000", config.endpoint_url());
        assert_eq!("us-east-1", config.region());

        let config = loader()
            .endpoint_url("storage.example.com")
            .client_config()
            .unwrap();
        assert_eq!("https://storage.example.com", config.endpoint_url());
    }

    #[test]
    fn test_secret_redacted() {
        let config = loader().client_config().unwrap();
        assert!(!format!("{config:?}").contains("SECRET"));
    }

    #[test]
    fn test_transport_defaults() {
        let transport = TransportConfig::default();
        assert_eq!(4096, transport.get_max_idle_connections_per_host());
        assert_eq!(&TlsVerification::NativeRoots, transport.get_tls_verification());
    }

    #[tokio::test]
    async fn test_load_client_with_custom_transport() {
        let transport = TransportConfig::default()
            .max_idle_connections_per_host(16)
            .pool_idle_timeout(Some(Duration::from_secs(5)))
            .tls_verification(TlsVerification::CertificatesOnly(
                b"-----BEGIN CERTIFICATE-----\n-----END CERTIFICATE-----\n".to_vec(),
            ));
        let config = loader().transport(transport).client_config().unwrap();
        assert_eq!(16, config.transport().get_max_idle_connections_per_host());

        let client = config.load().await.unwrap();
        assert!(client.config().http_client().is_some());
    }

    #[tokio::test]
    async fn test_load_client() {
        let client = loader().region("eu-west-1").load().await.unwrap();
        let region = client.config().region().map(|r| r.as_ref().to_owned());
        assert_eq!(Some("eu-west-1".to_owned()), region);
    }
}
