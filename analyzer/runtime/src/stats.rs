//! Submits report summaries to the migration stats endpoint.

use base64::{engine::general_purpose::STANDARD, Engine};
use ingress_analyzer_core::ReportSummary;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, instrument};

pub const DEFAULT_ENDPOINT: &str =
    "https://collect.ingressnginxmigration.org/a2181946f5561e7e7405000e5c94de97";

const TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Clone, Debug, clap::Args)]
#[group(id = "StatsArgs")]
pub struct Args {
    /// URL to which report summaries are posted.
    #[clap(long = "stats-endpoint", env = "ENDPOINT_STATS_URL")]
    endpoint: Option<String>,

    /// Bearer token presented to the stats endpoint.
    #[clap(
        long = "stats-token",
        env = "STATS_TOKEN",
        default_value = "dev",
        hide_env_values = true
    )]
    token: String,

    /// Base64-encoded PEM client certificate.
    #[clap(long = "stats-client-cert", env = "STATS_CLIENT_CERT", hide_env_values = true)]
    client_cert: Option<String>,

    /// Base64-encoded PEM client private key.
    #[clap(long = "stats-client-key", env = "STATS_CLIENT_KEY", hide_env_values = true)]
    client_key: Option<String>,

    /// Base64-encoded PEM CA certificate used to verify the stats endpoint.
    #[clap(long = "stats-ca-cert", env = "STATS_CA_CERT", hide_env_values = true)]
    ca_cert: Option<String>,
}

#[derive(Clone)]
pub struct Client {
    http: reqwest::Client,
    endpoint: String,
    token: String,
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("decoding {0}: {1}")]
    Decode(&'static str, base64::DecodeError),

    #[error("loading {0}: {1}")]
    Tls(&'static str, reqwest::Error),

    #[error("building HTTP client: {0}")]
    Build(reqwest::Error),

    #[error("posting report to {endpoint}: {error}")]
    Request {
        endpoint: String,
        error: reqwest::Error,
    },

    #[error("invalid response status code: {0}")]
    Status(reqwest::StatusCode),
}

// === impl Args ===

impl Args {
    pub fn endpoint(&self) -> &str {
        self.endpoint
            .as_deref()
            .filter(|ep| !ep.is_empty())
            .unwrap_or(DEFAULT_ENDPOINT)
    }
}

impl Default for Args {
    fn default() -> Self {
        Self {
            endpoint: None,
            token: "dev".to_string(),
            client_cert: None,
            client_key: None,
            ca_cert: None,
        }
    }
}

// === impl Client ===

impl Client {
    pub fn from_args(args: &Args) -> Result<Self, Error> {
        let mut http = reqwest::Client::builder()
            .timeout(TIMEOUT)
            .connect_timeout(TIMEOUT)
            .tcp_keepalive(TIMEOUT);

        // Client authentication is only configured when both halves of the identity are present.
        if let (Some(cert), Some(key)) = (non_empty(&args.client_cert), non_empty(&args.client_key))
        {
            let mut pem = decode("client certificate", cert)?;
            pem.extend(decode("client key", key)?);
            let identity =
                reqwest::Identity::from_pem(&pem).map_err(|e| Error::Tls("client identity", e))?;
            http = http
                .identity(identity)
                .min_tls_version(reqwest::tls::Version::TLS_1_2);

            if let Some(ca) = non_empty(&args.ca_cert) {
                let ca = reqwest::Certificate::from_pem(&decode("CA certificate", ca)?)
                    .map_err(|e| Error::Tls("CA certificate", e))?;
                http = http.tls_built_in_root_certs(false).add_root_certificate(ca);
            }
        }

        Ok(Self {
            http: http.build().map_err(Error::Build)?,
            endpoint: args.endpoint().to_string(),
            token: args.token.clone(),
        })
    }

    #[instrument(skip_all, fields(endpoint = %self.endpoint))]
    pub async fn send(&self, summary: &ReportSummary) -> Result<(), Error> {
        let rsp = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.token)
            .json(summary)
            .send()
            .await
            .map_err(|error| Error::Request {
                endpoint: self.endpoint.clone(),
                error,
            })?;

        let status = rsp.status();
        if !status.is_success() {
            return Err(Error::Status(status));
        }
        debug!(%status, ingresses = summary.ingress_count, "Sent report summary");
        Ok(())
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

fn decode(what: &'static str, b64: &str) -> Result<Vec<u8>, Error> {
    STANDARD
        .decode(b64.trim())
        .map_err(|e| Error::Decode(what, e))
}
