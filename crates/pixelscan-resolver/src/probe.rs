//! Network probing used by the resolver and the health check.
//!
//! [`Prober`] is the seam between address resolution and the network. The
//! production implementation, [`HttpProber`], uses `reqwest` for HTTP and the
//! tokio resolver for DNS; tests swap in a scripted fake.

use crate::error::{ProbeError, ProbeResult};
use pixelscan_core::ResolverConfig;
use std::net::IpAddr;
use std::time::{Duration, Instant};

/// Bytes of response body kept for bot-protection keyword matching.
const BODY_SAMPLE_LIMIT: usize = 64 * 1024;

/// User agent sent with connectivity probes.
const PROBE_USER_AGENT: &str =
    "Mozilla/5.0 (compatible; PixelScan-HealthCheck/0.1; +https://github.com/pixelscan/pixelscan)";

/// HTTP method used for a probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeMethod {
    /// Cheap reachability check, no body
    Head,
    /// Full request; body sample is kept
    Get,
}

/// Outcome of a probe that got an HTTP response.
#[derive(Debug, Clone)]
pub struct ProbeResponse {
    pub status: u16,
    /// URL after following redirects
    pub final_url: String,
    /// Lowercased body prefix (`GET` only)
    pub body_sample: Option<String>,
    pub elapsed: Duration,
}

#[async_trait::async_trait]
pub trait Prober: Send + Sync {
    /// Resolve a host name to its addresses.
    async fn lookup_host(&self, host: &str) -> ProbeResult<Vec<IpAddr>>;

    /// Issue a single request, following redirects up to the configured bound.
    async fn probe(&self, url: &str, method: ProbeMethod) -> ProbeResult<ProbeResponse>;
}

/// [`Prober`] backed by `reqwest` and `tokio::net::lookup_host`.
#[derive(Debug, Clone)]
pub struct HttpProber {
    client: reqwest::Client,
}

impl HttpProber {
    pub fn new(config: &ResolverConfig) -> ProbeResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.probe_timeout_ms))
            .connect_timeout(Duration::from_millis(config.probe_timeout_ms))
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .user_agent(PROBE_USER_AGENT)
            .build()
            .map_err(|e| ProbeError::Other(e.to_string()))?;

        Ok(Self { client })
    }
}

#[async_trait::async_trait]
impl Prober for HttpProber {
    async fn lookup_host(&self, host: &str) -> ProbeResult<Vec<IpAddr>> {
        let bare = host.trim_start_matches('[').trim_end_matches(']');
        if let Ok(ip) = bare.parse::<IpAddr>() {
            return Ok(vec![ip]);
        }

        let addrs = tokio::net::lookup_host((bare, 443))
            .await
            .map_err(|e| ProbeError::Dns(e.to_string()))?;

        let ips: Vec<IpAddr> = addrs.map(|a| a.ip()).collect();
        if ips.is_empty() {
            return Err(ProbeError::Dns(format!("no addresses for {bare}")));
        }
        Ok(ips)
    }

    async fn probe(&self, url: &str, method: ProbeMethod) -> ProbeResult<ProbeResponse> {
        let started = Instant::now();
        let request = match method {
            ProbeMethod::Head => self.client.head(url),
            ProbeMethod::Get => self.client.get(url),
        };

        let response = request.send().await.map_err(classify)?;
        let status = response.status().as_u16();
        let final_url = response.url().to_string();

        let body_sample = match method {
            ProbeMethod::Head => None,
            ProbeMethod::Get => Some(read_sample(response).await),
        };

        Ok(ProbeResponse {
            status,
            final_url,
            body_sample,
            elapsed: started.elapsed(),
        })
    }
}

/// Read at most [`BODY_SAMPLE_LIMIT`] bytes of the body, however long it is.
async fn read_sample(mut response: reqwest::Response) -> String {
    let mut body = Vec::new();
    loop {
        match response.chunk().await {
            Ok(Some(chunk)) => {
                if !take_chunk(&mut body, &chunk) {
                    break;
                }
            }
            // A body that fails mid-stream still tells us the server answered.
            Ok(None) | Err(_) => break,
        }
    }
    sample(&String::from_utf8_lossy(&body))
}

/// Append up to the sample limit; false once the sample is full.
fn take_chunk(body: &mut Vec<u8>, chunk: &[u8]) -> bool {
    let room = BODY_SAMPLE_LIMIT.saturating_sub(body.len());
    body.extend_from_slice(&chunk[..chunk.len().min(room)]);
    body.len() < BODY_SAMPLE_LIMIT
}

fn sample(body: &str) -> String {
    let mut end = body.len().min(BODY_SAMPLE_LIMIT);
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    body[..end].to_lowercase()
}

fn classify(err: reqwest::Error) -> ProbeError {
    if err.is_timeout() {
        return ProbeError::Timeout;
    }
    if err.is_redirect() {
        return ProbeError::TooManyRedirects;
    }

    let message = error_chain(&err);
    let lowered = message.to_lowercase();
    if lowered.contains("certificate") || lowered.contains("tls") || lowered.contains("ssl") {
        ProbeError::Tls(message)
    } else if lowered.contains("dns") || lowered.contains("failed to lookup address") {
        ProbeError::Dns(message)
    } else if err.is_connect() {
        ProbeError::Connect(message)
    } else {
        ProbeError::Other(message)
    }
}

fn error_chain(err: &dyn std::error::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(inner) = source {
        message.push_str(": ");
        message.push_str(&inner.to_string());
        source = inner.source();
    }
    message
}
