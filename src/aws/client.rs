//! AWS Client - Lightweight HTTP-based client
//!
//! Uses SigV4 signing with direct HTTP calls instead of heavy SDK

use anyhow::Result;

use super::credentials::load_credentials;
use super::http::AwsHttpClient;

/// Container for AWS HTTP client
pub struct AwsClients {
    pub http: AwsHttpClient,
    pub region: String,
    pub profile: String,
}

impl AwsClients {
    /// Create AWS client for a given profile and region
    pub fn new(profile: &str, region: &str) -> Result<Self> {
        let credentials = load_credentials(profile)?;
        let http = AwsHttpClient::new(credentials, region)?;

        Ok(Self {
            http,
            region: region.to_string(),
            profile: profile.to_string(),
        })
    }
}
