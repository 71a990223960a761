//! Identity service client: enrolls new ledger users and returns their
//! public key.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::errors::{BridgeError, Result};

#[derive(Debug, Serialize)]
struct EnrollRequest<'a> {
    username: &'a str,
    org: &'a str,
}

#[derive(Debug, Deserialize)]
struct EnrollResponse {
    success: bool,
    #[serde(default)]
    data: Option<Credentials>,
    #[serde(default)]
    error: Option<String>,
}

/// The private key stays with the identity service's wallet; the bridge
/// only registers the public half.
#[derive(Debug, Deserialize)]
struct Credentials {
    #[serde(rename = "publicKey")]
    public_key: String,
}

#[derive(Debug, Clone)]
pub struct IdentityClient {
    client: Client,
    endpoint: String,
    org: String,
}

impl IdentityClient {
    pub fn new(client: Client, endpoint: &str, org: &str) -> Self {
        Self {
            client,
            endpoint: endpoint.to_string(),
            org: org.to_string(),
        }
    }

    /// Create an identity for `username` and return its public key on one line.
    pub async fn enroll(&self, username: &str) -> Result<String> {
        let body: EnrollResponse = self
            .client
            .post(format!("{}/create", self.endpoint))
            .json(&EnrollRequest {
                username,
                org: &self.org,
            })
            .send()
            .await?
            .json()
            .await?;

        let public_key = parse_enrollment(body)?;
        info!(username, "Identity enrolled");
        Ok(public_key)
    }
}

fn parse_enrollment(body: EnrollResponse) -> Result<String> {
    if !body.success {
        return Err(BridgeError::Identity(
            body.error.unwrap_or_else(|| "enrollment refused".to_string()),
        ));
    }
    let credentials = body
        .data
        .ok_or_else(|| BridgeError::Identity("enrollment returned no credentials".to_string()))?;
    let key = strip_pem(&credentials.public_key);
    if key.is_empty() {
        return Err(BridgeError::Identity("enrollment returned an empty key".to_string()));
    }
    Ok(key)
}

/// Body of a PEM block without its armor lines and line breaks. Input that
/// carries no armor is only flattened.
pub fn strip_pem(pem: &str) -> String {
    let body = pem.split("-----").nth(2).unwrap_or(pem);
    body.chars().filter(|c| !c.is_whitespace()).collect()
}
