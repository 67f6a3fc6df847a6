use serde::Deserialize;
use thiserror::Error;

use crate::core::billing::validate_endpoint;

const DEFAULT_LOGIN_ENDPOINT: &str = "https://login.microsoftonline.com";
const ARM_SCOPE: &str = "https://management.azure.com/.default";

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("{0} environment variable is not set")]
    MissingCredential(&'static str),
    #[error("invalid login endpoint: {0}")]
    BadEndpoint(String),
    #[error("token request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("token endpoint rejected the credentials (HTTP {status}): {body}")]
    Rejected { status: u16, body: String },
}

/// Service-principal credentials, read once from the standard Azure
/// environment variables and passed explicitly into authentication.
#[derive(Debug, Clone)]
pub struct ServicePrincipal {
    pub tenant_id: String,
    pub client_id: String,
    client_secret: String,
}

impl ServicePrincipal {
    pub fn from_env() -> Result<Self, AuthError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AuthError> {
        let require = |name: &'static str| {
            lookup(name)
                .filter(|v| !v.trim().is_empty())
                .ok_or(AuthError::MissingCredential(name))
        };
        Ok(Self {
            tenant_id: require("AZURE_TENANT_ID")?,
            client_id: require("AZURE_CLIENT_ID")?,
            client_secret: require("AZURE_CLIENT_SECRET")?,
        })
    }
}

/// Bearer token for the Azure Resource Manager scope.
#[derive(Debug, Clone)]
pub struct ArmToken {
    pub access_token: String,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[allow(dead_code)]
    expires_in: Option<u64>,
}

fn login_endpoint() -> Result<String, AuthError> {
    let endpoint = std::env::var("AZCOST_LOGIN_ENDPOINT")
        .unwrap_or_else(|_| DEFAULT_LOGIN_ENDPOINT.to_string());
    validate_endpoint(&endpoint).map_err(|e| AuthError::BadEndpoint(e.to_string()))?;
    Ok(endpoint)
}

/// Exchange the service principal for an ARM bearer token via the OAuth2
/// client-credentials grant. Called exactly once per run, before any
/// subscription is processed; failure here is fatal to the whole run.
pub async fn authenticate(
    client: &reqwest::Client,
    principal: &ServicePrincipal,
) -> Result<ArmToken, AuthError> {
    let url = format!(
        "{}/{}/oauth2/v2.0/token",
        login_endpoint()?,
        principal.tenant_id
    );
    let params = [
        ("grant_type", "client_credentials"),
        ("client_id", principal.client_id.as_str()),
        ("client_secret", principal.client_secret.as_str()),
        ("scope", ARM_SCOPE),
    ];

    let response = client.post(&url).form(&params).send().await?;
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(AuthError::Rejected {
            status: status.as_u16(),
            body,
        });
    }

    let token: TokenResponse = response.json().await?;
    Ok(ArmToken {
        access_token: token.access_token,
    })
}
