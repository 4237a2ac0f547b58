//! Google Sheets v4 publisher.
//!
//! Authenticates with a service-account key (JWT bearer grant) or a
//! pre-issued access token, creates the destination tab when it is missing,
//! clears it and writes the rows anchored at the configured top-left cell.

use async_trait::async_trait;
use chrono::Utc;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info};

use crate::error::JobError;
use crate::publish::TablePublisher;

pub const SHEETS_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets";
pub const DEFAULT_SHEETS_BASE_URL: &str = "https://sheets.googleapis.com/v4";
pub const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const TOKEN_LIFETIME_SECONDS: i64 = 60 * 60;

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default)]
    pub private_key_id: Option<String>,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credentials {
    ServiceAccount(ServiceAccountKey),
    AccessToken(String),
}

impl Credentials {
    pub fn from_service_account_json(json: &str) -> Result<Self, JobError> {
        let key = serde_json::from_str::<ServiceAccountKey>(json)
            .map_err(|error| JobError::Auth(format!("invalid service account key: {error}")))?;
        Ok(Self::ServiceAccount(key))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum ValueInputOption {
    /// Store values exactly as extracted.
    #[default]
    Raw,
    /// Let Sheets parse numbers and dates as if typed by a user.
    UserEntered,
}

impl ValueInputOption {
    pub const fn as_query_value(self) -> &'static str {
        match self {
            Self::Raw => "RAW",
            Self::UserEntered => "USER_ENTERED",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetTarget {
    pub spreadsheet_id: String,
    pub tab: String,
    pub top_left: String,
}

/// Quotes a tab title for use in A1 notation.
pub fn quote_sheet_title(title: &str) -> String {
    format!("'{}'", title.replace('\'', "''"))
}

pub fn a1_range(tab: &str, cell: &str) -> String {
    format!("{}!{cell}", quote_sheet_title(tab))
}

#[derive(Debug, Serialize)]
struct JwtClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct SpreadsheetMeta {
    #[serde(default)]
    sheets: Vec<SheetEntry>,
}

#[derive(Debug, Deserialize)]
struct SheetEntry {
    properties: SheetProperties,
}

#[derive(Debug, Deserialize)]
struct SheetProperties {
    title: String,
}

#[derive(Debug, Clone)]
pub struct SheetsClient {
    http: reqwest::Client,
    base_url: String,
    credentials: Credentials,
}

impl SheetsClient {
    pub fn new(credentials: Credentials) -> Self {
        Self::with_base_url(credentials, DEFAULT_SHEETS_BASE_URL)
    }

    pub fn with_base_url(credentials: Credentials, base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            credentials,
        }
    }

    pub async fn access_token(&self) -> Result<String, JobError> {
        match &self.credentials {
            Credentials::AccessToken(token) => Ok(token.clone()),
            Credentials::ServiceAccount(key) => self.exchange_service_account(key).await,
        }
    }

    async fn exchange_service_account(&self, key: &ServiceAccountKey) -> Result<String, JobError> {
        let now = Utc::now().timestamp();
        let claims = JwtClaims {
            iss: &key.client_email,
            scope: SHEETS_SCOPE,
            aud: &key.token_uri,
            iat: now,
            exp: now + TOKEN_LIFETIME_SECONDS,
        };
        let mut header = Header::new(Algorithm::RS256);
        header.kid.clone_from(&key.private_key_id);
        let signing_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes())?;
        let assertion = jsonwebtoken::encode(&header, &claims, &signing_key)?;

        debug!("requesting access token for {}", key.client_email);
        let response = self
            .http
            .post(&key.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(JobError::Auth(format!(
                "token exchange failed: status {status}: {body}"
            )));
        }

        let token = response.json::<TokenResponse>().await?;
        Ok(token.access_token)
    }

    pub async fn sheet_titles(
        &self,
        token: &str,
        spreadsheet_id: &str,
    ) -> Result<Vec<String>, JobError> {
        let url = format!(
            "{}/spreadsheets/{}",
            self.base_url,
            urlencoding::encode(spreadsheet_id)
        );
        let response = self
            .http
            .get(url)
            .bearer_auth(token)
            .query(&[("fields", "sheets.properties.title")])
            .send()
            .await?;
        let meta = ensure_success(response, "spreadsheet lookup")
            .await?
            .json::<SpreadsheetMeta>()
            .await?;
        Ok(meta
            .sheets
            .into_iter()
            .map(|sheet| sheet.properties.title)
            .collect())
    }

    pub async fn add_sheet(
        &self,
        token: &str,
        spreadsheet_id: &str,
        title: &str,
    ) -> Result<(), JobError> {
        let url = format!(
            "{}/spreadsheets/{}:batchUpdate",
            self.base_url,
            urlencoding::encode(spreadsheet_id)
        );
        let body = json!({
            "requests": [{ "addSheet": { "properties": { "title": title } } }]
        });
        let response = self
            .http
            .post(url)
            .bearer_auth(token)
            .json(&body)
            .send()
            .await?;
        ensure_success(response, "add sheet").await?;
        Ok(())
    }

    pub async fn clear(&self, token: &str, spreadsheet_id: &str, range: &str) -> Result<(), JobError> {
        let url = format!("{}:clear", self.values_url(spreadsheet_id, range));
        let response = self
            .http
            .post(url)
            .bearer_auth(token)
            .json(&json!({}))
            .send()
            .await?;
        ensure_success(response, "clear range").await?;
        Ok(())
    }

    pub async fn update(
        &self,
        token: &str,
        spreadsheet_id: &str,
        range: &str,
        rows: &[Vec<String>],
        value_input: ValueInputOption,
    ) -> Result<(), JobError> {
        let body = json!({
            "range": range,
            "majorDimension": "ROWS",
            "values": rows,
        });
        let response = self
            .http
            .put(self.values_url(spreadsheet_id, range))
            .bearer_auth(token)
            .query(&[("valueInputOption", value_input.as_query_value())])
            .json(&body)
            .send()
            .await?;
        ensure_success(response, "update values").await?;
        Ok(())
    }

    fn values_url(&self, spreadsheet_id: &str, range: &str) -> String {
        format!(
            "{}/spreadsheets/{}/values/{}",
            self.base_url,
            urlencoding::encode(spreadsheet_id),
            urlencoding::encode(range)
        )
    }
}

async fn ensure_success(
    response: reqwest::Response,
    action: &str,
) -> Result<reqwest::Response, JobError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(JobError::Publish(format!(
        "{action} failed: status {status}: {body}"
    )))
}

#[derive(Debug, Clone)]
pub struct SheetsPublisher {
    client: SheetsClient,
    target: SheetTarget,
    value_input: ValueInputOption,
}

impl SheetsPublisher {
    pub fn new(client: SheetsClient, target: SheetTarget, value_input: ValueInputOption) -> Self {
        Self {
            client,
            target,
            value_input,
        }
    }
}

#[async_trait]
impl TablePublisher for SheetsPublisher {
    async fn publish(&self, rows: &[Vec<String>]) -> Result<(), JobError> {
        let SheetTarget {
            spreadsheet_id,
            tab,
            top_left,
        } = &self.target;
        let token = self.client.access_token().await?;

        let titles = self.client.sheet_titles(&token, spreadsheet_id).await?;
        if !titles.iter().any(|title| title == tab) {
            info!("creating missing tab '{tab}'");
            self.client.add_sheet(&token, spreadsheet_id, tab).await?;
        }

        self.client
            .clear(&token, spreadsheet_id, &quote_sheet_title(tab))
            .await?;
        self.client
            .update(
                &token,
                spreadsheet_id,
                &a1_range(tab, top_left),
                rows,
                self.value_input,
            )
            .await?;

        info!(
            "wrote {} row(s) to spreadsheet {spreadsheet_id} tab '{tab}'",
            rows.len()
        );
        Ok(())
    }

    fn describe(&self) -> String {
        format!(
            "sheets:{}/{}",
            self.target.spreadsheet_id,
            a1_range(&self.target.tab, &self.target.top_left)
        )
    }
}
