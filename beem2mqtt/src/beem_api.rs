use crate::error::ApiError;
use crate::token::Token;

use chrono::{Datelike, Local};
use log::debug;
use serde::{Deserialize, Deserializer, Serialize};

pub const DEFAULT_BASE_URL: &str = "https://api-x.beem.energy/beemapp";

static LOGIN_ENDPOINT: &str = "/user/login";
static SUMMARY_ENDPOINT: &str = "/box/summary";

// the API answers both endpoints with 201 Created
const STATUS_CREATED: u16 = 201;

#[derive(Clone, Serialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

/// Month and year the summary is requested for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Period {
    pub month: u32,
    pub year: i32,
}

impl Period {
    /// The local calendar month at call time.
    pub fn current() -> Self {
        let now = Local::now();
        Self {
            month: now.month(),
            year: now.year(),
        }
    }
}

/// One Beem box as reported by the summary endpoint.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BoxSummary {
    #[serde(deserialize_with = "null_as_default")]
    pub box_id: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(deserialize_with = "null_as_default")]
    pub last_alive: String,
    #[serde(deserialize_with = "null_as_default")]
    pub last_production: String,
    #[serde(deserialize_with = "null_as_default")]
    pub serial_number: String,
    #[serde(deserialize_with = "null_as_default")]
    pub total_month: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub watt_hour: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub total_day: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub year: i32,
    #[serde(deserialize_with = "null_as_default")]
    pub month: u32,
    #[serde(deserialize_with = "null_as_default")]
    pub last_dbm: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub power: i64,
    pub weather: Option<String>,
}

// the API sends `null` for fields a box has never reported
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Deserialize)]
struct LoginResponse {
    #[serde(rename = "accessToken")]
    access_token: Option<String>,
}

/// The two calls a cycle needs from the Beem cloud.
///
/// Both are single attempts; retrying is left to the next cycle.
pub trait BeemBackend {
    fn login(&self, credentials: &Credentials) -> Result<Token, ApiError>;

    fn box_summary(&self, token: &Token, period: Period) -> Result<Vec<BoxSummary>, ApiError>;
}

pub struct BeemApi {
    base_url: String,
    client: reqwest::blocking::Client,
}

impl BeemApi {
    pub fn new(base_url: &str) -> Result<Self, ApiError> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    fn post<T: Serialize>(
        &self,
        endpoint: &str,
        body: &T,
        token: Option<&Token>,
    ) -> Result<(u16, String), ApiError> {
        let url = format!("{}{}", self.base_url, endpoint);
        debug!("POST {url}");

        let mut request = self.client.post(&url).json(body);
        if let Some(token) = token {
            request = request.bearer_auth(token.as_str());
        }
        let response = request.send()?;
        let status = response.status().as_u16();
        let body = response.text()?;
        Ok((status, body))
    }
}

impl BeemBackend for BeemApi {
    fn login(&self, credentials: &Credentials) -> Result<Token, ApiError> {
        let (status, body) = self.post(LOGIN_ENDPOINT, credentials, None)?;
        parse_login_response(status, &body)
    }

    fn box_summary(&self, token: &Token, period: Period) -> Result<Vec<BoxSummary>, ApiError> {
        debug!(
            "fetching box summary for {:02}/{}",
            period.month, period.year
        );
        let (status, body) = self.post(SUMMARY_ENDPOINT, &period, Some(token))?;
        parse_summary_response(status, &body)
    }
}

pub fn parse_login_response(status: u16, body: &str) -> Result<Token, ApiError> {
    if status != STATUS_CREATED {
        return Err(ApiError::Status {
            operation: "login",
            status,
            body: body.to_string(),
        });
    }

    let response: LoginResponse =
        serde_json::from_str(body).map_err(|source| ApiError::Decode {
            operation: "login",
            source,
        })?;

    match response.access_token {
        Some(token) if !token.is_empty() => Ok(Token::new(token)),
        _ => Err(ApiError::MissingToken),
    }
}

pub fn parse_summary_response(status: u16, body: &str) -> Result<Vec<BoxSummary>, ApiError> {
    if status != STATUS_CREATED {
        return Err(ApiError::Status {
            operation: "summary request",
            status,
            body: body.to_string(),
        });
    }

    serde_json::from_str(body).map_err(|source| ApiError::Decode {
        operation: "summary",
        source,
    })
}
