use crate::config::Config;
use crate::errors::AppError;
use crate::models::*;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;
use url::Url;

/// Result of a single lookup attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupOutcome {
    Success(LookupRecord),
    Failure(String),
}

impl LookupOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, LookupOutcome::Success(_))
    }
}

impl From<Result<LookupRecord, AppError>> for LookupOutcome {
    fn from(result: Result<LookupRecord, AppError>) -> Self {
        match result {
            Ok(record) => LookupOutcome::Success(record),
            Err(e) => LookupOutcome::Failure(e.to_string()),
        }
    }
}

fn build_client(timeout: Duration, name: &str) -> Result<Client, AppError> {
    Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| AppError::ExternalApiError(format!("Failed to create {} client: {}", name, e)))
}

/// Parses a configured endpoint so a bad URL fails before any request.
fn parse_base_url(raw: &str, name: &str) -> Result<Url, AppError> {
    let url = Url::parse(raw)
        .map_err(|e| AppError::ConfigError(format!("Invalid {} URL '{}': {}", name, raw, e)))?;
    if url.cannot_be_a_base() {
        return Err(AppError::ConfigError(format!(
            "Invalid {} URL '{}': not a base URL",
            name, raw
        )));
    }
    Ok(url)
}

/// Issues `GET base_url?x=<phone>&pi=<token>` and returns the raw body.
///
/// Transport errors, non-2xx statuses and empty bodies are errors.
async fn get_body(
    client: &Client,
    base_url: &Url,
    api_name: &str,
    phone: &str,
    token: &str,
) -> Result<String, AppError> {
    let mut url = base_url.clone();
    url.query_pairs_mut()
        .append_pair("x", phone)
        .append_pair("pi", token);

    let response = client.get(url).send().await.map_err(|e| {
        AppError::ExternalApiError(format!("{} request failed: {}", api_name, e))
    })?;

    let status = response.status();
    let body = response.text().await.map_err(|e| {
        AppError::ExternalApiError(format!("Failed to read {} response: {}", api_name, e))
    })?;
    tracing::debug!("[{} Response] {}: {}", api_name, status, body);

    if !status.is_success() {
        return Err(AppError::ExternalApiError(format!(
            "{} returned status {}",
            api_name, status
        )));
    }
    if body.trim().is_empty() {
        return Err(AppError::InvalidPayload(format!(
            "{} returned an empty body",
            api_name
        )));
    }

    Ok(body)
}

/// Parses `body` into `T`, accepting only a top-level JSON object.
fn parse_object<T: DeserializeOwned>(body: &str, api_name: &str) -> Result<T, AppError> {
    let value: Value = serde_json::from_str(body).map_err(|e| {
        AppError::InvalidPayload(format!("Failed to parse {} response: {}", api_name, e))
    })?;
    if !value.is_object() {
        return Err(AppError::InvalidPayload(format!(
            "{} response is not a JSON object",
            api_name
        )));
    }
    serde_json::from_value(value).map_err(|e| {
        AppError::InvalidPayload(format!("Unexpected {} response shape: {}", api_name, e))
    })
}

// ============ Person API ============

pub struct PersonApiService {
    client: Client,
    base_url: Url,
}

impl PersonApiService {
    pub fn new(config: &Config) -> Result<Self, AppError> {
        Ok(Self {
            client: build_client(config.http_timeout, "Person API")?,
            base_url: parse_base_url(&config.person_api_url, "Person API")?,
        })
    }

    /// One attempt at fetching the Person record for `phone`.
    pub async fn fetch(&self, phone: &str, token: &str) -> LookupOutcome {
        self.try_fetch(phone, token).await.into()
    }

    async fn try_fetch(&self, phone: &str, token: &str) -> Result<LookupRecord, AppError> {
        let body = get_body(&self.client, &self.base_url, "Person API", phone, token).await?;
        parse_person_response(phone, &body)
    }
}

/// Extracts the first person and their first address.
///
/// A missing or empty `person` list is an error; missing sub-fields fall back
/// to the sentinel.
pub fn parse_person_response(phone: &str, body: &str) -> Result<LookupRecord, AppError> {
    let data: PersonApiResponse = parse_object(body, "Person API")?;

    let first_person = data
        .person
        .unwrap_or_default()
        .into_iter()
        .next()
        .ok_or_else(|| AppError::InvalidPayload("Empty person data returned".to_string()))?;

    let first_address = first_person
        .addresses
        .and_then(|list| list.into_iter().next())
        .unwrap_or_default();

    let mut record = LookupRecord::new(phone);
    record.set(FIELD_NAME, field_text(first_person.name.as_ref()));
    record.set(FIELD_DOB, field_text(first_person.dob.as_ref()));
    record.set(FIELD_AGE, field_text(first_person.age.as_ref()));
    record.set(FIELD_ADDRESS, field_text(first_address.home.as_ref()));
    record.set(FIELD_CITY, field_text(first_address.city.as_ref()));
    record.set(FIELD_STATE, field_text(first_address.state.as_ref()));
    record.set(FIELD_ZIP, field_text(first_address.zip.as_ref()));
    Ok(record)
}

// ============ TCPA API ============

pub struct TcpaApiService {
    client: Client,
    base_url: Url,
}

impl TcpaApiService {
    pub fn new(config: &Config) -> Result<Self, AppError> {
        Ok(Self {
            client: build_client(config.http_timeout, "TCPA API")?,
            base_url: parse_base_url(&config.tcpa_api_url, "TCPA API")?,
        })
    }

    /// One attempt at fetching the DNC status for `phone`.
    pub async fn fetch(&self, phone: &str, token: &str) -> LookupOutcome {
        self.try_fetch(phone, token).await.into()
    }

    async fn try_fetch(&self, phone: &str, token: &str) -> Result<LookupRecord, AppError> {
        let body = get_body(&self.client, &self.base_url, "TCPA API", phone, token).await?;
        parse_tcpa_response(phone, &body)
    }
}

/// Reads the DNC flags. The API's `phone` echo is ignored; the record keeps
/// the input identifier.
pub fn parse_tcpa_response(phone: &str, body: &str) -> Result<LookupRecord, AppError> {
    let data: TcpaApiResponse = parse_object(body, "TCPA API")?;

    if let Some(echo) = data.phone.as_ref().map(|v| field_text(Some(v))) {
        if echo != phone {
            tracing::debug!("TCPA API echoed phone {} for {}", echo, phone);
        }
    }

    let mut record = LookupRecord::new(phone);
    record.set(FIELD_NATIONAL_DNC, field_text(data.ndnc.as_ref()));
    record.set(FIELD_STATE_DNC, field_text(data.sdnc.as_ref()));
    record.set(FIELD_BLACKLISTED, field_text(data.listed.as_ref()));
    record.set(FIELD_STATE, field_text(data.state.as_ref()));
    Ok(record)
}

// ============ Unified Lookup ============

/// One of the two remote lookups, addressed uniformly by the pipeline.
pub enum LookupService {
    Person(PersonApiService),
    Tcpa(TcpaApiService),
}

impl LookupService {
    pub fn name(&self) -> &'static str {
        match self {
            LookupService::Person(_) => "Person",
            LookupService::Tcpa(_) => "TCPA",
        }
    }

    /// Fields this lookup fills in (besides `Phone`).
    pub fn fields(&self) -> &'static [&'static str] {
        match self {
            LookupService::Person(_) => &PERSON_FIELDS,
            LookupService::Tcpa(_) => &TCPA_FIELDS,
        }
    }

    /// The fully sentinel-filled record used after all attempts fail.
    pub fn default_record(&self, phone: &str) -> LookupRecord {
        LookupRecord::sentinel(phone, self.fields())
    }

    pub async fn fetch(&self, phone: &str, token: &str) -> LookupOutcome {
        match self {
            LookupService::Person(service) => service.fetch(phone, token).await,
            LookupService::Tcpa(service) => service.fetch(phone, token).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_person_takes_first_person_and_address() {
        let body = r#"{"person":[
            {"name":"Jane Roe","dob":"1980-02-03","age":44,
             "addresses":[{"home":"1 Main St","city":"Austin","state":"TX","zip":"73301"},
                          {"home":"2 Side St","city":"Dallas","state":"TX","zip":"75001"}]},
            {"name":"John Roe"}]}"#;

        let record = parse_person_response("15551234567", body).unwrap();
        assert_eq!(record.phone(), "15551234567");
        assert_eq!(record.get(FIELD_NAME), Some("Jane Roe"));
        assert_eq!(record.get(FIELD_AGE), Some("44"));
        assert_eq!(record.get(FIELD_ADDRESS), Some("1 Main St"));
        assert_eq!(record.get(FIELD_ZIP), Some("73301"));
    }

    #[test]
    fn test_parse_person_without_addresses_uses_sentinel() {
        let body = r#"{"person":[{"name":"Jane Roe"}]}"#;
        let record = parse_person_response("1", body).unwrap();
        assert_eq!(record.get(FIELD_NAME), Some("Jane Roe"));
        assert_eq!(record.get(FIELD_DOB), Some(SENTINEL));
        assert!(record.is_sentinel_for(&[FIELD_ADDRESS, FIELD_CITY, FIELD_STATE, FIELD_ZIP]));
    }

    #[test]
    fn test_parse_person_empty_list_is_error() {
        assert!(parse_person_response("1", r#"{"person":[]}"#).is_err());
        assert!(parse_person_response("1", r#"{}"#).is_err());
        assert!(parse_person_response("1", r#"{"person":null}"#).is_err());
    }

    #[test]
    fn test_parse_person_wrong_shape_is_error() {
        assert!(parse_person_response("1", r#"["not","an","object"]"#).is_err());
        assert!(parse_person_response("1", r#"{"person":"Jane"}"#).is_err());
        assert!(parse_person_response("1", "<html>oops</html>").is_err());
    }

    #[test]
    fn test_parse_tcpa_keeps_input_phone() {
        let body = r#"{"phone":"5551234567","ndnc":"Yes","sdnc":"No","listed":false,"state":"FL"}"#;
        let record = parse_tcpa_response("15551234567", body).unwrap();
        assert_eq!(record.phone(), "15551234567");
        assert_eq!(record.get(FIELD_NATIONAL_DNC), Some("Yes"));
        assert_eq!(record.get(FIELD_STATE_DNC), Some("No"));
        assert_eq!(record.get(FIELD_BLACKLISTED), Some("false"));
        assert_eq!(record.get(FIELD_STATE), Some("FL"));
    }

    #[test]
    fn test_parse_tcpa_rejects_non_object() {
        assert!(parse_tcpa_response("1", r#"["Yes","No","false","FL"]"#).is_err());
        assert!(parse_tcpa_response("1", "null").is_err());
        assert!(parse_tcpa_response("1", "not json").is_err());
    }

    #[test]
    fn test_parse_tcpa_missing_fields_use_sentinel() {
        let record = parse_tcpa_response("1", r#"{"ndnc":"No"}"#).unwrap();
        assert_eq!(record.get(FIELD_NATIONAL_DNC), Some("No"));
        assert!(record.is_sentinel_for(&[FIELD_STATE_DNC, FIELD_BLACKLISTED, FIELD_STATE]));
    }

    #[test]
    fn test_outcome_from_result() {
        let ok: LookupOutcome = Ok(LookupRecord::new("1")).into();
        assert!(ok.is_success());
        let err: LookupOutcome = Err(AppError::InvalidPayload("bad".to_string())).into();
        assert_eq!(err, LookupOutcome::Failure("Invalid payload: bad".to_string()));
    }

    #[tokio::test]
    async fn test_service_creation() {
        let service = PersonApiService::new(&Config::default());
        assert!(service.is_ok());
    }

    #[test]
    fn test_invalid_endpoint_is_config_error() {
        let config = Config {
            tcpa_api_url: "not a url".to_string(),
            ..Config::default()
        };
        assert!(matches!(
            TcpaApiService::new(&config),
            Err(AppError::ConfigError(_))
        ));
        assert!(matches!(
            parse_base_url("mailto:ops@example.com", "TCPA API"),
            Err(AppError::ConfigError(_))
        ));
    }
}
