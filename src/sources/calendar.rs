use std::fs;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::config::Config;
use crate::domain::{CalendarEvent, EventStart};
use crate::errors::{PlannerError, PlannerResult};
use crate::logging::Logger;
use crate::patch::{Document, FieldBinding};
use crate::sources::traits::DashboardSource;

const STREAM: &str = "calendar";

/// The calendar task has no configured interval; the original refreshed
/// every twelve hours.
const CALENDAR_INTERVAL: Duration = Duration::from_secs(12 * 3600);

const EVENTS_ENDPOINT: &str = "https://www.googleapis.com/calendar/v3/calendars/primary/events";
const CALENDAR_SCOPE: &str = "https://www.googleapis.com/auth/calendar.readonly";
const OOB_REDIRECT: &str = "urn:ietf:wg:oauth:2.0:oob";

/// How a request obtains a bearer token. The interactive installed-app
/// flow is one implementation; pre-provisioned tokens are another.
#[cfg_attr(test, mockall::automock)]
pub trait CredentialProvider: Send {
    fn access_token(&self) -> PlannerResult<String>;
}

#[derive(Debug, Deserialize)]
struct ClientSecretFile {
    installed: ClientSecret,
}

#[derive(Debug, Deserialize, Clone)]
struct ClientSecret {
    client_id: String,
    client_secret: String,
    auth_uri: String,
    token_uri: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
struct StoredToken {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expiry: Option<DateTime<Utc>>,
}

impl StoredToken {
    fn expired(&self) -> bool {
        match self.expiry {
            // A minute of slack so a token never expires mid-request.
            Some(expiry) => Utc::now() + chrono::Duration::seconds(60) >= expiry,
            None => false,
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
}

/// Installed-application OAuth2 flow: a local client secret, a cached
/// token file, non-interactive refresh while a refresh token is valid,
/// and a one-time interactive authorization (paste a code from the
/// browser) when nothing usable is cached.
#[derive(Debug)]
pub struct InstalledFlowProvider {
    client: Client,
    secret: ClientSecret,
    token_path: PathBuf,
}

impl InstalledFlowProvider {
    /// Missing or unparseable client secrets are a startup failure, not a
    /// per-cycle one.
    pub fn from_files<P: AsRef<Path>>(secret_path: P, token_path: P) -> PlannerResult<Self> {
        let secret_path = secret_path.as_ref();
        let raw = fs::read_to_string(secret_path).map_err(|e| {
            PlannerError::Credentials(format!(
                "cannot read client secret {}: {}",
                secret_path.display(),
                e
            ))
        })?;
        let parsed: ClientSecretFile = serde_json::from_str(&raw).map_err(|e| {
            PlannerError::Credentials(format!(
                "cannot parse client secret {}: {}",
                secret_path.display(),
                e
            ))
        })?;

        Ok(Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(30))
                .build()
                .unwrap_or_else(|_| Client::new()),
            secret: parsed.installed,
            token_path: token_path.as_ref().to_path_buf(),
        })
    }

    fn cached_token(&self) -> Option<StoredToken> {
        let raw = fs::read_to_string(&self.token_path).ok()?;
        serde_json::from_str(&raw).ok()
    }

    fn save_token(&self, token: &StoredToken) -> PlannerResult<()> {
        let raw = serde_json::to_string(token)?;
        fs::write(&self.token_path, raw)?;
        Ok(())
    }

    fn refresh(&self, refresh_token: &str) -> PlannerResult<StoredToken> {
        let response: TokenResponse = self
            .client
            .post(&self.secret.token_uri)
            .form(&[
                ("client_id", self.secret.client_id.as_str()),
                ("client_secret", self.secret.client_secret.as_str()),
                ("refresh_token", refresh_token),
                ("grant_type", "refresh_token"),
            ])
            .send()?
            .error_for_status()?
            .json()?;

        // Refresh responses usually omit the refresh token; keep the one
        // we already have.
        Ok(Self::token_from_response(
            response,
            Some(refresh_token.to_string()),
        ))
    }

    /// Print the authorization URL, then block on stdin for the pasted
    /// code and exchange it for a token.
    fn request_interactive(&self) -> PlannerResult<StoredToken> {
        let auth_url = Url::parse_with_params(
            &self.secret.auth_uri,
            &[
                ("client_id", self.secret.client_id.as_str()),
                ("redirect_uri", OOB_REDIRECT),
                ("response_type", "code"),
                ("scope", CALENDAR_SCOPE),
                ("access_type", "offline"),
            ],
        )
        .map_err(|e| PlannerError::Credentials(format!("invalid auth URI: {}", e)))?;

        println!(
            "Go to the following link in your browser, then paste the authorization code:\n{}",
            auth_url
        );
        print!("Code: ");
        io::stdout().flush()?;

        let mut code = String::new();
        io::stdin().lock().read_line(&mut code)?;
        let code = code.trim();
        if code.is_empty() {
            return Err(PlannerError::Credentials(
                "no authorization code entered".to_string(),
            ));
        }

        let response: TokenResponse = self
            .client
            .post(&self.secret.token_uri)
            .form(&[
                ("client_id", self.secret.client_id.as_str()),
                ("client_secret", self.secret.client_secret.as_str()),
                ("code", code),
                ("redirect_uri", OOB_REDIRECT),
                ("grant_type", "authorization_code"),
            ])
            .send()?
            .error_for_status()?
            .json()?;

        Ok(Self::token_from_response(response, None))
    }

    fn token_from_response(
        response: TokenResponse,
        fallback_refresh: Option<String>,
    ) -> StoredToken {
        StoredToken {
            access_token: response.access_token,
            refresh_token: response.refresh_token.or(fallback_refresh),
            expiry: response
                .expires_in
                .map(|secs| Utc::now() + chrono::Duration::seconds(secs)),
        }
    }
}

impl CredentialProvider for InstalledFlowProvider {
    fn access_token(&self) -> PlannerResult<String> {
        let cached = self.cached_token();

        if let Some(token) = &cached {
            if !token.expired() {
                return Ok(token.access_token.clone());
            }
            if let Some(refresh_token) = &token.refresh_token {
                let fresh = self.refresh(refresh_token)?;
                self.save_token(&fresh)?;
                return Ok(fresh.access_token);
            }
        }

        let fresh = self.request_interactive()?;
        self.save_token(&fresh)?;
        Ok(fresh.access_token)
    }
}

// Wire shapes for the events listing.
#[derive(Debug, Deserialize)]
struct EventsResponse {
    #[serde(default)]
    items: Vec<RawEvent>,
}

#[derive(Debug, Deserialize)]
struct RawEvent {
    #[serde(default)]
    summary: Option<String>,
    #[serde(default)]
    start: Option<RawEventTime>,
}

#[derive(Debug, Deserialize)]
struct RawEventTime {
    #[serde(default)]
    date: Option<String>,
    #[serde(rename = "dateTime", default)]
    date_time: Option<String>,
}

pub struct CalendarSource {
    client: Client,
    provider: Box<dyn CredentialProvider>,
    html_file: PathBuf,
    logger: Logger,
}

impl CalendarSource {
    pub fn new(config: &Config, provider: Box<dyn CredentialProvider>, logger: Logger) -> Self {
        Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(30))
                .build()
                .unwrap_or_else(|_| Client::new()),
            provider,
            html_file: PathBuf::from(&config.html_file),
            logger,
        }
    }

    fn fetch(&self) -> PlannerResult<Vec<CalendarEvent>> {
        let token = self.provider.access_token()?;

        let now = Utc::now().to_rfc3339();
        let url = Url::parse_with_params(
            EVENTS_ENDPOINT,
            &[
                ("maxResults", "10"),
                ("orderBy", "startTime"),
                ("singleEvents", "true"),
                ("showDeleted", "false"),
                ("timeMin", now.as_str()),
            ],
        )
        .map_err(|e| PlannerError::Config(format!("invalid events endpoint: {}", e)))?;

        let response: EventsResponse = self
            .client
            .get(url)
            .bearer_auth(token)
            .send()?
            .error_for_status()?
            .json()?;

        Ok(Self::events_from_response(response))
    }

    fn events_from_response(response: EventsResponse) -> Vec<CalendarEvent> {
        response
            .items
            .into_iter()
            .filter_map(|raw| {
                let summary = raw.summary.unwrap_or_else(|| "(untitled)".to_string());
                let start = Self::parse_start(raw.start?)?;
                Some(CalendarEvent { summary, start })
            })
            .collect()
    }

    fn parse_start(time: RawEventTime) -> Option<EventStart> {
        if let Some(date_time) = time.date_time {
            let parsed = DateTime::parse_from_rfc3339(&date_time).ok()?;
            return Some(EventStart::Timed(parsed.naive_local()));
        }
        if let Some(date) = time.date {
            let parsed = NaiveDate::parse_from_str(&date, "%Y-%m-%d").ok()?;
            return Some(EventStart::AllDay(parsed));
        }
        None
    }

    fn bindings(events: &[CalendarEvent]) -> Vec<FieldBinding> {
        events
            .iter()
            .enumerate()
            .map(|(i, event)| {
                let n = i + 1;
                FieldBinding::text(
                    format!("item{}", n),
                    format!("<li id=\"item{}\">", n),
                    format!("<!-- e{} --></li>", n),
                    event.display_line(),
                )
            })
            .collect()
    }
}

impl DashboardSource for CalendarSource {
    fn name(&self) -> &'static str {
        "calendar"
    }

    fn log_stream(&self) -> &'static str {
        STREAM
    }

    fn interval(&self) -> Duration {
        CALENDAR_INTERVAL
    }

    fn refresh(&self) -> PlannerResult<()> {
        let events = self.fetch()?;

        self.logger.info(STREAM, "upcoming events:");
        if events.is_empty() {
            // No placeholder text: the event-list markers stay untouched.
            self.logger.info(STREAM, "no upcoming events found");
            return Ok(());
        }
        for event in &events {
            self.logger.info(STREAM, &event.display_line());
        }

        let mut doc = Document::load(&self.html_file)?;
        for name in doc.apply(&Self::bindings(&events)) {
            self.logger.warn(
                STREAM,
                &format!("marker pair for '{}' not found; field left unchanged", name),
            );
        }
        doc.save()?;

        self.logger.info(STREAM, "finished calendar refresh");
        Ok(())
    }
}
