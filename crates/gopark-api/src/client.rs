// Async HTTP client for the GoPark REST API.
//
// Base path: /api/v1/
// Auth: `Authorization: Bearer <token>` once a session token is set.

use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwapOption;
use reqwest::Method;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use crate::Error;
use crate::transport::TransportConfig;
use crate::types;

/// Default REST base URL used when nothing is configured.
pub const DEFAULT_BASE_URL: &str = "http://localhost:3000/api/v1";

/// Query parameters; `None` values are skipped.
type Query<'a> = [(&'a str, Option<String>)];

// ── Error response shape ─────────────────────────────────────────────

#[derive(serde::Deserialize)]
struct ErrorResponse {
    #[serde(default)]
    message: Option<serde_json::Value>,
}

// ── Client ───────────────────────────────────────────────────────────

/// Async client for the GoPark REST API.
///
/// The bearer token can be swapped at any time (login/logout) without
/// rebuilding the client; in-flight requests keep the token they started with.
pub struct ApiClient {
    http: reqwest::Client,
    base_url: Url,
    timeout: Duration,
    token: ArcSwapOption<SecretString>,
}

impl ApiClient {
    // ── Constructors ─────────────────────────────────────────────────

    /// Build from a base URL and transport config.
    pub fn new(base_url: &str, transport: &TransportConfig) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Self::from_reqwest(base_url, http, transport.timeout)
    }

    /// Wrap an existing `reqwest::Client`.
    pub fn from_reqwest(base_url: &str, http: reqwest::Client, timeout: Duration) -> Result<Self, Error> {
        Ok(Self {
            http,
            base_url: Self::normalize_base_url(base_url)?,
            timeout,
            token: ArcSwapOption::empty(),
        })
    }

    /// Parse the base URL and make sure its path ends with `/` so relative
    /// endpoint paths join underneath it.
    fn normalize_base_url(raw: &str) -> Result<Url, Error> {
        let mut url = Url::parse(raw.trim_end_matches('/'))?;
        let path = format!("{}/", url.path().trim_end_matches('/'));
        url.set_path(&path);
        Ok(url)
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Override the per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    // ── Session token ────────────────────────────────────────────────

    /// Install the bearer token sent with every subsequent request.
    pub fn set_token(&self, token: SecretString) {
        self.token.store(Some(Arc::new(token)));
    }

    pub fn clear_token(&self) {
        self.token.store(None);
    }

    pub fn has_token(&self) -> bool {
        self.token.load().is_some()
    }

    // ── Request plumbing ─────────────────────────────────────────────

    fn url(&self, path: &str) -> Result<Url, Error> {
        Ok(self.base_url.join(path.trim_start_matches('/'))?)
    }

    fn request(&self, method: Method, path: &str, query: &Query<'_>) -> Result<reqwest::RequestBuilder, Error> {
        let url = self.url(path)?;
        debug!("{method} {url}");

        let params: Vec<(&str, &str)> = query
            .iter()
            .filter_map(|(k, v)| v.as_deref().map(|v| (*k, v)))
            .collect();

        let mut req = self.http.request(method, url).timeout(self.timeout);
        if !params.is_empty() {
            req = req.query(&params);
        }
        if let Some(token) = self.token.load_full() {
            req = req.bearer_auth(token.expose_secret());
        }
        Ok(req)
    }

    async fn send(&self, req: reqwest::RequestBuilder) -> Result<reqwest::Response, Error> {
        req.send().await.map_err(|e| {
            if e.is_timeout() {
                Error::Timeout {
                    timeout_secs: self.timeout.as_secs(),
                }
            } else {
                Error::Transport(e)
            }
        })
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        query: &Query<'_>,
    ) -> Result<T, Error> {
        let req = self.request(method, path, query)?;
        let resp = self.send(req).await?;
        Self::handle_response(resp).await
    }

    async fn call_with_body<T: DeserializeOwned, B: Serialize + Sync + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: &B,
    ) -> Result<T, Error> {
        let req = self.request(method, path, &[])?.json(body);
        let resp = self.send(req).await?;
        Self::handle_response(resp).await
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, Error> {
        self.call(Method::GET, path, &[]).await
    }

    async fn post<T: DeserializeOwned, B: Serialize + Sync + ?Sized>(&self, path: &str, body: &B) -> Result<T, Error> {
        self.call_with_body(Method::POST, path, body).await
    }

    async fn put<T: DeserializeOwned, B: Serialize + Sync + ?Sized>(&self, path: &str, body: &B) -> Result<T, Error> {
        self.call_with_body(Method::PUT, path, body).await
    }

    async fn delete(&self, path: &str) -> Result<(), Error> {
        let req = self.request(Method::DELETE, path, &[])?;
        let resp = self.send(req).await?;
        let status = resp.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(Self::parse_error(status, resp).await)
        }
    }

    // ── Response handling ────────────────────────────────────────────

    async fn handle_response<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, Error> {
        let status = resp.status();
        if !status.is_success() {
            return Err(Self::parse_error(status, resp).await);
        }

        let body = resp.text().await?;
        // Empty bodies decode as `null` so `()` and `Option<T>` responses work.
        let text = if body.trim().is_empty() { "null" } else { body.as_str() };
        serde_json::from_str(text).map_err(|e| {
            let preview: String = body.chars().take(200).collect();
            Error::Deserialization {
                message: format!("{e} (body preview: {preview:?})"),
                body,
            }
        })
    }

    async fn parse_error(status: reqwest::StatusCode, resp: reqwest::Response) -> Error {
        let raw = resp.text().await.unwrap_or_default();
        let payload = serde_json::from_str::<serde_json::Value>(&raw).ok();

        let message = serde_json::from_str::<ErrorResponse>(&raw)
            .ok()
            .and_then(|e| e.message)
            .and_then(|m| m.as_str().map(str::to_owned))
            .unwrap_or_else(|| format!("Request failed with {}", status.as_u16()));

        Error::Api {
            status: status.as_u16(),
            message,
            payload,
        }
    }

    // ━━ Public API ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    // ── Zones ────────────────────────────────────────────────────────

    /// Zones visible at a gate (all zones when `gate_id` is `None`).
    pub async fn list_zones(&self, gate_id: Option<&str>) -> Result<Vec<types::Zone>, Error> {
        self.call(Method::GET, "master/zones", &[("gateId", gate_id.map(str::to_owned))])
            .await
    }

    pub async fn list_admin_zones(&self) -> Result<Vec<types::Zone>, Error> {
        self.get("admin/zones").await
    }

    pub async fn create_zone(&self, zone: &types::ZoneChanges) -> Result<types::Zone, Error> {
        self.post("admin/zones", zone).await
    }

    pub async fn update_zone(&self, zone_id: &str, zone: &types::ZoneChanges) -> Result<types::Zone, Error> {
        self.put(&format!("admin/zones/{zone_id}"), zone).await
    }

    pub async fn delete_zone(&self, zone_id: &str) -> Result<(), Error> {
        self.delete(&format!("admin/zones/{zone_id}")).await
    }

    /// Open or close a zone for new check-ins.
    pub async fn set_zone_open(&self, zone_id: &str, open: bool) -> Result<types::ZoneOpenState, Error> {
        self.put(
            &format!("admin/zones/{zone_id}/open"),
            &serde_json::json!({ "open": open }),
        )
        .await
    }

    // ── Gates ────────────────────────────────────────────────────────

    pub async fn list_gates(&self) -> Result<Vec<types::Gate>, Error> {
        self.get("master/gates").await
    }

    pub async fn list_admin_gates(&self) -> Result<Vec<types::Gate>, Error> {
        self.get("admin/gates").await
    }

    pub async fn create_gate(&self, gate: &types::GateChanges) -> Result<types::Gate, Error> {
        self.post("admin/gates", gate).await
    }

    pub async fn update_gate(&self, gate_id: &str, gate: &types::GateChanges) -> Result<types::Gate, Error> {
        self.put(&format!("admin/gates/{gate_id}"), gate).await
    }

    pub async fn delete_gate(&self, gate_id: &str) -> Result<(), Error> {
        self.delete(&format!("admin/gates/{gate_id}")).await
    }

    // ── Categories ───────────────────────────────────────────────────

    pub async fn list_categories(&self) -> Result<Vec<types::Category>, Error> {
        self.get("master/categories").await
    }

    pub async fn list_admin_categories(&self) -> Result<Vec<types::Category>, Error> {
        self.get("admin/categories").await
    }

    pub async fn create_category(&self, category: &types::Category) -> Result<types::Category, Error> {
        self.post("admin/categories", category).await
    }

    pub async fn update_category(&self, category: &types::Category) -> Result<types::Category, Error> {
        self.put(&format!("admin/categories/{}", category.id), category)
            .await
    }

    pub async fn delete_category(&self, category_id: &str) -> Result<(), Error> {
        self.delete(&format!("admin/categories/{category_id}")).await
    }

    // ── Rush hours ───────────────────────────────────────────────────

    pub async fn list_rush_hours(&self) -> Result<Vec<types::RushHour>, Error> {
        self.get("admin/rush-hours").await
    }

    pub async fn create_rush_hour(&self, window: &types::RushHour) -> Result<types::RushHour, Error> {
        self.post("admin/rush-hours", window).await
    }

    pub async fn update_rush_hour(&self, id: &str, window: &types::RushHour) -> Result<types::RushHour, Error> {
        self.put(&format!("admin/rush-hours/{id}"), window).await
    }

    pub async fn delete_rush_hour(&self, id: &str) -> Result<(), Error> {
        self.delete(&format!("admin/rush-hours/{id}")).await
    }

    // ── Vacations ────────────────────────────────────────────────────

    pub async fn list_vacations(&self) -> Result<Vec<types::Vacation>, Error> {
        self.get("admin/vacations").await
    }

    pub async fn create_vacation(&self, vacation: &types::Vacation) -> Result<types::Vacation, Error> {
        self.post("admin/vacations", vacation).await
    }

    pub async fn update_vacation(&self, id: &str, vacation: &types::Vacation) -> Result<types::Vacation, Error> {
        self.put(&format!("admin/vacations/{id}"), vacation).await
    }

    pub async fn delete_vacation(&self, id: &str) -> Result<(), Error> {
        self.delete(&format!("admin/vacations/{id}")).await
    }

    // ── Auth & users ─────────────────────────────────────────────────

    /// Exchange credentials for a user record and bearer token.
    ///
    /// Does not install the token; callers decide whether to keep it.
    pub async fn login(&self, username: &str, password: &str) -> Result<types::LoginResponse, Error> {
        self.post("auth/login", &types::LoginRequest { username, password })
            .await
    }

    pub async fn list_users(&self) -> Result<Vec<types::User>, Error> {
        self.get("admin/users").await
    }

    pub async fn create_user(&self, user: &types::NewUser<'_>) -> Result<types::User, Error> {
        self.post("admin/users", user).await
    }

    // ── Subscriptions ────────────────────────────────────────────────

    pub async fn get_subscription(&self, id: &str) -> Result<types::Subscription, Error> {
        self.get(&format!("subscriptions/{id}")).await
    }

    pub async fn create_subscription(&self, subscription: &types::Subscription) -> Result<types::Subscription, Error> {
        self.post("admin/subscriptions", subscription).await
    }

    pub async fn update_subscription(&self, subscription: &types::Subscription) -> Result<types::Subscription, Error> {
        self.put(&format!("admin/subscriptions/{}", subscription.id), subscription)
            .await
    }

    // ── Tickets ──────────────────────────────────────────────────────

    /// Check a visitor or subscriber in; the response carries the new zone state.
    pub async fn check_in(&self, ticket: &types::CheckinRequest) -> Result<types::CheckinResponse, Error> {
        self.post("tickets/checkin", ticket).await
    }

    pub async fn check_out(
        &self,
        ticket_id: &str,
        force_convert_to_visitor: bool,
    ) -> Result<types::CheckoutResponse, Error> {
        self.post(
            "tickets/checkout",
            &types::CheckoutRequest {
                ticket_id,
                force_convert_to_visitor,
            },
        )
        .await
    }

    pub async fn get_ticket(&self, id: &str) -> Result<types::Ticket, Error> {
        self.get(&format!("tickets/{id}")).await
    }

    pub async fn list_admin_tickets(&self, status: Option<&str>) -> Result<Vec<types::Ticket>, Error> {
        self.call(Method::GET, "admin/tickets", &[("status", status.map(str::to_owned))])
            .await
    }

    // ── Reports ──────────────────────────────────────────────────────

    pub async fn parking_state_report(&self) -> Result<Vec<types::ParkingStateReportEntry>, Error> {
        self.get("admin/reports/parking-state").await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn base_url_gets_trailing_slash() {
        let url = ApiClient::normalize_base_url("http://localhost:3000/api/v1").unwrap();
        assert_eq!(url.as_str(), "http://localhost:3000/api/v1/");

        let url = ApiClient::normalize_base_url("http://localhost:3000/api/v1/").unwrap();
        assert_eq!(url.as_str(), "http://localhost:3000/api/v1/");
    }

    #[test]
    fn endpoint_paths_join_under_base() {
        let client = ApiClient::new(DEFAULT_BASE_URL, &TransportConfig::default()).unwrap();
        assert_eq!(
            client.url("admin/zones/z1/open").unwrap().as_str(),
            "http://localhost:3000/api/v1/admin/zones/z1/open"
        );
        assert_eq!(
            client.url("/master/gates").unwrap().as_str(),
            "http://localhost:3000/api/v1/master/gates"
        );
    }

    #[test]
    fn token_can_be_swapped() {
        let client = ApiClient::new(DEFAULT_BASE_URL, &TransportConfig::default()).unwrap();
        assert!(!client.has_token());
        client.set_token(SecretString::from("abc".to_string()));
        assert!(client.has_token());
        client.clear_token();
        assert!(!client.has_token());
    }
}
