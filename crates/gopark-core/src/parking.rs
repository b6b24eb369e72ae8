// ── Parking facade ──
//
// Bundles the REST client, the local read model, the live feed and the
// current session behind the operations a gate or admin view needs.

use std::sync::{Arc, PoisonError, RwLock};

use chrono::{SecondsFormat, Utc};
use gopark_api::ApiClient;
use gopark_api::types::{
    CheckinResponse, CheckoutResponse, Gate, ParkingStateReportEntry, Ticket, TicketType, Zone,
    ZoneOpenState,
};
use secrecy::SecretString;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::CoreError;
use crate::live::{LiveFeed, Subscription};
use crate::session::Session;
use crate::store::DataStore;

/// Who is checking in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckinKind {
    Visitor,
    Subscriber { subscription_id: String },
}

impl CheckinKind {
    fn ticket_type(&self) -> TicketType {
        match self {
            Self::Visitor => TicketType::Visitor,
            Self::Subscriber { .. } => TicketType::Subscriber,
        }
    }
}

/// Entry point for parking workflows.
pub struct Parking {
    api: ApiClient,
    store: Arc<DataStore>,
    feed: LiveFeed,
    session: RwLock<Option<Session>>,
}

impl Parking {
    pub fn new(api: ApiClient, feed: LiveFeed) -> Self {
        Self {
            api,
            store: Arc::new(DataStore::new()),
            feed,
            session: RwLock::new(None),
        }
    }

    /// Resume a previously stored session.
    #[must_use]
    pub fn with_session(self, session: Session) -> Self {
        self.install_session(session);
        self
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn store(&self) -> &Arc<DataStore> {
        &self.store
    }

    pub fn feed(&self) -> &LiveFeed {
        &self.feed
    }

    pub fn session(&self) -> Option<Session> {
        self.session
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    // ── Auth ─────────────────────────────────────────────────────────

    pub async fn login(&self, username: &str, password: &str) -> Result<Session, CoreError> {
        let resp = self.api.login(username, password).await?;
        let session = Session::new(resp.user, SecretString::from(resp.token));
        info!(username = session.username(), role = %session.role(), "logged in");
        self.install_session(session.clone());
        Ok(session)
    }

    /// Forget the session and close the live feed.
    pub fn logout(&self) {
        self.api.clear_token();
        *self.session.write().unwrap_or_else(PoisonError::into_inner) = None;
        self.feed.disconnect();
    }

    fn install_session(&self, session: Session) {
        self.api.set_token(session.token.clone());
        *self.session.write().unwrap_or_else(PoisonError::into_inner) = Some(session);
    }

    fn require_session(&self) -> Result<Session, CoreError> {
        self.session().ok_or(CoreError::NotAuthenticated)
    }

    fn require_admin(&self) -> Result<Session, CoreError> {
        let session = self.require_session()?;
        if session.is_admin() {
            Ok(session)
        } else {
            Err(CoreError::PermissionDenied {
                message: format!("{} is not an admin", session.username()),
            })
        }
    }

    // ── Reads ────────────────────────────────────────────────────────

    pub async fn gates(&self) -> Result<Vec<Gate>, CoreError> {
        Ok(self.api.list_gates().await?)
    }

    /// Fetch zones for `gate_id` and replace the cached list.
    pub async fn load_zones(&self, gate_id: &str) -> Result<Arc<Vec<Zone>>, CoreError> {
        let zones = self.api.list_zones(Some(gate_id)).await?;
        debug!(gate_id, count = zones.len(), "zones loaded");
        Ok(self.store.zones.set(gate_id, zones))
    }

    /// Cached zones for `gate_id`, fetching them on a miss.
    pub async fn zones(&self, gate_id: &str) -> Result<Arc<Vec<Zone>>, CoreError> {
        match self.store.zones.get(gate_id) {
            Some(zones) => Ok(zones),
            None => self.load_zones(gate_id).await,
        }
    }

    pub async fn parking_report(&self) -> Result<Vec<ParkingStateReportEntry>, CoreError> {
        self.require_admin()?;
        Ok(self.api.parking_state_report().await?)
    }

    // ── Tickets ──────────────────────────────────────────────────────

    /// Check a car in at `gate_id` into `zone_id`.
    ///
    /// The returned zone state is reconciled into the gate's cached list.
    pub async fn check_in(
        &self,
        gate_id: &str,
        zone_id: &str,
        kind: CheckinKind,
    ) -> Result<CheckinResponse, CoreError> {
        self.require_session()?;

        let subscription_id = match &kind {
            CheckinKind::Visitor => None,
            CheckinKind::Subscriber { subscription_id } => {
                let id = subscription_id.trim();
                if id.is_empty() {
                    return Err(CoreError::ValidationFailed {
                        message: "subscriber check-in requires a subscription id".into(),
                    });
                }
                Some(id.to_owned())
            }
        };

        let ticket = Ticket {
            id: Uuid::new_v4().to_string(),
            ticket_type: kind.ticket_type(),
            zone_id: zone_id.to_owned(),
            gate_id: gate_id.to_owned(),
            checkin_at: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            checkout_at: None,
            subscription_id,
        };

        let resp = self.api.check_in(&ticket).await.map_err(|e| {
            if e.is_conflict() {
                CoreError::NoAvailableSlots {
                    message: format!("zone {zone_id} has no free slots"),
                }
            } else {
                CoreError::from(e)
            }
        })?;

        self.store.zones.apply_zone_update(gate_id, &resp.zone_state);
        info!(ticket_id = %resp.ticket.id, gate_id, zone_id, "checked in");
        Ok(resp)
    }

    pub async fn check_out(
        &self,
        ticket_id: &str,
        force_convert_to_visitor: bool,
    ) -> Result<CheckoutResponse, CoreError> {
        self.require_session()?;
        let resp = self
            .api
            .check_out(ticket_id, force_convert_to_visitor)
            .await?;
        info!(ticket_id, amount = resp.amount, "checked out");
        Ok(resp)
    }

    // ── Admin ────────────────────────────────────────────────────────

    /// Open or close a zone, then drop every cached zone list.
    pub async fn set_zone_open(&self, zone_id: &str, open: bool) -> Result<ZoneOpenState, CoreError> {
        self.require_admin()?;
        let state = self.api.set_zone_open(zone_id, open).await?;
        self.store.zones.invalidate_all();
        info!(zone_id, open, "zone open state changed");
        Ok(state)
    }

    // ── Live ─────────────────────────────────────────────────────────

    /// Load zones for `gate_id`, keep them reconciled from the live feed,
    /// and connect the feed to that gate.
    pub async fn watch_gate(&self, gate_id: &str) -> Result<Subscription, CoreError> {
        self.load_zones(gate_id).await?;
        let subscription = self.store.bind_gate(&self.feed, gate_id);
        self.feed.connect(Some(gate_id));
        Ok(subscription)
    }

    /// Collect admin audit messages into the store's admin log.
    pub fn watch_admin(&self, gate_id: Option<&str>) -> Subscription {
        let subscription = self.store.bind_admin_log(&self.feed);
        self.feed.connect(gate_id);
        subscription
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::time::Duration;

    use gopark_api::TransportConfig;
    use gopark_api::types::{Role, User};
    use serde_json::json;
    use url::Url;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use crate::config::FeedConfig;

    fn zone_json(id: &str, occupied: u32) -> serde_json::Value {
        json!({
            "id": id,
            "name": id,
            "categoryId": "cat_regular",
            "gateIds": ["gate_1"],
            "totalSlots": 10,
            "occupied": occupied,
            "free": 10 - occupied,
            "reserved": 0,
            "availableForVisitors": 10 - occupied,
            "availableForSubscribers": 0,
            "rateNormal": 3.0,
            "rateSpecial": 5.0,
            "open": true
        })
    }

    fn parking(server: &MockServer, role: Option<Role>) -> Parking {
        let api = ApiClient::new(
            &format!("{}/api/v1", server.uri()),
            &TransportConfig {
                timeout: Duration::from_secs(5),
                ..TransportConfig::default()
            },
        )
        .unwrap();
        let feed = LiveFeed::spawn(FeedConfig::new(Url::parse("ws://127.0.0.1:9/ws").unwrap()));
        let parking = Parking::new(api, feed);
        match role {
            Some(role) => parking.with_session(Session::new(
                User {
                    id: "u1".into(),
                    username: "u1".into(),
                    role,
                },
                SecretString::from("tok".to_string()),
            )),
            None => parking,
        }
    }

    async fn mount_zones(server: &MockServer) {
        Mock::given(method("GET"))
            .and(path("/api/v1/master/zones"))
            .and(query_param("gateId", "gate_1"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!([zone_json("zone_a", 2), zone_json("zone_b", 5)])),
            )
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn check_in_reconciles_zone_state() {
        let server = MockServer::start().await;
        mount_zones(&server).await;
        Mock::given(method("POST"))
            .and(path("/api/v1/tickets/checkin"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "ticket": {
                    "id": "t-1",
                    "type": "visitor",
                    "zoneId": "zone_b",
                    "gateId": "gate_1",
                    "checkinAt": "2026-03-01T09:30:00.000Z",
                    "checkoutAt": null
                },
                "zoneState": zone_json("zone_b", 6)
            })))
            .mount(&server)
            .await;

        let parking = parking(&server, Some(Role::Employee));
        parking.load_zones("gate_1").await.unwrap();
        parking
            .check_in("gate_1", "zone_b", CheckinKind::Visitor)
            .await
            .unwrap();

        let zones = parking.store().zones.get("gate_1").unwrap();
        assert_eq!(zones[0].occupied, 2);
        assert_eq!(zones[1].occupied, 6);
    }

    #[tokio::test]
    async fn full_zone_maps_to_no_available_slots() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/tickets/checkin"))
            .respond_with(ResponseTemplate::new(409).set_body_json(json!({ "message": "Zone full" })))
            .mount(&server)
            .await;

        let parking = parking(&server, Some(Role::Employee));
        let err = parking
            .check_in("gate_1", "zone_a", CheckinKind::Visitor)
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::NoAvailableSlots { .. }));
    }

    #[tokio::test]
    async fn subscriber_without_subscription_is_rejected() {
        let server = MockServer::start().await;
        let parking = parking(&server, Some(Role::Employee));

        let err = parking
            .check_in(
                "gate_1",
                "zone_a",
                CheckinKind::Subscriber {
                    subscription_id: "  ".into(),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::ValidationFailed { .. }));
    }

    #[tokio::test]
    async fn check_in_requires_session() {
        let server = MockServer::start().await;
        let parking = parking(&server, None);

        let err = parking
            .check_in("gate_1", "zone_a", CheckinKind::Visitor)
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::NotAuthenticated));
    }

    #[tokio::test]
    async fn set_zone_open_invalidates_cache() {
        let server = MockServer::start().await;
        mount_zones(&server).await;
        Mock::given(method("PUT"))
            .and(path("/api/v1/admin/zones/zone_a/open"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "zoneId": "zone_a", "open": false })),
            )
            .mount(&server)
            .await;

        let parking = parking(&server, Some(Role::Admin));
        parking.load_zones("gate_1").await.unwrap();
        let state = parking.set_zone_open("zone_a", false).await.unwrap();

        assert!(!state.open);
        assert!(parking.store().zones.get("gate_1").is_none());
    }

    #[tokio::test]
    async fn employees_cannot_toggle_zones() {
        let server = MockServer::start().await;
        let parking = parking(&server, Some(Role::Employee));

        let err = parking.set_zone_open("zone_a", false).await.unwrap_err();
        assert!(matches!(err, CoreError::PermissionDenied { .. }));
    }

    #[tokio::test]
    async fn login_installs_session() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/auth/login"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "user": { "id": "admin", "username": "admin", "role": "admin" },
                "token": "tok-admin"
            })))
            .mount(&server)
            .await;

        let parking = parking(&server, None);
        let session = parking.login("admin", "admin").await.unwrap();
        assert!(session.is_admin());
        assert!(parking.api().has_token());

        parking.logout();
        assert!(parking.session().is_none());
        assert!(!parking.api().has_token());
    }
}
