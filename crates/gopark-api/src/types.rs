// Request/response types for the GoPark REST API.
//
// Field names follow the server's camelCase JSON. Zone counters default to
// zero because list endpoints may omit them; `id` and `open` are always sent.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

// ── Zones & gates ────────────────────────────────────────────────────

/// Current state of a parking zone.
///
/// The same shape is sent by the REST API and by `zone-update` messages on
/// the live feed, so a snapshot can replace a cached entry wholesale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Zone {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub category_id: String,
    #[serde(default)]
    pub gate_ids: Vec<String>,
    #[serde(default)]
    pub total_slots: u32,
    #[serde(default)]
    pub occupied: u32,
    #[serde(default)]
    pub free: u32,
    #[serde(default)]
    pub reserved: u32,
    #[serde(default)]
    pub available_for_visitors: u32,
    #[serde(default)]
    pub available_for_subscribers: u32,
    #[serde(default)]
    pub rate_normal: f64,
    #[serde(default)]
    pub rate_special: f64,
    pub open: bool,
}

/// Partial zone body for admin create/update calls.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ZoneChanges {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gate_ids: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_slots: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub open: Option<bool>,
}

/// Response of `PUT /admin/zones/{id}/open`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ZoneOpenState {
    pub zone_id: String,
    pub open: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Gate {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub zone_ids: Vec<String>,
    #[serde(default)]
    pub location: String,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GateChanges {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zone_ids: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

// ── Pricing ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rate_normal: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rate_special: Option<f64>,
}

/// Rush hour window; `week_day` is 0..=6 and times are `HH:MM`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RushHour {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub week_day: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
}

/// Vacation period with special pricing; dates are `YYYY-MM-DD`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vacation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
}

// ── Auth & users ─────────────────────────────────────────────────────

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
    Admin,
    Employee,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub username: String,
    pub role: Role,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest<'a> {
    pub username: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    pub user: User,
    pub token: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewUser<'a> {
    pub username: &'a str,
    pub password: &'a str,
    pub role: Role,
}

// ── Subscriptions ────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentCheckin {
    pub ticket_id: String,
    pub zone_id: String,
    pub checkin_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionCar {
    pub plate: String,
    pub brand: String,
    pub model: String,
    pub color: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    pub id: String,
    pub active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_name: Option<String>,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub current_checkins: Vec<CurrentCheckin>,
    #[serde(default)]
    pub cars: Vec<SubscriptionCar>,
}

// ── Tickets ──────────────────────────────────────────────────────────

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum TicketType {
    Visitor,
    Subscriber,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ticket {
    pub id: String,
    #[serde(rename = "type")]
    pub ticket_type: TicketType,
    pub zone_id: String,
    pub gate_id: String,
    pub checkin_at: String,
    #[serde(default)]
    pub checkout_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subscription_id: Option<String>,
}

/// Body of `POST /tickets/checkin`. The server accepts the ticket shape with
/// `checkoutAt` set to null.
pub type CheckinRequest = Ticket;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckinResponse {
    pub ticket: Ticket,
    pub zone_state: Zone,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest<'a> {
    pub ticket_id: &'a str,
    pub force_convert_to_visitor: bool,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum RateMode {
    Normal,
    Special,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutBreakdown {
    pub from: String,
    pub to: String,
    pub hours: f64,
    pub rate_mode: RateMode,
    pub rate: f64,
    pub amount: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutResponse {
    pub ticket_id: String,
    pub checkin_at: String,
    pub checkout_at: String,
    pub duration_hours: f64,
    #[serde(default)]
    pub breakdown: Vec<CheckoutBreakdown>,
    pub amount: f64,
    pub zone_state: Zone,
}

// ── Reports ──────────────────────────────────────────────────────────

/// One row of the admin parking-state report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParkingStateReportEntry {
    pub zone_id: String,
    pub name: String,
    pub total_slots: u32,
    pub occupied: u32,
    pub free: u32,
    pub reserved: u32,
    pub available_for_visitors: u32,
    pub available_for_subscribers: u32,
    pub subscriber_count: u32,
    pub open: bool,
}
