//! Backend payloads. Only the fields the client relies on are typed strictly.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// List endpoints answer either with a bare array or a paginated page.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Listing<T> {
    Page { results: Vec<T> },
    Items(Vec<T>),
}

impl<T> Listing<T> {
    pub fn into_vec(self) -> Vec<T> {
        match self {
            Self::Page { results } => results,
            Self::Items(items) => items,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    pub id: u64,
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(flatten)]
    pub user: User,
    #[serde(default)]
    pub coin_balance: i64,
    #[serde(default)]
    pub subscription_tier: Option<SubscriptionTier>,
    #[serde(default)]
    pub phone_number: String,
}

/// Partial profile update; unset fields are left untouched.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProfileUpdateData {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_of_birth: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginData {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RegisterData {
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub password: String,
    pub password_confirm: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthResponse {
    #[serde(default)]
    pub message: String,
    pub user: User,
    pub token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SubscriptionTier {
    pub id: u64,
    pub name: String,
    /// Decimal amount as sent by the backend.
    pub price: String,
    pub coins_awarded: i64,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Game {
    pub id: u64,
    pub name: String,
    pub location: String,
    pub date_time: DateTime<Utc>,
    pub coin_price: i64,
    #[serde(default)]
    pub total_slots: u32,
    #[serde(default)]
    pub available_slots: u32,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub can_be_booked: bool,
}

/// Query filters for the game list.
#[derive(Debug, Clone, Default)]
pub struct GameFilters {
    pub location: Option<String>,
    pub date_from: Option<String>,
    pub date_to: Option<String>,
}

impl GameFilters {
    pub(crate) fn query_pairs(&self) -> Vec<(&'static str, &str)> {
        [
            ("location", self.location.as_deref()),
            ("date_from", self.date_from.as_deref()),
            ("date_to", self.date_to.as_deref()),
        ]
        .into_iter()
        .filter_map(|(key, value)| value.map(|v| (key, v)))
        .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Confirmed,
    Cancelled,
    Completed,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Booking {
    pub id: u64,
    pub game: Game,
    pub status: BookingStatus,
    pub coins_spent: i64,
    pub booking_reference: String,
    #[serde(default)]
    pub notes: String,
}

/// Flattened booking row used by history and dashboard views.
#[derive(Debug, Clone, Deserialize)]
pub struct BookingListItem {
    pub id: u64,
    pub game_name: String,
    pub game_location: String,
    pub game_date_time: DateTime<Utc>,
    pub status: BookingStatus,
    pub coins_spent: i64,
    pub booking_reference: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateBookingData {
    pub game_id: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PaymentInitializationData {
    pub subscription_tier_id: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PaymentInitializationResponse {
    #[serde(default)]
    pub message: String,
    pub payment_url: String,
    pub reference: String,
    pub transaction_id: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct PaymentVerificationData {
    pub reference: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PaymentVerificationResponse {
    #[serde(default)]
    pub message: String,
    pub coins_awarded: i64,
    /// Transaction record, kept untyped.
    #[serde(default)]
    pub transaction: serde_json::Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    Pending,
    Success,
    Failed,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    Subscription,
    CoinPurchase,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Transaction {
    pub id: u64,
    pub user: String,
    #[serde(default)]
    pub subscription_tier: Option<SubscriptionTier>,
    pub amount: String,
    pub coins_awarded: i64,
    pub status: TransactionStatus,
    pub transaction_type: TransactionType,
    pub reference_id: String,
    #[serde(default)]
    pub paystack_reference: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UserStats {
    pub coin_balance: i64,
    #[serde(default)]
    pub subscription_tier: Option<SubscriptionTier>,
    pub total_bookings: u32,
    pub confirmed_bookings: u32,
    pub completed_bookings: u32,
    pub total_coins_spent: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DashboardData {
    pub user_stats: UserStats,
    #[serde(default)]
    pub recent_transactions: Vec<Transaction>,
    #[serde(default)]
    pub upcoming_bookings: Vec<BookingListItem>,
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn listing_accepts_page_and_bare_array() {
        let page: Listing<u32> = serde_json::from_str(r#"{"count":2,"results":[1,2]}"#).unwrap();
        let bare: Listing<u32> = serde_json::from_str("[3]").unwrap();
        assert_eq!(page.into_vec(), vec![1, 2]);
        assert_eq!(bare.into_vec(), vec![3]);
    }

    #[test]
    fn filters_skip_empty_fields() {
        let filters = GameFilters {
            location: Some("Lekki".to_string()),
            date_to: Some("2025-01-31".to_string()),
            ..GameFilters::default()
        };
        assert_eq!(
            filters.query_pairs(),
            vec![("location", "Lekki"), ("date_to", "2025-01-31")]
        );
    }

    #[test]
    fn tier_defaults_to_active() {
        let tier: SubscriptionTier = serde_json::from_str(
            r#"{"id":1,"name":"Bronze","price":"5000.00","coins_awarded":10}"#,
        )
        .unwrap();
        assert!(tier.is_active);
        assert_eq!(tier.price, "5000.00");
    }

    #[test]
    fn profile_update_sends_only_set_fields() {
        let data = ProfileUpdateData {
            phone_number: Some("+2348000000000".to_string()),
            ..ProfileUpdateData::default()
        };
        assert_eq!(
            serde_json::to_string(&data).unwrap(),
            r#"{"phone_number":"+2348000000000"}"#
        );
    }

    #[test]
    fn booking_without_notes_omits_field() {
        let data = CreateBookingData {
            game_id: 4,
            notes: None,
        };
        assert_eq!(serde_json::to_string(&data).unwrap(), r#"{"game_id":4}"#);
    }
}
