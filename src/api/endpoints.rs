//! Typed backend endpoints, each routed through the [`Interceptor`].

use reqwest::header::AUTHORIZATION;
use reqwest::{Client, Method, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::interceptor::{Interceptor, RequestContext};
use super::types::{
    AuthResponse, Booking, BookingListItem, CreateBookingData, DashboardData, Game, GameFilters,
    HealthStatus, Listing, LoginData, PaymentInitializationData, PaymentInitializationResponse,
    PaymentVerificationData, PaymentVerificationResponse, ProfileUpdateData, RegisterData,
    SubscriptionTier, Transaction, UserProfile,
};
use crate::config::AppConfig;
use crate::error::{AppError, Result};
use crate::probe::join_url;

#[derive(Clone)]
pub struct BackendApi {
    client: Client,
    api_base: String,
    health_url: String,
    interceptor: Interceptor,
    proactive: bool,
}

impl BackendApi {
    pub fn new(config: &AppConfig, interceptor: Interceptor) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()?;

        Ok(Self {
            client,
            api_base: join_url(&config.backend_base_url, &config.api_prefix),
            health_url: join_url(&config.backend_base_url, &config.health_path),
            interceptor,
            proactive: false,
        })
    }

    /// Make sure the backend is awake before every call, not only after a failure.
    pub fn with_proactive_wake(mut self, proactive: bool) -> Self {
        self.proactive = proactive;
        self
    }

    pub fn interceptor(&self) -> &Interceptor {
        &self.interceptor
    }

    /// Health checks feed the wake logic themselves, so they are never woken and retried.
    pub async fn health(&self) -> Result<HealthStatus> {
        let ctx = self.interceptor.context(false);
        self.send(ctx, Method::GET, self.health_url.clone(), None).await
    }

    pub async fn api_info(&self) -> Result<serde_json::Value> {
        self.get("api_info", self.url("/info/")).await
    }

    pub async fn login(&self, data: &LoginData) -> Result<AuthResponse> {
        self.post("login", self.url("/auth/login/"), data).await
    }

    pub async fn register(&self, data: &RegisterData) -> Result<AuthResponse> {
        self.post("register", self.url("/auth/register/"), data).await
    }

    /// The confirmation message in the response is discarded.
    pub async fn logout(&self) -> Result<()> {
        let _: serde_json::Value = self
            .post("logout", self.url("/auth/logout/"), &serde_json::json!({}))
            .await?;
        Ok(())
    }

    pub async fn profile(&self) -> Result<UserProfile> {
        self.get("profile", self.url("/user/profile/")).await
    }

    pub async fn update_profile(&self, data: &ProfileUpdateData) -> Result<UserProfile> {
        let url = self.url("/user/profile/");
        self.send_json("update_profile", Method::PATCH, url, data).await
    }

    pub async fn bookings(&self) -> Result<Vec<BookingListItem>> {
        let listing: Listing<BookingListItem> =
            self.get("bookings", self.url("/user/bookings/")).await?;
        Ok(listing.into_vec())
    }

    pub async fn transactions(&self) -> Result<Vec<Transaction>> {
        let listing: Listing<Transaction> = self
            .get("transactions", self.url("/user/transactions/"))
            .await?;
        Ok(listing.into_vec())
    }

    pub async fn dashboard(&self) -> Result<DashboardData> {
        self.get("dashboard", self.url("/user/dashboard/")).await
    }

    pub async fn games(&self, filters: &GameFilters) -> Result<Vec<Game>> {
        let mut url = Url::parse(&self.url("/games/"))
            .map_err(|e| AppError::config(format!("Invalid games URL: {}", e)))?;
        let pairs = filters.query_pairs();
        if !pairs.is_empty() {
            url.query_pairs_mut().extend_pairs(pairs);
        }
        let listing: Listing<Game> = self.get("games", url.to_string()).await?;
        Ok(listing.into_vec())
    }

    pub async fn game(&self, id: u64) -> Result<Game> {
        self.get("game", self.url(&format!("/games/{}/", id))).await
    }

    pub async fn subscription_tiers(&self) -> Result<Vec<SubscriptionTier>> {
        let listing: Listing<SubscriptionTier> = self
            .get("subscription_tiers", self.url("/subscriptions/tiers/"))
            .await?;
        Ok(listing.into_vec())
    }

    pub async fn create_booking(&self, data: &CreateBookingData) -> Result<Booking> {
        self.post("create_booking", self.url("/booking/create/"), data).await
    }

    pub async fn booking(&self, id: u64) -> Result<Booking> {
        self.get("booking", self.url(&format!("/booking/{}/", id))).await
    }

    pub async fn initialize_payment(
        &self,
        data: &PaymentInitializationData,
    ) -> Result<PaymentInitializationResponse> {
        self.post("initialize_payment", self.url("/payment/initialize/"), data).await
    }

    pub async fn verify_payment(
        &self,
        data: &PaymentVerificationData,
    ) -> Result<PaymentVerificationResponse> {
        self.post("verify_payment", self.url("/payment/verify/"), data).await
    }

    fn url(&self, path: &str) -> String {
        join_url(&self.api_base, path)
    }

    async fn get<T: DeserializeOwned>(&self, name: &str, url: String) -> Result<T> {
        let request = |ctx: RequestContext, url: String| self.send(ctx, Method::GET, url, None);
        if self.proactive {
            self.interceptor.call_awake(name, url, request).await
        } else {
            self.interceptor.call(name, url, request).await
        }
    }

    async fn post<B, T>(&self, name: &str, url: String, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send_json(name, Method::POST, url, body).await
    }

    async fn send_json<B, T>(
        &self,
        name: &str,
        method: Method,
        url: String,
        body: &B,
    ) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let body = serde_json::to_value(body)?;
        let request = |ctx: RequestContext, (url, body): (String, serde_json::Value)| {
            self.send(ctx, method.clone(), url, Some(body))
        };
        if self.proactive {
            self.interceptor.call_awake(name, (url, body), request).await
        } else {
            self.interceptor.call(name, (url, body), request).await
        }
    }

    async fn send<T: DeserializeOwned>(
        &self,
        ctx: RequestContext,
        method: Method,
        url: String,
        body: Option<serde_json::Value>,
    ) -> Result<T> {
        let mut request = self.client.request(method, &url);
        if let Some(authorization) = ctx.authorization {
            request = request.header(AUTHORIZATION, authorization);
        }
        if let Some(body) = body {
            request = request.json(&body);
        }

        let resp = request.send().await.map_err(|e| {
            if e.is_connect() {
                AppError::network_with_url(&url, e.to_string())
            } else {
                AppError::from(e)
            }
        })?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(AppError::http_status(status.as_u16(), &text));
        }

        let bytes = resp.bytes().await?;
        if bytes.is_empty() {
            return Ok(serde_json::from_str("null")?);
        }
        Ok(serde_json::from_slice(&bytes)?)
    }
}
