//! Backend API client with wake-aware request handling.

mod endpoints;
mod interceptor;
mod session;
mod types;

pub use endpoints::BackendApi;
pub use interceptor::{Interceptor, RequestContext};
pub use session::{MemorySession, Session};
pub use types::{
    AuthResponse, Booking, BookingListItem, BookingStatus, CreateBookingData, DashboardData, Game,
    GameFilters, HealthStatus, Listing, LoginData, PaymentInitializationData,
    PaymentInitializationResponse, PaymentVerificationData, PaymentVerificationResponse,
    ProfileUpdateData, RegisterData, SubscriptionTier, Transaction, TransactionStatus,
    TransactionType, User, UserProfile, UserStats,
};
