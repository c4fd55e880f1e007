//! Domain models for the dispatch core.

pub mod driver;
pub mod event;
pub mod outbox_event;
pub mod payment;
pub mod ride;
pub mod trip;

pub use driver::{
    CreateDriverRequest, Driver, DriverResponse, DriverStatus, UpdateDriverLocationRequest,
    UpdateDriverStatusRequest,
};
pub use event::DispatchEvent;
pub use outbox_event::{AggregateType, OutboxEvent, PAYMENT_CREATED};
pub use payment::{CreatePaymentRequest, Payment, PaymentResponse, PaymentStatus};
pub use ride::{
    CandidateDriver, CreateRideRequest, PaymentMethod, Ride, RideResponse, RideStatus, RideTier,
};
pub use trip::{
    CancelTripRequest, EndTripRequest, Trip, TripReceipt, TripResponse, TripStatus,
};
