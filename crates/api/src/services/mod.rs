//! Dispatch-core domain services.

pub mod assignment;
pub mod driver_registry;
pub mod events;
pub mod matching;
pub mod payment_service;
pub mod psp;
pub mod ride_intake;
pub mod trip_service;

pub use assignment::AssignmentService;
pub use driver_registry::{DriverRegistryService, LocationUpdate, LOCATION_QUEUE_CAPACITY};
pub use events::EventBus;
pub use matching::MatchPolicy;
pub use payment_service::{PaymentService, PspWebhookBody};
pub use psp::{PspAcceptance, PspClient, PspError, SimulatedPspClient};
pub use ride_intake::RideIntakeService;
pub use trip_service::TripService;
