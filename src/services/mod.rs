pub mod auth_service;
pub mod auth_service_impl;
pub use auth_service::{AuthError, AuthService, CredentialField, LogOnlySink, ResetTokenSink, SessionCheck};
pub use auth_service_impl::SeaOrmAuthService;

pub mod permit_service;
pub mod permit_service_impl;
pub use permit_service::{FinalDecision, PermitError, PermitService};
pub use permit_service_impl::SeaOrmPermitService;

pub mod notify;
pub use notify::{NotificationKind, NotificationService};

pub mod pdf;
pub use pdf::{MinimalPdfRenderer, PermitRenderer};

pub mod idle;
pub use idle::{IdleEvent, IdleMonitor, IdlePhase, IdleTimeline};
