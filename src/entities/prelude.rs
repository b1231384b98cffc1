pub use super::admins::Entity as Admins;
pub use super::approvers::Entity as Approvers;
pub use super::notifications::Entity as Notifications;
pub use super::permit_counters::Entity as PermitCounters;
pub use super::permits::Entity as Permits;
pub use super::requesters::Entity as Requesters;
