pub mod account;
pub mod counter;
pub mod notification;
pub mod permit;
