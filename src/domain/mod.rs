//! Domain model: users and their connects, service requests, applications and
//! the payments that settle them. Nothing here performs I/O; persistence and
//! the payment gateway are reached through [`ports`].

pub mod application;
pub mod chat;
pub mod ids;
pub mod payment;
pub mod ports;
pub mod pricing;
pub mod reference;
pub mod request;
pub mod transaction;
pub mod user;
