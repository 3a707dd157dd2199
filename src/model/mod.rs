//! Typed GCP API shapes
//!
//! Only the fields the inventory reads are declared; everything else in a
//! response is ignored. Optional scalars are `Option`, lists default to empty.

pub mod compute;
pub mod dns;
pub mod iam;
pub mod pubsub;
pub mod storage;
