//! API middleware

mod origin;

pub use origin::OriginPolicy;
