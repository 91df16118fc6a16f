//! Background services

pub mod dispatcher;

pub use dispatcher::{BroadcastReport, Dispatcher, DispatcherHandle};
