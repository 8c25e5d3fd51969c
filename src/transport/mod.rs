//! Transport module - non-blocking duplex device endpoints.

mod device;

pub use device::Endpoint;
