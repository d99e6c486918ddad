pub mod client;
pub mod mock;
pub mod records;

pub use client::{ApiClient, ApiError, Finding, ScanReport};
pub use mock::MockGenerator;
pub use records::{DecodeError, Decoded, PacketRecord};
