//! Record Module
//!
//! Typed access to fixed-width record buffers.
//!
//! ## Responsibilities
//! - Encode/decode field values at their schema offsets
//! - Parse decimal and hex text into fields
//! - Type minimum/maximum fill for range bounds
//! - Byte-wise total ordering
//! - Batches of records for bulk transfer

pub mod codec;
mod batch;
mod record;

pub use batch::Batch;
pub use record::Record;
