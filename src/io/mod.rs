pub mod buffer;
pub mod checksum;
pub mod codec;
pub mod config;
pub mod contract;
pub mod counting;
pub mod envelope;
pub mod error;
pub mod serialize;
pub mod store;
pub mod stream;
pub mod version;

pub use buffer::{BufferPlan, BULK_BUFFER_SIZE, DEFAULT_BUFFER_SIZE, MAX_HEAP_BUFFER, MIN_HEAP_BUFFER};
pub use checksum::{checksum_of, ChecksumAlgorithm};
pub use codec::*;
pub use config::StreamConfig;
pub use contract::{ZioRead, ZioWrite, MAX_STRING_BYTES, NULL_STRING_LEN};
pub use counting::{serialized_len, CountingOutput};
pub use envelope::*;
pub use error::{error_of, ZioError};
pub use serialize::*;
pub use store::*;
pub use stream::*;
