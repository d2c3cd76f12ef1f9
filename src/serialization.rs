//! Byte encoding for everything stored in a model artifact.
//!
//! Stage parameters, the model and the artifact envelope all go through
//! [`SerializableParams`]. Values are reduced to plain data (category lists,
//! tree nodes, weights) so a loaded pipeline is rebuilt from exactly the
//! values it was saved with. Decoding is strict: bytes left over after the
//! value are an error, so an artifact with appended garbage is not accepted.

use crate::error::{PipelineError, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Plain-data parameters that round-trip through bytes.
pub trait SerializableParams: Sized {
    fn to_bytes(&self) -> Result<Vec<u8>>;

    /// Decode a value that occupies all of `bytes`.
    fn from_bytes(bytes: &[u8]) -> Result<Self>;
}

impl<T> SerializableParams for T
where
    T: Serialize + DeserializeOwned,
{
    fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let value: T = bincode::deserialize(bytes)?;
        let used = bincode::serialized_size(&value)?;
        if used != bytes.len() as u64 {
            return Err(PipelineError::Serialization(format!(
                "{} trailing bytes after encoded value",
                bytes.len() as u64 - used.min(bytes.len() as u64)
            )));
        }
        Ok(value)
    }
}
