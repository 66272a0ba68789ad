//! Record (de)serialization for values stored in the ledger.
//!
//! Values are bincode with the standard configuration.

use crate::error::LedgerError;

pub fn encode<T: bincode::Encode>(value: &T) -> Result<Vec<u8>, LedgerError> {
    bincode::encode_to_vec(value, bincode::config::standard())
        .map_err(|e| LedgerError::Codec(e.to_string()))
}

pub fn decode<T: bincode::Decode<()>>(bytes: &[u8]) -> Result<T, LedgerError> {
    let (value, read) = bincode::decode_from_slice(bytes, bincode::config::standard())
        .map_err(|e| LedgerError::Codec(e.to_string()))?;
    if read != bytes.len() {
        return Err(LedgerError::Codec(format!(
            "trailing bytes: decoded {read} of {}",
            bytes.len()
        )));
    }
    Ok(value)
}
