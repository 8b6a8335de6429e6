//! Utility functions for identifiers and hashing

use bech32::Bech32m;
use uuid7::uuid7;

// construct a unique id then encode using bech32
pub fn new_uuid_to_bech32(hrp: &str) -> anyhow::Result<String> {
    let hrp = bech32::Hrp::parse(hrp)?;
    let encode = bech32::encode::<Bech32m>(hrp, uuid7().as_bytes())?;
    Ok(encode)
}

/// Encode a document into CBOR and return `(hex sha256, cbor)`.
pub fn hash_cbor<T: minicbor::Encode<()>>(
    document: &T,
) -> Result<(String, Vec<u8>), crate::error::LedgerError> {
    let cbor = minicbor::to_vec(document)
        .map_err(|e| crate::error::LedgerError::Encode(e.to_string()))?;
    let hash = sha256::digest(&cbor);
    Ok((hash, cbor))
}
