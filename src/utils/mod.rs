pub mod bignum;
pub mod cert;
pub mod der;
pub mod hash;
pub mod rsa;

/// Hex (de)serialization for optional 32-byte measurements. A missing or `null`
/// value is `None`.
pub mod measurement_hex {
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<[u8; 32]>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = <Option<String>>::deserialize(deserializer)?;
        value
            .map(|s| {
                let mut measurement = [0u8; 32];
                hex::decode_to_slice(s, &mut measurement).map_err(de::Error::custom)?;
                Ok(measurement)
            })
            .transpose()
    }

    pub fn serialize<S: Serializer>(
        value: &Option<[u8; 32]>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(measurement) => serializer.serialize_some(&hex::encode(measurement)),
            None => serializer.serialize_none(),
        }
    }
}

/// Removes `std::mem::size_of<T>()` bytes from the front of `bytes` and returns it as a `T`.
///
/// Returns `None` and leaves `bytes` unchanged if it isn't long enough.
pub fn read_from_bytes<T: zerocopy::FromBytes>(bytes: &mut &[u8]) -> Option<T> {
    let front = T::read_from_prefix(bytes)?;
    *bytes = &bytes[std::mem::size_of::<T>()..];
    Some(front)
}
