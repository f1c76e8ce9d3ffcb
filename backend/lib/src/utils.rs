pub mod serde {
    use alloy_core::primitives::Address;
    use serde::Serializer;

    /// Serializes an address in its EIP-55 mixed-case form
    pub fn checksummed_address<S>(address: &Address, ser: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        ser.serialize_str(&address.to_checksum(None))
    }
}
