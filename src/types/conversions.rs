use ethers::types::{Address, U256};
use rust_decimal::Decimal;
use std::str::FromStr;

// Fixed-point integer -> Decimal, for display only
pub fn u256_to_decimal(value: U256, decimals: u8) -> Result<Decimal, ConversionError> {
    let value_str = value.to_string();
    let mut decimal_value = Decimal::from_str(&value_str)
        .map_err(|e| ConversionError::InvalidDecimal(e.to_string()))?;

    // Integer string parses with scale 0, so setting the scale divides by 10^decimals
    decimal_value
        .set_scale(decimals as u32)
        .map_err(|_| ConversionError::Overflow)?;
    Ok(decimal_value)
}

pub fn string_to_address(s: &str) -> Result<Address, ConversionError> {
    Address::from_str(s.trim()).map_err(|e| ConversionError::InvalidAddress(e.to_string()))
}

#[derive(Debug, thiserror::Error)]
pub enum ConversionError {
    #[error("Invalid decimal: {0}")]
    InvalidDecimal(String),
    #[error("Overflow in conversion")]
    Overflow,
    #[error("Invalid address: {0}")]
    InvalidAddress(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_to_address() {
        let addr = string_to_address(" 0x0000000000000000000000000000000000000348 ").unwrap();
        assert_eq!(addr.as_bytes()[18..], [0x03, 0x48]);
        assert!(matches!(
            string_to_address("not-an-address"),
            Err(ConversionError::InvalidAddress(_))
        ));
    }

    #[test]
    fn test_u256_to_decimal_scales() {
        let value = u256_to_decimal(U256::from(1_500_000u64), 6).unwrap();
        assert_eq!(value, Decimal::from_str("1.5").unwrap());
    }
}
