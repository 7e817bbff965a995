/*
[INPUT]:  Exchange schema definitions and serde requirements
[OUTPUT]: Typed Rust enums with serialization and signing codes
[POS]:    Data layer - type definitions for API communication
[UPDATE]: When API schema changes or new enum values are added
*/

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::http::GrvtError;

/// Deployment environment of the exchange backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Dev,
    Staging,
    Testnet,
    Prod,
}

impl Environment {
    pub const ALL: [Environment; 4] = [
        Environment::Dev,
        Environment::Staging,
        Environment::Testnet,
        Environment::Prod,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Dev => "dev",
            Environment::Staging => "staging",
            Environment::Testnet => "testnet",
            Environment::Prod => "prod",
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Environment {
    type Err = GrvtError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "dev" => Ok(Environment::Dev),
            "staging" => Ok(Environment::Staging),
            "testnet" => Ok(Environment::Testnet),
            "prod" => Ok(Environment::Prod),
            other => Err(GrvtError::Config(format!("unknown environment '{other}'"))),
        }
    }
}

/// Order time-in-force as it appears in the order payload
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TimeInForce {
    #[default]
    GoodTillTime,
    AllOrNone,
    ImmediateOrCancel,
    FillOrKill,
}

impl TimeInForce {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeInForce::GoodTillTime => "GOOD_TILL_TIME",
            TimeInForce::AllOrNone => "ALL_OR_NONE",
            TimeInForce::ImmediateOrCancel => "IMMEDIATE_OR_CANCEL",
            TimeInForce::FillOrKill => "FILL_OR_KILL",
        }
    }

    /// Enumerated byte code used inside the signed `Order` struct
    pub fn sign_code(&self) -> u8 {
        match self {
            TimeInForce::GoodTillTime => 1,
            TimeInForce::AllOrNone => 2,
            TimeInForce::ImmediateOrCancel => 3,
            TimeInForce::FillOrKill => 4,
        }
    }
}

impl fmt::Display for TimeInForce {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TimeInForce {
    type Err = GrvtError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "GOOD_TILL_TIME" => Ok(TimeInForce::GoodTillTime),
            "ALL_OR_NONE" => Ok(TimeInForce::AllOrNone),
            "IMMEDIATE_OR_CANCEL" => Ok(TimeInForce::ImmediateOrCancel),
            "FILL_OR_KILL" => Ok(TimeInForce::FillOrKill),
            other => Err(GrvtError::InvalidOrder(format!(
                "unsupported time_in_force '{other}'"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("dev", Environment::Dev)]
    #[case("STAGING", Environment::Staging)]
    #[case(" testnet ", Environment::Testnet)]
    #[case("prod", Environment::Prod)]
    fn test_environment_parse(#[case] raw: &str, #[case] expected: Environment) {
        assert_eq!(raw.parse::<Environment>().unwrap(), expected);
    }

    #[rstest]
    #[case("mainnet")]
    #[case("production")]
    #[case("")]
    fn test_unknown_environment_is_config_error(#[case] raw: &str) {
        let err = raw.parse::<Environment>().unwrap_err();
        assert!(matches!(err, GrvtError::Config(_)));
    }

    #[rstest]
    #[case(TimeInForce::GoodTillTime, 1)]
    #[case(TimeInForce::AllOrNone, 2)]
    #[case(TimeInForce::ImmediateOrCancel, 3)]
    #[case(TimeInForce::FillOrKill, 4)]
    fn test_time_in_force_sign_codes(#[case] tif: TimeInForce, #[case] code: u8) {
        assert_eq!(tif.sign_code(), code);
        assert_eq!(tif.as_str().parse::<TimeInForce>().unwrap(), tif);
    }

    #[test]
    fn test_unsupported_time_in_force_is_invalid_order() {
        let err = "GTC".parse::<TimeInForce>().unwrap_err();
        assert!(matches!(err, GrvtError::InvalidOrder(_)));
    }

    #[test]
    fn test_time_in_force_serde_names() {
        let json = serde_json::to_string(&TimeInForce::ImmediateOrCancel).unwrap();
        assert_eq!(json, "\"IMMEDIATE_OR_CANCEL\"");
    }
}
