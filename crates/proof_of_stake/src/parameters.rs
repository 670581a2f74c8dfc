//! Proof-of-Stake system parameters

use std::str::FromStr;

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};
use stakebond_core::dec::Dec;
use thiserror::Error;

/// The genesis module name the parameters are configured under
pub const MODULE_NAME: &str = "stake";

/// Proof-of-Stake system parameters. These are set once at genesis and
/// are immutable afterwards.
#[derive(
    Debug,
    Clone,
    PartialEq,
    Eq,
    BorshDeserialize,
    BorshSerialize,
    Serialize,
    Deserialize,
)]
#[serde(default, deny_unknown_fields)]
pub struct PosParams {
    /// Number of blocks an unbond has to wait in the queue before it's paid
    /// out. An unbond queued at height `h` is paid out at the first height
    /// greater than `h + unbonding_period`.
    pub unbonding_period: u64,
    /// Number of blocks a commission change is kept in the commission
    /// history before it's pruned.
    pub commission_history_period: u64,
    /// The maximum sum of absolute commission changes of a delegatee within
    /// the commission history
    pub max_commission_change: Dec,
    /// The denomination of the coin that can be bonded
    pub bond_denom: String,
    /// Yearly inflation of the bonded coin, paid out as rewards
    pub inflation: Dec,
    /// Expected number of blocks per year, used to convert the yearly
    /// inflation into a per-block reward
    pub blocks_per_year: u64,
}

impl Default for PosParams {
    fn default() -> Self {
        Self {
            unbonding_period: 30,
            // 1 day at 1 block per 3 seconds
            commission_history_period: 28_800,
            // 5%
            max_commission_change: Dec::new(5, 2).unwrap_or_default(),
            bond_denom: "atom".to_owned(),
            // 7%
            inflation: Dec::new(7, 2).unwrap_or_default(),
            // 1 year at 1 block per 3 seconds
            blocks_per_year: 10_512_000,
        }
    }
}

#[allow(missing_docs)]
#[derive(Error, Debug)]
pub enum ParamsError {
    #[error("Unknown genesis module {0:?}")]
    UnknownModule(String),
    #[error("Unknown genesis key {0:?}")]
    UnknownKey(String),
    #[error("Malformed value {value:?} of {key}: {reason}")]
    Malformed {
        key: String,
        value: String,
        reason: String,
    },
    #[error("Invalid parameters: {0}")]
    Invalid(String),
    #[error("Failed to parse the parameters: {0}")]
    Toml(#[from] toml::de::Error),
}

impl PosParams {
    /// Parse the parameters from TOML. Fields that are not present keep
    /// their default values and unknown fields are rejected. The parsed
    /// parameters are validated.
    pub fn from_toml_str(input: &str) -> Result<Self, ParamsError> {
        let params: Self = toml::from_str(input)?;
        params.validate()?;
        Ok(params)
    }

    /// Apply a single `(module, key, value)` genesis option.
    pub fn apply_genesis_option(
        &mut self,
        module: &str,
        key: &str,
        value: &str,
    ) -> Result<(), ParamsError> {
        if module != MODULE_NAME {
            return Err(ParamsError::UnknownModule(module.to_owned()));
        }
        match key {
            "unbond_period" => self.unbonding_period = parse(key, value)?,
            "modcomm_period" => {
                self.commission_history_period = parse(key, value)?
            }
            "bond_coin" => {
                if !is_valid_denom(value) {
                    return Err(malformed(key, value, "not a denomination"));
                }
                self.bond_denom = value.to_owned();
            }
            "max_commission_change" => {
                self.max_commission_change = parse(key, value)?
            }
            "inflation" => self.inflation = parse(key, value)?,
            "blocks_per_year" => self.blocks_per_year = parse(key, value)?,
            _ => return Err(ParamsError::UnknownKey(key.to_owned())),
        }
        tracing::debug!(key, value, "Applied a genesis option");
        Ok(())
    }

    /// Build the parameters from the defaults and a list of
    /// `(module, key, value)` genesis options. The result is validated.
    pub fn from_genesis_options<'a>(
        options: impl IntoIterator<Item = (&'a str, &'a str, &'a str)>,
    ) -> Result<Self, ParamsError> {
        let mut params = Self::default();
        for (module, key, value) in options {
            params.apply_genesis_option(module, key, value)?;
        }
        params.validate()?;
        Ok(params)
    }

    /// Check that the parameters are within their valid ranges.
    pub fn validate(&self) -> Result<(), ParamsError> {
        let mut errors = vec![];
        if !is_valid_denom(&self.bond_denom) {
            errors.push(format!(
                "bond_denom {:?} must be non-empty and ASCII alphanumeric",
                self.bond_denom
            ));
        }
        if self.max_commission_change.is_negative()
            || self.max_commission_change > Dec::one()
        {
            errors.push(format!(
                "max_commission_change {} must be in [0, 1]",
                self.max_commission_change
            ));
        }
        if self.inflation.is_negative() || self.inflation > Dec::one() {
            errors.push(format!(
                "inflation {} must be in [0, 1]",
                self.inflation
            ));
        }
        if self.blocks_per_year == 0 {
            errors.push("blocks_per_year must be positive".to_owned());
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(ParamsError::Invalid(errors.join(", ")))
        }
    }
}

fn is_valid_denom(denom: &str) -> bool {
    !denom.is_empty() && denom.chars().all(|c| c.is_ascii_alphanumeric())
}

fn parse<T>(key: &str, value: &str) -> Result<T, ParamsError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|err: T::Err| malformed(key, value, err))
}

fn malformed(
    key: &str,
    value: &str,
    reason: impl std::fmt::Display,
) -> ParamsError {
    ParamsError::Malformed {
        key: key.to_owned(),
        value: value.to_owned(),
        reason: reason.to_string(),
    }
}

/// Testing helpers
#[cfg(any(test, feature = "testing"))]
pub mod testing {
    use proptest::prelude::*;

    use super::*;

    prop_compose! {
        /// Generate arbitrary valid parameters with short periods
        pub fn arb_pos_params()(
            unbonding_period in 0_u64..10,
            commission_history_period in 0_u64..10,
            max_commission_change in 0_i128..=100,
            inflation in 0_i128..=100,
            blocks_per_year in 1_u64..1_000,
        ) -> PosParams {
            PosParams {
                unbonding_period,
                commission_history_period,
                max_commission_change: Dec::new(max_commission_change, 2)
                    .unwrap(),
                bond_denom: "atom".to_owned(),
                inflation: Dec::new(inflation, 2).unwrap(),
                blocks_per_year,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_default_params_are_valid() {
        let params = PosParams::default();
        params.validate().unwrap();
        assert_eq!(params.unbonding_period, 30);
        assert_eq!(params.commission_history_period, 28_800);
        assert_eq!(params.max_commission_change.to_string(), "0.05");
        assert_eq!(params.inflation.to_string(), "0.07");
    }

    #[test]
    fn test_params_from_toml() {
        let params = PosParams::from_toml_str(
            r#"
            unbonding_period = 5
            bond_denom = "photon"
            inflation = "0.1"
            "#,
        )
        .unwrap();
        assert_eq!(
            params,
            PosParams {
                unbonding_period: 5,
                bond_denom: "photon".to_owned(),
                inflation: Dec::new(1, 1).unwrap(),
                ..PosParams::default()
            }
        );

        assert_matches!(
            PosParams::from_toml_str("unbond_period = 5"),
            Err(ParamsError::Toml(_))
        );
        assert_matches!(
            PosParams::from_toml_str(r#"inflation = "1.5""#),
            Err(ParamsError::Invalid(_))
        );
        assert_matches!(
            PosParams::from_toml_str(r#"inflation = """#),
            Err(ParamsError::Toml(_))
        );
        assert_matches!(
            PosParams::from_toml_str(r#"max_commission_change = "-""#),
            Err(ParamsError::Toml(_))
        );
    }

    #[test]
    fn test_genesis_options() {
        let params = PosParams::from_genesis_options([
            ("stake", "unbond_period", "10"),
            ("stake", "modcomm_period", "100"),
            ("stake", "bond_coin", "photon"),
        ])
        .unwrap();
        assert_eq!(params.unbonding_period, 10);
        assert_eq!(params.commission_history_period, 100);
        assert_eq!(params.bond_denom, "photon");

        let mut params = PosParams::default();
        assert_matches!(
            params.apply_genesis_option("coin", "unbond_period", "10"),
            Err(ParamsError::UnknownModule(_))
        );
        assert_matches!(
            params.apply_genesis_option("stake", "slash_rate", "10"),
            Err(ParamsError::UnknownKey(_))
        );
        assert_matches!(
            params.apply_genesis_option("stake", "unbond_period", "-1"),
            Err(ParamsError::Malformed { .. })
        );
        assert_matches!(
            params.apply_genesis_option("stake", "bond_coin", ""),
            Err(ParamsError::Malformed { .. })
        );
        for value in ["", "-", "."] {
            assert_matches!(
                params.apply_genesis_option("stake", "inflation", value),
                Err(ParamsError::Malformed { .. })
            );
            assert_matches!(
                params.apply_genesis_option(
                    "stake",
                    "max_commission_change",
                    value
                ),
                Err(ParamsError::Malformed { .. })
            );
        }
        assert_matches!(
            PosParams::from_genesis_options([(
                "stake",
                "blocks_per_year",
                "0"
            )]),
            Err(ParamsError::Invalid(_))
        );
        assert_eq!(params, PosParams::default());
    }
}
