//! CLI command definitions and handlers.

pub mod serve;
pub mod train;

use std::str::FromStr;

use clap::{Parser, Subcommand};
use fatigue_core::inference::MIN_INPUT_SIZE;

/// Fatigue Detect - classify faces as fatigued or rested
#[derive(Parser)]
#[command(name = "fatigue")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand)]
pub enum Commands {
    /// Serve the prediction API over HTTP
    Serve(serve::ServeArgs),
    /// Train the classifier and write the model artifact
    Train(train::TrainArgs),
}

/// Parse a strictly positive integer.
fn parse_positive<T>(s: &str) -> Result<T, String>
where
    T: FromStr + PartialOrd + Default + std::fmt::Display,
{
    let value: T = s
        .parse()
        .map_err(|_| format!("'{s}' is not a valid number"))?;
    if value > T::default() {
        Ok(value)
    } else {
        Err(format!("{value} must be greater than 0"))
    }
}

/// Parse a finite, strictly positive learning rate.
fn parse_learning_rate(s: &str) -> Result<f64, String> {
    let value = parse_positive::<f64>(s)?;
    if value.is_finite() {
        Ok(value)
    } else {
        Err(format!("{value} is not a finite number"))
    }
}

/// Parse a square image edge large enough for the network.
fn parse_image_size(s: &str) -> Result<u32, String> {
    let value: u32 = s
        .parse()
        .map_err(|_| format!("'{s}' is not a valid size"))?;
    if value >= MIN_INPUT_SIZE {
        Ok(value)
    } else {
        Err(format!("{value} is below the minimum of {MIN_INPUT_SIZE}"))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_positive() {
        assert_eq!(parse_positive::<usize>("4"), Ok(4));
        assert!(parse_positive::<usize>("0").is_err());
        assert!(parse_positive::<f64>("-0.5").is_err());
        assert!(parse_positive::<f64>("abc").is_err());
    }

    #[test]
    fn test_parse_learning_rate() {
        assert_eq!(parse_learning_rate("0.001"), Ok(0.001));
        assert!(parse_learning_rate("-0.01")
            .unwrap_err()
            .contains("must be greater than 0"));
        assert!(parse_learning_rate("inf").unwrap_err().contains("finite"));
        assert!(parse_learning_rate("NaN").is_err());
    }

    #[test]
    fn test_parse_image_size() {
        assert_eq!(parse_image_size("256"), Ok(256));
        assert!(parse_image_size("21").unwrap_err().contains("minimum"));
    }
}
