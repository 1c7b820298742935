//! Code command - render check codes for derived bytes

use anyhow::{Context, Result};
use rendezvous_lib::crypto::derivation::CHECK_CODE_SIZE;
use rendezvous_lib::VerificationCode;

use crate::ui;

pub fn run(input: &str, verbose: bool) -> Result<()> {
    let code = parse(input)?;

    ui::key_value("Code", &code.to_string());
    if verbose {
        let [first, second, third] = code.groups();
        ui::key_value("Groups", &format!("{first}, {second}, {third}"));
    }
    Ok(())
}

fn parse(input: &str) -> Result<VerificationCode> {
    let bytes = hex::decode(input.trim()).context("Input is not valid hex")?;
    let bytes: [u8; CHECK_CODE_SIZE] = bytes
        .try_into()
        .map_err(|b: Vec<u8>| anyhow::anyhow!("Expected {CHECK_CODE_SIZE} bytes, got {}", b.len()))?;
    Ok(VerificationCode::from_bytes(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_known_values() {
        assert_eq!(parse("0000000000").unwrap().to_string(), "1000-1000-1000");
        assert_eq!(parse("ffffffffff").unwrap().to_string(), "9191-9191-9191");
        assert_eq!(parse("0108014002").unwrap().groups(), [1033, 1005, 1001]);
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert!(parse("zz").is_err());
        assert!(parse("00").is_err());
        assert!(parse("000000000000").is_err());
    }
}
