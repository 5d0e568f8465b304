use allot_core::{Config, PassMode};
use eyre::Result;

#[test]
fn defaults() {
    let config = Config::default();
    assert_eq!(config.pass_mode, PassMode::StopAtFirstFailure);
    assert_eq!(config.release_lead_days, 0);
}

#[test]
fn parse_full_file() -> Result<()> {
    let config = Config::from_toml_str(
        r#"
        pass-mode = "skip-and-continue"
        release-lead-days = 3
        "#,
    )?;
    assert_eq!(config.pass_mode, PassMode::SkipAndContinue);
    assert_eq!(config.release_lead_days, 3);
    Ok(())
}

#[test]
fn missing_keys_fall_back_to_defaults() -> Result<()> {
    let config = Config::from_toml_str("release-lead-days = 7")?;
    assert_eq!(config.pass_mode, PassMode::StopAtFirstFailure);
    assert_eq!(config.release_lead_days, 7);
    assert_eq!(Config::from_toml_str("")?, Config::default());
    Ok(())
}

#[test]
fn invalid_values_are_refused() {
    assert!(Config::from_toml_str(r#"pass-mode = "round-robin""#).is_err());
    assert!(Config::from_toml_str("release-lead-days = -1").is_err());
}

#[test]
fn workspace_file_is_found() -> Result<()> {
    // The workspace root carries an allot.toml with the defaults
    if std::env::var_os("ALLOT_PASS_MODE").is_none()
        && std::env::var_os("ALLOT_RELEASE_LEAD_DAYS").is_none()
    {
        assert_eq!(Config::load()?, Config::default());
    }
    Ok(())
}
