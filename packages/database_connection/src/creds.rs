use thiserror::Error;

use crate::Credentials;

#[derive(Debug, Error)]
pub enum GetDbCredsError {
    #[error("Invalid Connection Options")]
    InvalidConnectionOptions,
}

/// Builds [`Credentials`] from `DB_HOST`, `DB_NAME`, `DB_USER` and `DB_PASSWORD` as
/// returned by `var`.
///
/// # Errors
///
/// * If only some of `DB_HOST`, `DB_NAME` and `DB_USER` are set
pub fn get_db_creds(
    var: impl Fn(&str) -> Option<String>,
) -> Result<Option<Credentials>, GetDbCredsError> {
    let env_db_host = var("DB_HOST");
    let env_db_name = var("DB_NAME");
    let env_db_user = var("DB_USER");
    let env_db_password = var("DB_PASSWORD").filter(|password| !password.is_empty());

    if env_db_host.is_none() && env_db_name.is_none() && env_db_user.is_none() {
        return Ok(None);
    }

    Ok(Some(Credentials::new(
        env_db_host.ok_or(GetDbCredsError::InvalidConnectionOptions)?,
        env_db_name.ok_or(GetDbCredsError::InvalidConnectionOptions)?,
        env_db_user.ok_or(GetDbCredsError::InvalidConnectionOptions)?,
        env_db_password,
    )))
}
