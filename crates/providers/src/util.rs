//! Shared helpers for HTTP clients talking to external services.

use tb_domain::error::{Error, Result};

/// Convert a [`reqwest::Error`] into the domain [`Error`] type.
///
/// Timeout errors map to [`Error::Timeout`]; everything else maps to
/// [`Error::Http`].
pub fn from_reqwest(e: reqwest::Error) -> Error {
    if e.is_timeout() {
        Error::Timeout(e.to_string())
    } else {
        Error::Http(e.to_string())
    }
}

/// Read a secret from the named environment variable.
///
/// Empty values count as unset.
pub fn resolve_env(var: &str) -> Result<String> {
    match std::env::var(var) {
        Ok(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(Error::Auth(format!(
            "environment variable '{var}' not set or empty"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_env_reads_variable() {
        let var_name = "TB_TEST_RESOLVE_ENV_KEY_7781";
        std::env::set_var(var_name, "env-secret-value");
        assert_eq!(resolve_env(var_name).unwrap(), "env-secret-value");
        std::env::remove_var(var_name);
    }

    #[test]
    fn resolve_env_rejects_missing_and_blank() {
        let var_name = "TB_TEST_RESOLVE_ENV_KEY_7782";
        std::env::remove_var(var_name);
        assert!(matches!(resolve_env(var_name), Err(Error::Auth(_))));

        std::env::set_var(var_name, "   ");
        assert!(resolve_env(var_name).is_err());
        std::env::remove_var(var_name);
    }
}
