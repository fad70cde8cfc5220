//! Authorization seam. The core asks before privileged operations; deciding
//! who holds which role belongs to the caller's identity service.

use crate::errors::{AppError, AppResult};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrivilegedOp {
    FinalizeMonth,
    ForceUpdate,
    ForceUnfinalize,
    BalanceCorrection,
    TransactionVoid,
}

impl fmt::Display for PrivilegedOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PrivilegedOp::FinalizeMonth => "finalize_month",
            PrivilegedOp::ForceUpdate => "force_update",
            PrivilegedOp::ForceUnfinalize => "force_unfinalize",
            PrivilegedOp::BalanceCorrection => "balance_correction",
            PrivilegedOp::TransactionVoid => "transaction_void",
        };
        f.write_str(s)
    }
}

pub trait Authorizer {
    /// Return `AppError::Authorization` when `actor` may not perform `op`.
    fn authorize(&self, actor: &str, op: PrivilegedOp) -> AppResult<()>;
}

/// Accepts everyone. For embedding callers that authorize upstream.
pub struct AllowAll;

impl Authorizer for AllowAll {
    fn authorize(&self, _actor: &str, _op: PrivilegedOp) -> AppResult<()> {
        Ok(())
    }
}

/// Grants every privileged operation to the identities listed as admins in
/// the configuration file.
pub struct ConfigAuthorizer {
    admins: Vec<String>,
}

impl ConfigAuthorizer {
    pub fn new(admins: &[String]) -> Self {
        Self {
            admins: admins.to_vec(),
        }
    }
}

impl Authorizer for ConfigAuthorizer {
    fn authorize(&self, actor: &str, op: PrivilegedOp) -> AppResult<()> {
        if self.admins.iter().any(|a| a == actor) {
            Ok(())
        } else {
            Err(AppError::Authorization(format!(
                "'{actor}' is not allowed to {op}"
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorKind;

    #[test]
    fn config_authorizer_only_admits_admins() {
        let auth = ConfigAuthorizer::new(&["boss".to_string()]);
        assert!(auth.authorize("boss", PrivilegedOp::ForceUpdate).is_ok());
        let err = auth
            .authorize("tenant", PrivilegedOp::FinalizeMonth)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Authorization);
    }
}
