//! Typed recovery links: invitations, email verification, password reset.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Duration, Utc};

use crate::{LinkError, SignedLinkService};

/// Query parameter naming the link's purpose.
pub const PURPOSE_PARAM: &str = "purpose";
/// Query parameter carrying the opaque token the link refers to.
pub const TOKEN_PARAM: &str = "token";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LinkPurpose {
    Invite,
    EmailVerification,
    PasswordReset,
}

impl LinkPurpose {
    pub fn as_str(&self) -> &'static str {
        match self {
            LinkPurpose::Invite => "invite",
            LinkPurpose::EmailVerification => "verify_email",
            LinkPurpose::PasswordReset => "reset_password",
        }
    }

    pub fn default_ttl(&self) -> Duration {
        match self {
            LinkPurpose::Invite => Duration::days(7),
            LinkPurpose::EmailVerification => Duration::hours(24),
            LinkPurpose::PasswordReset => Duration::hours(1),
        }
    }
}

impl fmt::Display for LinkPurpose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl SignedLinkService {
    /// Sign `token` for `purpose` with the purpose's default lifetime.
    pub fn generate_purpose_link(
        &self,
        purpose: LinkPurpose,
        base_url: &str,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<String, LinkError> {
        self.generate_signed_url(
            base_url,
            [(PURPOSE_PARAM, purpose.as_str()), (TOKEN_PARAM, token)],
            purpose.default_ttl(),
            now,
        )
    }

    /// Verify a purpose link and hand back its token.
    ///
    /// A reset link presented to the invite endpoint fails with
    /// `PurposeMismatch` even though its signature is good.
    pub fn validate_purpose_link<I, K, V>(
        &self,
        purpose: LinkPurpose,
        values: I,
        now: DateTime<Utc>,
    ) -> Result<String, LinkError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut params: BTreeMap<String, String> = self.validate_signed_url(values, now)?;
        if params.get(PURPOSE_PARAM).map(String::as_str) != Some(purpose.as_str()) {
            tracing::debug!(expected = %purpose, "purpose link rejected: wrong purpose");
            return Err(LinkError::PurposeMismatch);
        }
        params.remove(TOKEN_PARAM).ok_or(LinkError::MissingParameters)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LinkKey;
    use url::Url;
    use warden_core::KeyHandle;

    fn service() -> SignedLinkService {
        SignedLinkService::new(KeyHandle::new(LinkKey::from_bytes(b"purpose-key".to_vec())))
    }

    fn pairs(url: &str) -> Vec<(String, String)> {
        Url::parse(url).unwrap().query_pairs().into_owned().collect()
    }

    #[test]
    fn default_lifetimes() {
        assert_eq!(LinkPurpose::Invite.default_ttl(), Duration::days(7));
        assert_eq!(LinkPurpose::EmailVerification.default_ttl(), Duration::hours(24));
        assert_eq!(LinkPurpose::PasswordReset.default_ttl(), Duration::hours(1));
    }

    #[test]
    fn invite_link_round_trip() {
        let svc = service();
        let now = Utc::now();
        let url = svc
            .generate_purpose_link(LinkPurpose::Invite, "https://app.test/invite", "inv_42", now)
            .unwrap();

        let token = svc
            .validate_purpose_link(LinkPurpose::Invite, pairs(&url), now + Duration::days(6))
            .unwrap();
        assert_eq!(token, "inv_42");
    }

    #[test]
    fn reset_link_expires_after_an_hour() {
        let svc = service();
        let now = Utc::now();
        let url = svc
            .generate_purpose_link(LinkPurpose::PasswordReset, "https://app.test/reset", "r1", now)
            .unwrap();

        let err = svc
            .validate_purpose_link(LinkPurpose::PasswordReset, pairs(&url), now + Duration::minutes(61))
            .unwrap_err();
        assert_eq!(err, LinkError::LinkExpired);
    }

    #[test]
    fn purpose_is_checked() {
        let svc = service();
        let now = Utc::now();
        let url = svc
            .generate_purpose_link(LinkPurpose::PasswordReset, "https://app.test/reset", "r1", now)
            .unwrap();

        let err = svc
            .validate_purpose_link(LinkPurpose::Invite, pairs(&url), now)
            .unwrap_err();
        assert_eq!(err, LinkError::PurposeMismatch);
    }

    #[test]
    fn plain_signed_link_is_not_a_purpose_link() {
        let svc = service();
        let now = Utc::now();
        let url = svc
            .generate_signed_url("https://app.test/x", [("token", "t")], Duration::hours(1), now)
            .unwrap();

        let err = svc
            .validate_purpose_link(LinkPurpose::EmailVerification, pairs(&url), now)
            .unwrap_err();
        assert_eq!(err, LinkError::PurposeMismatch);
    }
}
