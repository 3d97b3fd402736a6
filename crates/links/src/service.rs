//! Signed URL generation and verification.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use secrecy::{ExposeSecret, SecretSlice};
use tracing::debug;
use url::Url;

use warden_core::KeyHandle;

use crate::canonical::{check_parameter, sign, verify};
use crate::{EXPIRES_PARAM, LinkError, SIG_PARAM};

/// HMAC key for link signatures.
#[derive(Debug)]
pub struct LinkKey {
    secret: Option<SecretSlice<u8>>,
}

impl LinkKey {
    pub fn new(secret: SecretSlice<u8>) -> Self {
        Self {
            secret: Some(secret),
        }
    }

    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self::new(SecretSlice::from(bytes))
    }

    /// No key loaded: every operation fails with `KeyNotInitialized`.
    pub fn empty() -> Self {
        Self { secret: None }
    }

    fn bytes(&self) -> Result<&[u8], LinkError> {
        match &self.secret {
            Some(secret) if !secret.expose_secret().is_empty() => Ok(secret.expose_secret()),
            _ => Err(LinkError::KeyNotInitialized),
        }
    }
}

/// Mints and verifies signed links against a swappable key.
#[derive(Debug, Clone)]
pub struct SignedLinkService {
    key: KeyHandle<LinkKey>,
}

impl SignedLinkService {
    pub fn new(key: KeyHandle<LinkKey>) -> Self {
        Self { key }
    }

    pub fn key(&self) -> &KeyHandle<LinkKey> {
        &self.key
    }

    /// Build `base_url?<params>&expires=<now+ttl>&sig=<hmac>`.
    ///
    /// The base URL must be absolute. Pairs already in its query are signed
    /// along with `params`; callers may not supply `expires` or `sig`.
    ///
    /// The canonical form joins pairs with `&`, so a value containing `&` (or a
    /// key containing `=` or `&`) would let two different parameter sets sign
    /// the same bytes and is rejected with `InvalidParameter`. Percent-encode
    /// such values first, e.g. a redirect target `/a?x=1&y=2` travels as
    /// `/a?x=1%26y=2` and is decoded by the caller after validation.
    pub fn generate_signed_url<I, K, V>(
        &self,
        base_url: &str,
        params: I,
        ttl: Duration,
        now: DateTime<Utc>,
    ) -> Result<String, LinkError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let key = self.key.load();
        let key = key.bytes()?;

        let mut url = Url::parse(base_url).map_err(|e| LinkError::InvalidBaseUrl(e.to_string()))?;
        let existing: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        url.set_query(None);

        let mut signed = BTreeMap::new();
        let supplied = params.into_iter().map(|(k, v)| (k.into(), v.into()));
        for (k, v) in existing.into_iter().chain(supplied) {
            if k == EXPIRES_PARAM || k == SIG_PARAM {
                return Err(LinkError::ReservedParameter(k));
            }
            check_parameter(&k, &v)?;
            if signed.insert(k.clone(), v).is_some() {
                return Err(LinkError::InvalidParameter(format!("duplicate parameter '{k}'")));
            }
        }
        let expires = now.timestamp() + ttl.num_seconds();
        signed.insert(EXPIRES_PARAM.to_string(), expires.to_string());

        let sig = sign(key, &signed);
        url.query_pairs_mut()
            .extend_pairs(signed.iter())
            .append_pair(SIG_PARAM, &sig);

        debug!(expires, params = signed.len(), "generated signed link");
        Ok(url.into())
    }

    /// Verify parsed query parameters and return them without `sig`.
    ///
    /// Checks, in order: `sig` present, signature over everything else,
    /// `expires` present and numeric, `now <= expires`. The signature is
    /// checked before the expiry so a tampered link always reads as tampered.
    pub fn validate_signed_url<I, K, V>(
        &self,
        values: I,
        now: DateTime<Utc>,
    ) -> Result<BTreeMap<String, String>, LinkError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let result = self.validate_inner(values, now);
        if let Err(err) = &result {
            debug!(reason = %err, "signed link rejected");
        }
        result
    }

    /// Verify a raw query string (`a=1&b=2&expires=..&sig=..`).
    pub fn validate_query(
        &self,
        query: &str,
        now: DateTime<Utc>,
    ) -> Result<BTreeMap<String, String>, LinkError> {
        let query = query.strip_prefix('?').unwrap_or(query);
        let pairs = url::form_urlencoded::parse(query.as_bytes())
            .map(|(k, v)| (k.into_owned(), v.into_owned()));
        self.validate_signed_url(pairs, now)
    }

    /// Verify a complete URL as produced by [`generate_signed_url`](Self::generate_signed_url).
    pub fn validate_url(
        &self,
        url: &str,
        now: DateTime<Utc>,
    ) -> Result<BTreeMap<String, String>, LinkError> {
        let url = Url::parse(url).map_err(|_| LinkError::MissingParameters)?;
        self.validate_query(url.query().unwrap_or_default(), now)
    }

    fn validate_inner<I, K, V>(
        &self,
        values: I,
        now: DateTime<Utc>,
    ) -> Result<BTreeMap<String, String>, LinkError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let key = self.key.load();
        let key = key.bytes()?;

        let mut params = BTreeMap::new();
        for (k, v) in values {
            let (k, v) = (k.into(), v.into());
            if params.contains_key(&k) {
                return Err(LinkError::InvalidParameter(format!("duplicate parameter '{k}'")));
            }
            params.insert(k, v);
        }

        let sig = params.remove(SIG_PARAM).ok_or(LinkError::MissingParameters)?;
        if !params.contains_key(EXPIRES_PARAM) {
            return Err(LinkError::MissingParameters);
        }
        for (k, v) in &params {
            check_parameter(k, v)?;
        }

        if !verify(key, &params, &sig) {
            return Err(LinkError::InvalidSignature);
        }

        let expires: i64 = params[EXPIRES_PARAM]
            .parse()
            .map_err(|_| LinkError::MissingParameters)?;
        if now.timestamp() > expires {
            return Err(LinkError::LinkExpired);
        }

        Ok(params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "https://app.example.com/invite/accept";

    fn service() -> SignedLinkService {
        SignedLinkService::new(KeyHandle::new(LinkKey::from_bytes(b"0123456789abcdef".to_vec())))
    }

    fn now() -> DateTime<Utc> {
        Utc::now()
    }

    fn query_of(url: &str) -> String {
        Url::parse(url).unwrap().query().unwrap().to_string()
    }

    #[test]
    fn round_trip_returns_params_with_expires() {
        let svc = service();
        let now = now();
        let url = svc
            .generate_signed_url(BASE, [("token", "inv-123"), ("tenant", "acme")], Duration::hours(1), now)
            .unwrap();
        assert!(url.starts_with("https://app.example.com/invite/accept?"));

        let params = svc.validate_url(&url, now).unwrap();
        assert_eq!(params["token"], "inv-123");
        assert_eq!(params["tenant"], "acme");
        assert_eq!(params["expires"], (now.timestamp() + 3600).to_string());
        assert!(!params.contains_key("sig"));
    }

    #[test]
    fn values_needing_encoding_survive() {
        let svc = service();
        let now = now();
        let url = svc
            .generate_signed_url(
                BASE,
                [("email", "a+b@example.com"), ("next", "/home?tab=1 2")],
                Duration::minutes(5),
                now,
            )
            .unwrap();

        let params = svc.validate_url(&url, now).unwrap();
        assert_eq!(params["email"], "a+b@example.com");
        assert_eq!(params["next"], "/home?tab=1 2");
    }

    #[test]
    fn already_expired_link_is_rejected() {
        let svc = service();
        let now = now();
        let url = svc
            .generate_signed_url(BASE, [("token", "t")], Duration::seconds(-1), now)
            .unwrap();
        assert_eq!(svc.validate_url(&url, now).unwrap_err(), LinkError::LinkExpired);
    }

    #[test]
    fn expiry_instant_itself_is_still_valid() {
        let svc = service();
        let now = now();
        let url = svc
            .generate_signed_url(BASE, [("token", "t")], Duration::seconds(60), now)
            .unwrap();
        assert!(svc.validate_url(&url, now + Duration::seconds(60)).is_ok());
        assert_eq!(
            svc.validate_url(&url, now + Duration::seconds(61)).unwrap_err(),
            LinkError::LinkExpired
        );
    }

    #[test]
    fn reordered_parameters_still_verify() {
        let svc = service();
        let now = now();
        let url = svc
            .generate_signed_url(
                BASE,
                [("token", "abc"), ("tenant", "acme"), ("role", "viewer")],
                Duration::hours(1),
                now,
            )
            .unwrap();

        let query = query_of(&url);
        let mut parts: Vec<&str> = query.split('&').collect();
        parts.reverse();
        let reordered = parts.join("&");
        assert_ne!(reordered, query);

        assert!(svc.validate_query(&reordered, now).is_ok());
    }

    #[test]
    fn every_flipped_character_is_detected() {
        let svc = service();
        let now = now();
        let url = svc
            .generate_signed_url(BASE, [("token", "abc123"), ("tenant", "acme")], Duration::hours(1), now)
            .unwrap();
        let query = query_of(&url);
        let sig_key_at = query.find("sig=").unwrap();
        let expires_key_at = query.find("expires=").unwrap();

        for (i, b) in query.bytes().enumerate() {
            // Renaming `sig` or `expires` drops the parameter instead of
            // corrupting it; that case is MissingParameters.
            if (sig_key_at..sig_key_at + 3).contains(&i)
                || (expires_key_at..expires_key_at + 7).contains(&i)
                || !b.is_ascii_alphanumeric()
            {
                continue;
            }
            let mut tampered = query.clone().into_bytes();
            tampered[i] = if b == b'x' { b'y' } else { b'x' };
            let tampered = String::from_utf8(tampered).unwrap();

            assert_eq!(
                svc.validate_query(&tampered, now).unwrap_err(),
                LinkError::InvalidSignature,
                "flip at {i} in {tampered}"
            );
        }
    }

    #[test]
    fn extended_expiry_is_detected() {
        let svc = service();
        let now = now();
        let url = svc
            .generate_signed_url(BASE, [("token", "t")], Duration::seconds(-10), now)
            .unwrap();
        let mut params: BTreeMap<String, String> =
            Url::parse(&url).unwrap().query_pairs().into_owned().collect();
        params.insert("expires".into(), (now.timestamp() + 86_400).to_string());

        assert_eq!(svc.validate_signed_url(params, now).unwrap_err(), LinkError::InvalidSignature);
    }

    #[test]
    fn missing_sig_or_expires() {
        let svc = service();
        let now = now();
        let err = svc
            .validate_signed_url([("token", "t"), ("expires", "99999999999")], now)
            .unwrap_err();
        assert_eq!(err, LinkError::MissingParameters);

        let err = svc.validate_signed_url([("token", "t"), ("sig", "AAAA")], now).unwrap_err();
        assert_eq!(err, LinkError::MissingParameters);
    }

    #[test]
    fn duplicate_parameters_are_rejected() {
        let svc = service();
        let now = now();
        let url = svc
            .generate_signed_url(BASE, [("token", "t")], Duration::hours(1), now)
            .unwrap();
        let query = format!("token=evil&{}", query_of(&url));
        assert!(matches!(
            svc.validate_query(&query, now).unwrap_err(),
            LinkError::InvalidParameter(_)
        ));
    }

    #[test]
    fn reserved_and_ambiguous_inputs_are_rejected_at_generation() {
        let svc = service();
        let now = now();
        assert_eq!(
            svc.generate_signed_url(BASE, [("sig", "x")], Duration::hours(1), now)
                .unwrap_err(),
            LinkError::ReservedParameter("sig".into())
        );
        assert_eq!(
            svc.generate_signed_url(BASE, [("expires", "1")], Duration::hours(1), now)
                .unwrap_err(),
            LinkError::ReservedParameter("expires".into())
        );
        assert!(matches!(
            svc.generate_signed_url(BASE, [("a", "1&b=2")], Duration::hours(1), now)
                .unwrap_err(),
            LinkError::InvalidParameter(_)
        ));
    }

    #[test]
    fn redirect_with_ampersand_must_be_encoded_first() {
        let svc = service();
        let now = now();
        let target = "/a?x=1&y=2";

        assert!(matches!(
            svc.generate_signed_url(BASE, [("next", target)], Duration::hours(1), now)
                .unwrap_err(),
            LinkError::InvalidParameter(_)
        ));

        let encoded: String = url::form_urlencoded::byte_serialize(target.as_bytes()).collect();
        let url = svc
            .generate_signed_url(BASE, [("next", encoded.as_str())], Duration::hours(1), now)
            .unwrap();
        let params = svc.validate_url(&url, now).unwrap();
        let decoded: String = url::form_urlencoded::parse(format!("n={}", params["next"]).as_bytes())
            .map(|(_, v)| v.into_owned())
            .next()
            .unwrap();
        assert_eq!(decoded, target);
    }

    #[test]
    fn base_url_must_be_absolute() {
        let svc = service();
        let no_params: [(&str, &str); 0] = [];
        assert!(matches!(
            svc.generate_signed_url("/relative", no_params, Duration::hours(1), now())
                .unwrap_err(),
            LinkError::InvalidBaseUrl(_)
        ));
    }

    #[test]
    fn existing_base_query_is_signed_too() {
        let svc = service();
        let now = now();
        let url = svc
            .generate_signed_url("https://x.test/p?lang=en", [("token", "t")], Duration::hours(1), now)
            .unwrap();
        let params = svc.validate_url(&url, now).unwrap();
        assert_eq!(params["lang"], "en");

        let tampered = url.replace("lang=en", "lang=fr");
        assert_eq!(svc.validate_url(&tampered, now).unwrap_err(), LinkError::InvalidSignature);

        assert!(matches!(
            svc.generate_signed_url("https://x.test/p?token=a", [("token", "b")], Duration::hours(1), now)
                .unwrap_err(),
            LinkError::InvalidParameter(_)
        ));
    }

    #[test]
    fn signatures_are_key_specific() {
        let now = now();
        let url = service()
            .generate_signed_url(BASE, [("token", "t")], Duration::hours(1), now)
            .unwrap();

        let other = SignedLinkService::new(KeyHandle::new(LinkKey::from_bytes(b"another-key".to_vec())));
        assert_eq!(other.validate_url(&url, now).unwrap_err(), LinkError::InvalidSignature);
    }

    #[test]
    fn key_rotation_invalidates_outstanding_links() {
        let svc = service();
        let now = now();
        let url = svc
            .generate_signed_url(BASE, [("token", "t")], Duration::hours(1), now)
            .unwrap();

        svc.key().swap(LinkKey::from_bytes(b"rotated".to_vec()));
        assert_eq!(svc.validate_url(&url, now).unwrap_err(), LinkError::InvalidSignature);
    }

    #[test]
    fn empty_key_is_not_initialized() {
        let svc = SignedLinkService::new(KeyHandle::new(LinkKey::empty()));
        let err = svc
            .generate_signed_url(BASE, [("token", "t")], Duration::hours(1), now())
            .unwrap_err();
        assert_eq!(err, LinkError::KeyNotInitialized);

        let svc = SignedLinkService::new(KeyHandle::new(LinkKey::from_bytes(Vec::new())));
        let err = svc.validate_query("expires=1&sig=x", now()).unwrap_err();
        assert_eq!(err, LinkError::KeyNotInitialized);
    }

    #[test]
    fn errors_never_contain_key_material() {
        let svc = service();
        let err = svc.validate_query("token=t&expires=1&sig=zz", now()).unwrap_err();
        assert!(!err.to_string().contains("0123456789abcdef"));
        assert!(!format!("{:?}", svc.key().load()).contains("0123456789abcdef"));
    }
}
