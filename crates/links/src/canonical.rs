//! Canonical form and HMAC over link parameters.

use std::collections::BTreeMap;

use base64::{Engine, engine::general_purpose::URL_SAFE};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::{LinkError, SIG_PARAM};

type HmacSha256 = Hmac<Sha256>;

/// `k1=v1&k2=v2...` over every parameter except `sig`, keys in byte order.
///
/// Unambiguous only while keys contain neither `=` nor `&` and values contain
/// no `&`; see [`check_parameter`].
pub fn canonical_form(params: &BTreeMap<String, String>) -> String {
    params
        .iter()
        .filter(|(k, _)| k.as_str() != SIG_PARAM)
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&")
}

/// Reject parameters that would make two different maps share a canonical form.
pub fn check_parameter(key: &str, value: &str) -> Result<(), LinkError> {
    if key.is_empty() {
        return Err(LinkError::InvalidParameter("empty parameter name".into()));
    }
    if key.contains(['=', '&']) {
        return Err(LinkError::InvalidParameter(format!(
            "parameter name '{key}' contains '=' or '&'"
        )));
    }
    if value.contains('&') {
        return Err(LinkError::InvalidParameter(format!(
            "value of '{key}' contains '&'"
        )));
    }
    Ok(())
}

/// base64url(HMAC-SHA256(key, canonical_form(params))).
pub fn sign(key: &[u8], params: &BTreeMap<String, String>) -> String {
    URL_SAFE.encode(mac(key, params))
}

/// Constant-time comparison of a presented signature.
pub fn verify(key: &[u8], params: &BTreeMap<String, String>, presented: &str) -> bool {
    let Ok(presented) = URL_SAFE.decode(presented) else {
        return false;
    };
    let expected = mac(key, params);
    presented.ct_eq(expected.as_slice()).into()
}

fn mac(key: &[u8], params: &BTreeMap<String, String>) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC can take key of any size");
    mac.update(canonical_form(params).as_bytes());
    mac.finalize().into_bytes().to_vec()
}
