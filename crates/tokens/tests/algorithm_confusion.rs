//! Tokens that try to smuggle a symmetric signature past RS256 verification.

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::Utc;
use hmac::{Hmac, Mac};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde_json::json;
use sha2::Sha256;

use warden_core::KeyHandle;
use warden_tokens::{AuthFailure, TokenContext, TokenError, TokenKeyRing, TokenService, TokenTtls};

const PRIVATE_PEM: &[u8] = include_bytes!("fixtures/rsa_primary_private.pem");
const PUBLIC_PEM: &[u8] = include_bytes!("fixtures/rsa_primary_public.pem");

fn service() -> TokenService {
    let ring = TokenKeyRing::from_pem("k1", PRIVATE_PEM, PUBLIC_PEM).unwrap();
    TokenService::new(KeyHandle::new(ring), TokenTtls::default())
}

fn payload() -> serde_json::Value {
    let now = Utc::now().timestamp();
    json!({
        "sub": "u1",
        "aud": "console",
        "iss": "https://auth.example.com/tenants/acme",
        "iat": now,
        "nbf": now,
        "exp": now + 600,
        "jti": "00112233445566778899aabbccddeeff",
        "token_type": "access",
        "scope": "openid admin",
    })
}

/// Hand-assemble a JWT whose signature is HMAC-SHA256 keyed with `secret`.
fn hmac_signed(header: serde_json::Value, secret: &[u8]) -> String {
    let header = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&header).unwrap());
    let body = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&payload()).unwrap());
    let signing_input = format!("{header}.{body}");

    let mut mac = Hmac::<Sha256>::new_from_slice(secret).unwrap();
    mac.update(signing_input.as_bytes());
    let sig = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());
    format!("{signing_input}.{sig}")
}

#[test]
fn hs256_signed_with_public_key_is_rejected() {
    // Classic confusion: the attacker knows the public key and uses it as
    // the HMAC secret, hoping the verifier treats it as a shared key.
    let mut header = Header::new(Algorithm::HS256);
    header.kid = Some("k1".into());
    let token =
        jsonwebtoken::encode(&header, &payload(), &EncodingKey::from_secret(PUBLIC_PEM)).unwrap();

    let err = service().validate_token(&token, Utc::now()).unwrap_err();
    assert_eq!(err, TokenError::UnsupportedAlgorithm);
    assert_eq!(err.to_public(), AuthFailure::Unauthenticated);
}

#[test]
fn hmac_signature_under_rs256_header_is_rejected() {
    let token = hmac_signed(json!({"alg": "RS256", "typ": "JWT", "kid": "k1"}), PUBLIC_PEM);

    let err = service().validate_token(&token, Utc::now()).unwrap_err();
    assert_eq!(err, TokenError::InvalidSignature);
}

#[test]
fn other_asymmetric_algorithms_are_rejected() {
    let svc = service();
    let issued = svc
        .issue_access_token(
            TokenContext::new("u1", "console", "https://auth.example.com/tenants/acme"),
            "openid",
            Utc::now(),
        )
        .unwrap();
    let parts: Vec<&str> = issued.split('.').collect();

    // Same RSA signature bytes, header relabelled as PS256.
    let relabelled = URL_SAFE_NO_PAD.encode(br#"{"alg":"PS256","typ":"JWT","kid":"k1"}"#);
    let token = format!("{relabelled}.{}.{}", parts[1], parts[2]);

    let err = svc.validate_token(&token, Utc::now()).unwrap_err();
    assert_eq!(err, TokenError::UnsupportedAlgorithm);
}

#[test]
fn unsigned_tokens_are_rejected() {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"none","typ":"JWT","kid":"k1"}"#);
    let body = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&payload()).unwrap());
    let token = format!("{header}.{body}.");

    let err = service().validate_token(&token, Utc::now()).unwrap_err();
    assert_eq!(err.to_public(), AuthFailure::Unauthenticated);
}
