use super::*;

fn signer() -> TokenSigner {
    TokenSigner::new("unit-test-secret")
}

fn claims(exp: i64) -> Claims {
    Claims { sub: "user-1".into(), name: "Ada".into(), exp }
}

#[test]
fn sign_verify_round_trip() {
    let signer = signer();
    let token = signer.sign(&claims(now_ms() + 60_000));

    let verified = signer.verify(&token, now_ms()).expect("token should verify");
    assert_eq!(verified.sub, "user-1");
    assert_eq!(verified.name, "Ada");
}

#[test]
fn expired_token_fails_closed() {
    let signer = signer();
    let token = signer.sign(&claims(now_ms() - 1));
    assert!(signer.verify(&token, now_ms()).is_none());
}

#[test]
fn tampered_payload_fails_closed() {
    let signer = signer();
    let token = signer.sign(&claims(now_ms() + 60_000));
    let (payload, signature) = token.split_once('.').expect("token shape");

    // Flip one hex digit of the payload.
    let mut bytes: Vec<char> = payload.chars().collect();
    bytes[0] = if bytes[0] == '0' { '1' } else { '0' };
    let tampered: String = bytes.into_iter().collect();

    assert!(signer.verify(&format!("{tampered}.{signature}"), now_ms()).is_none());
}

#[test]
fn wrong_secret_fails_closed() {
    let token = signer().sign(&claims(now_ms() + 60_000));
    assert!(TokenSigner::new("other-secret").verify(&token, now_ms()).is_none());
}

#[test]
fn garbage_tokens_fail_closed() {
    let signer = signer();
    for token in ["", ".", "nodot", "zz.zz", "abc.def.ghi", "0g12.aa"] {
        assert!(signer.verify(token, now_ms()).is_none(), "accepted {token:?}");
    }
}

#[test]
fn guest_grant_is_prefixed_and_time_bounded() {
    let signer = signer();
    let issued_at = now_ms();
    let grant = signer.issue_guest(issued_at);

    assert!(grant.guest_id.starts_with(GUEST_ID_PREFIX));

    let claims = signer.verify(&grant.token, issued_at).expect("grant should verify");
    assert_eq!(claims.sub, grant.guest_id);
    assert_eq!(claims.name, "Guest");
    assert_eq!(claims.exp, issued_at + GUEST_TOKEN_TTL_MS);

    // Past the window the grant no longer verifies.
    assert!(signer.verify(&grant.token, issued_at + GUEST_TOKEN_TTL_MS).is_none());
}

#[test]
fn resolve_identity_with_valid_token_is_verified() {
    let signer = signer();
    let token = signer.sign(&claims(now_ms() + 60_000));

    let identity = resolve_identity(&signer, Some(&token), now_ms());
    assert!(identity.verified);
    assert!(identity.is_authenticated());
    assert!(!identity.is_guest());
    assert_eq!(identity.user_id, "user-1");
}

#[test]
fn resolve_identity_without_token_mints_guest() {
    let signer = signer();
    let identity = resolve_identity(&signer, None, now_ms());

    assert!(!identity.verified);
    assert!(identity.is_guest());
    assert!(!identity.is_authenticated());
    assert_eq!(identity.user_name, "Guest");
}

#[test]
fn guest_grant_holder_is_verified_but_not_authenticated() {
    let signer = signer();
    let grant = signer.issue_guest(now_ms());

    let identity = resolve_identity(&signer, Some(&grant.token), now_ms());
    assert!(identity.verified);
    assert!(identity.is_guest());
    assert!(!identity.is_authenticated());
    assert_eq!(identity.user_id, grant.guest_id);
}

#[test]
fn distinct_guest_identities_per_resolution() {
    let signer = signer();
    let a = resolve_identity(&signer, None, now_ms());
    let b = resolve_identity(&signer, None, now_ms());
    assert_ne!(a.user_id, b.user_id);
}
