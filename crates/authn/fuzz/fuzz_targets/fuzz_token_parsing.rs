//! Fuzz target for access token parsing and claim access.
//!
//! Feeds arbitrary strings as compact JWTs to the parser, then exercises
//! every claim accessor and the key-less configuration. Each call must
//! return `Ok(...)` or `Err(AuthError)` without panicking.

#![no_main]

use libfuzzer_sys::fuzz_target;
use lti_core_authn::{Configuration, Token, validate_algorithm};

fuzz_target!(|data: &[u8]| {
    // Compact JWTs are always UTF-8
    let Ok(compact) = std::str::from_utf8(data) else {
        return;
    };

    let Ok(token) = Token::parse(compact) else {
        return;
    };

    let _ = token.audience();
    let _ = token.client_id();
    let _ = token.scopes();
    let _ = token.expires_at();
    let _ = token.not_before();
    let _ = token.issued_at();

    let alg = format!("{:?}", token.header().alg);
    let _ = validate_algorithm(&alg);

    // A key-less configuration must refuse to validate
    assert!(Configuration::parse_only().validate(&token).is_err());
});
