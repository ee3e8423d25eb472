//! Fuzz target for the full request pipeline.
//!
//! Arbitrary bytes are placed in the `Authorization` header of a request
//! validated against an empty registry. No input may panic, and no input may
//! produce a successful result.

#![no_main]

use std::{collections::HashSet, sync::Arc};

use http::{HeaderValue, Request, header::AUTHORIZATION};
use libfuzzer_sys::fuzz_target;
use lti_core_authn::{AccessTokenRequestValidator, NoopValidationLogger};
use lti_core_registration::MemoryRegistrationRepository;

fuzz_target!(|data: &[u8]| {
    let Ok(value) = HeaderValue::from_bytes(data) else {
        return;
    };
    let Ok(request) = Request::builder().header(AUTHORIZATION, value).body(()) else {
        return;
    };

    let validator = AccessTokenRequestValidator::builder()
        .repository(Arc::new(MemoryRegistrationRepository::new()))
        .logger(Arc::new(NoopValidationLogger))
        .build();

    let result = validator.validate(&request, &HashSet::from(["read".to_owned()]));
    assert!(result.has_error());
});
