//! End-to-end tests for the access token request validation pipeline.
//!
//! Each test drives [`AccessTokenRequestValidator::validate`] with a real
//! signed token (or a deliberately broken one) and checks the resulting
//! audit trail, failure kind, repository traffic and logger traffic.
#![allow(clippy::expect_used, clippy::unwrap_used, clippy::panic)]

use std::{
    collections::HashSet,
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use chrono::Utc;
use lti_core_authn::{
    AccessTokenRequestValidator, ValidationFailureKind, ValidationLogger, ValidatorConfig,
    assert_validation_failure,
    testutil::{TestKeyPair, bearer_request, create_access_token, craft_raw_jwt, sign_claims},
};
use lti_core_registration::{
    MemoryRegistrationRepository, Registration, RegistrationRepository, RegistryError,
    RegistryResult,
};
use serde_json::json;

const MARKER_TOKEN_VALID: &str = "JWT access token is valid";
const MARKER_SCOPES_VALID: &str = "JWT access token scopes are valid";

// ===========================================================================
// Helpers
// ===========================================================================

/// Repository wrapper that counts client id lookups.
struct CountingRepository<R> {
    inner: R,
    lookups: AtomicUsize,
}

impl<R> CountingRepository<R> {
    fn new(inner: R) -> Self {
        Self { inner, lookups: AtomicUsize::new(0) }
    }

    fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

impl<R: RegistrationRepository> RegistrationRepository for CountingRepository<R> {
    fn find(&self, id: &str) -> RegistryResult<Option<Registration>> {
        self.inner.find(id)
    }

    fn find_all(&self) -> RegistryResult<Vec<Registration>> {
        self.inner.find_all()
    }

    fn find_by_client_id(&self, client_id: &str) -> RegistryResult<Option<Registration>> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        self.inner.find_by_client_id(client_id)
    }
}

/// Repository whose lookups always fail.
struct UnavailableRepository;

impl RegistrationRepository for UnavailableRepository {
    fn find(&self, _id: &str) -> RegistryResult<Option<Registration>> {
        Err(RegistryError::connection("registry unavailable"))
    }

    fn find_all(&self) -> RegistryResult<Vec<Registration>> {
        Err(RegistryError::connection("registry unavailable"))
    }

    fn find_by_client_id(&self, _client_id: &str) -> RegistryResult<Option<Registration>> {
        Err(RegistryError::connection("registry unavailable"))
    }
}

/// Logger that keeps every message.
#[derive(Default)]
struct RecordingLogger {
    messages: Mutex<Vec<String>>,
}

impl RecordingLogger {
    fn messages(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }
}

impl ValidationLogger for RecordingLogger {
    fn error(&self, message: &str) {
        self.messages.lock().unwrap().push(message.to_owned());
    }
}

struct Fixture {
    pair: TestKeyPair,
    repository: Arc<CountingRepository<MemoryRegistrationRepository>>,
    logger: Arc<RecordingLogger>,
    validator: AccessTokenRequestValidator,
}

/// A validator backed by one registration (`reg-1` / `client-1`).
fn fixture() -> Fixture {
    fixture_with_config(ValidatorConfig::default())
}

fn fixture_with_config(config: ValidatorConfig) -> Fixture {
    let pair = TestKeyPair::generate();
    let memory = MemoryRegistrationRepository::new();
    memory.insert(pair.registration("reg-1", "client-1")).unwrap();

    let repository = Arc::new(CountingRepository::new(memory));
    let logger = Arc::new(RecordingLogger::default());
    let validator = AccessTokenRequestValidator::builder()
        .repository(repository.clone())
        .logger(logger.clone())
        .config(config)
        .build();

    Fixture { pair, repository, logger, validator }
}

fn scopes(values: &[&str]) -> HashSet<String> {
    values.iter().map(|s| (*s).to_owned()).collect()
}

fn full_trail(client_id: &str, registration_id: &str) -> Vec<String> {
    vec![
        format!("Registration found for client_id: {client_id}"),
        format!("Platform key chain found for registration: {registration_id}"),
        MARKER_TOKEN_VALID.to_owned(),
        MARKER_SCOPES_VALID.to_owned(),
    ]
}

// ===========================================================================
// 1. Successful validation
// ===========================================================================

#[test]
fn test_valid_token_passes_every_stage() {
    let f = fixture();
    let token = create_access_token(&f.pair, "client-1", &["read", "write"]);

    let result = f.validator.validate(&bearer_request(&token), &scopes(&["write"]));

    assert!(result.succeeded(), "expected success, got: {result:?}");
    assert!(!result.has_error());
    assert_eq!(result.successes(), full_trail("client-1", "reg-1").as_slice());
    assert_eq!(result.registration().map(Registration::id), Some("reg-1"));
    assert_eq!(result.token().map(|t| t.as_str()), Some(token.as_str()));
    assert_eq!(f.repository.lookups(), 1);
    assert!(f.logger.messages().is_empty(), "success must not be logged");
}

#[test]
fn test_string_audience_is_accepted() {
    let f = fixture();
    let now = Utc::now().timestamp();
    let token = sign_claims(
        &f.pair,
        &json!({"aud": "client-1", "exp": now + 600, "iat": now, "scope": "read write"}),
    );

    let result = f.validator.validate(&bearer_request(&token), &scopes(&["read"]));

    assert!(result.succeeded(), "expected success, got: {result:?}");
    assert_eq!(result.successes().len(), 4);
}

#[test]
fn test_lowercase_bearer_scheme_is_accepted() {
    let f = fixture();
    let token = create_access_token(&f.pair, "client-1", &["read"]);
    let request = http::Request::builder()
        .header(http::header::AUTHORIZATION, format!("bearer {token}"))
        .body(())
        .unwrap();

    let result = f.validator.validate(&request, &scopes(&["read"]));

    assert!(result.succeeded(), "expected success, got: {result:?}");
}

#[test]
fn test_first_audience_entry_selects_registration() {
    let f = fixture();
    let now = Utc::now().timestamp();
    let token = sign_claims(
        &f.pair,
        &json!({"aud": ["client-1", "client-2"], "exp": now + 600, "scopes": ["read"]}),
    );

    let result = f.validator.validate(&bearer_request(&token), &scopes(&["read"]));

    assert!(result.succeeded(), "expected success, got: {result:?}");
    assert_eq!(result.successes()[0], "Registration found for client_id: client-1");
}

// ===========================================================================
// 2. Early failures leave an empty trail
// ===========================================================================

#[test]
fn test_missing_authorization_header() {
    let f = fixture();
    let request = http::Request::builder().body(()).unwrap();

    let result = f.validator.validate(&request, &scopes(&["read"]));

    assert_validation_failure!(result, MissingAuthorizationHeader);
    assert_eq!(result.error(), Some("Missing Authorization header"));
    assert!(result.successes().is_empty());
    assert_eq!(f.repository.lookups(), 0);
    assert_eq!(f.logger.messages(), ["Missing Authorization header"]);
}

#[test]
fn test_non_bearer_scheme_is_malformed() {
    let f = fixture();
    let request = http::Request::builder()
        .header(http::header::AUTHORIZATION, "Basic dXNlcjpwYXNz")
        .body(())
        .unwrap();

    let result = f.validator.validate(&request, &scopes(&["read"]));

    assert_validation_failure!(result, MalformedToken);
    assert!(result.successes().is_empty());
    assert_eq!(f.repository.lookups(), 0);
}

#[test]
fn test_malformed_tokens_never_reach_the_repository() {
    let f = fixture();
    let cases = [
        "not-a-jwt",
        "only.two",
        "a.b.c.d",
        "!!!.@@@.###",
        "eyJhbGciOiJFZERTQSJ9.not-base64-json!.sig",
    ];

    for case in cases {
        let result = f.validator.validate(&bearer_request(case), &scopes(&["read"]));
        assert_validation_failure!(result, MalformedToken, case);
        assert!(result.successes().is_empty(), "{case}: trail should be empty");
        assert!(
            result.error().unwrap().starts_with("Malformed access token"),
            "{case}: unexpected message {:?}",
            result.error()
        );
    }

    assert_eq!(f.repository.lookups(), 0);
    assert_eq!(f.logger.messages().len(), cases.len());
}

#[test]
fn test_missing_audience_claim() {
    let f = fixture();
    let now = Utc::now().timestamp();
    let token = sign_claims(&f.pair, &json!({"sub": "client-1", "exp": now + 600}));

    let result = f.validator.validate(&bearer_request(&token), &scopes(&["read"]));

    assert_validation_failure!(result, InvalidAudienceClaim);
    assert!(result.successes().is_empty());
    assert_eq!(f.repository.lookups(), 0);
}

#[test]
fn test_empty_audience_list() {
    let f = fixture();
    let token = sign_claims(&f.pair, &json!({"aud": [], "exp": Utc::now().timestamp() + 600}));

    let result = f.validator.validate(&bearer_request(&token), &scopes(&["read"]));

    assert_validation_failure!(result, InvalidAudienceClaim);
    assert!(result.successes().is_empty());
}

#[test]
fn test_non_string_first_audience_does_not_fall_through() {
    let f = fixture();
    let now = Utc::now().timestamp();
    let token =
        sign_claims(&f.pair, &json!({"aud": [7, "client-1"], "exp": now + 60, "scopes": ["read"]}));

    let result = f.validator.validate(&bearer_request(&token), &scopes(&["read"]));

    assert_validation_failure!(result, InvalidAudienceClaim);
    assert!(result.successes().is_empty());
    assert_eq!(f.repository.lookups(), 0);
}

#[test]
fn test_unknown_client_id() {
    let f = fixture();
    let token = create_access_token(&f.pair, "client-unknown", &["read"]);

    let result = f.validator.validate(&bearer_request(&token), &scopes(&["read"]));

    assert_validation_failure!(result, UnknownClientId);
    assert_eq!(result.error(), Some("No registration found for client_id: client-unknown"));
    assert!(result.successes().is_empty());
    assert_eq!(f.repository.lookups(), 1);
}

#[test]
fn test_repository_error_is_distinct_from_unknown_client() {
    let pair = TestKeyPair::generate();
    let logger = Arc::new(RecordingLogger::default());
    let validator = AccessTokenRequestValidator::builder()
        .repository(Arc::new(UnavailableRepository))
        .logger(logger.clone())
        .build();
    let token = create_access_token(&pair, "client-1", &["read"]);

    let result = validator.validate(&bearer_request(&token), &scopes(&["read"]));

    assert_validation_failure!(result, RegistrationLookupFailed);
    assert!(result.successes().is_empty());
    let message = result.error().unwrap();
    assert!(message.contains("client-1"), "message should name the client: {message}");
    assert!(message.contains("registry unavailable"), "message should keep the cause: {message}");
    assert_eq!(logger.messages().len(), 1);
}

// ===========================================================================
// 3. Failures after the lookup keep the partial trail
// ===========================================================================

#[test]
fn test_registration_without_platform_key_chain() {
    let pair = TestKeyPair::generate();
    let repository = MemoryRegistrationRepository::new();
    repository
        .insert(Registration::builder().id("reg-bare").client_id("client-bare").build())
        .unwrap();
    let validator = AccessTokenRequestValidator::new(Arc::new(repository));
    let token = create_access_token(&pair, "client-bare", &["read"]);

    let result = validator.validate(&bearer_request(&token), &scopes(&["read"]));

    assert_validation_failure!(result, MissingPlatformKeyChain);
    assert_eq!(result.successes(), ["Registration found for client_id: client-bare"]);
    assert_eq!(result.error(), Some("Missing platform key chain for registration: reg-bare"));
}

#[test]
fn test_token_signed_by_another_key() {
    let f = fixture();
    let intruder = TestKeyPair::generate();
    let token = create_access_token(&intruder, "client-1", &["read"]);

    let result = f.validator.validate(&bearer_request(&token), &scopes(&["read"]));

    assert_validation_failure!(result, TokenValidationFailed);
    assert_eq!(result.successes(), &full_trail("client-1", "reg-1")[..2]);
    assert!(result.error().unwrap().starts_with("JWT access token is invalid"));
}

#[test]
fn test_tampered_payload_fails_signature() {
    let f = fixture();
    let token = create_access_token(&f.pair, "client-1", &["read"]);
    let forged = create_access_token(&f.pair, "client-1", &["read", "admin"]);

    // Splice the forged payload onto the original signature.
    let original: Vec<&str> = token.split('.').collect();
    let payload = forged.split('.').nth(1).unwrap();
    let spliced = format!("{}.{}.{}", original[0], payload, original[2]);

    let result = f.validator.validate(&bearer_request(&spliced), &scopes(&["admin"]));

    assert_validation_failure!(result, TokenValidationFailed);
    assert_eq!(result.successes().len(), 2);
}

#[test]
fn test_expired_token() {
    let f = fixture();
    let now = Utc::now().timestamp();
    let token = sign_claims(
        &f.pair,
        &json!({"aud": ["client-1"], "exp": now - 1, "iat": now - 3600, "scopes": ["read"]}),
    );

    let result = f.validator.validate(&bearer_request(&token), &scopes(&["read"]));

    assert_validation_failure!(result, TokenValidationFailed);
    assert!(result.error().unwrap().contains("expired"), "got: {:?}", result.error());
    assert_eq!(result.successes().len(), 2);
}

#[test]
fn test_expired_token_within_leeway() {
    let config = ValidatorConfig::builder().leeway(Duration::from_secs(60)).build().unwrap();
    let f = fixture_with_config(config);
    let now = Utc::now().timestamp();
    let token =
        sign_claims(&f.pair, &json!({"aud": ["client-1"], "exp": now - 5, "scopes": ["read"]}));

    let result = f.validator.validate(&bearer_request(&token), &scopes(&["read"]));

    assert!(result.succeeded(), "expected success, got: {result:?}");
}

#[test]
fn test_future_not_before() {
    let f = fixture();
    let now = Utc::now().timestamp();
    let token = sign_claims(
        &f.pair,
        &json!({"aud": ["client-1"], "exp": now + 7200, "nbf": now + 3600, "scopes": ["read"]}),
    );

    let result = f.validator.validate(&bearer_request(&token), &scopes(&["read"]));

    assert_validation_failure!(result, TokenValidationFailed);
    assert_eq!(result.successes().len(), 2);
}

#[test]
fn test_missing_expiration_rejected_by_default() {
    let f = fixture();
    let token = sign_claims(&f.pair, &json!({"aud": ["client-1"], "scopes": ["read"]}));

    let result = f.validator.validate(&bearer_request(&token), &scopes(&["read"]));

    assert_validation_failure!(result, TokenValidationFailed);
    assert!(result.error().unwrap().contains("exp"), "got: {:?}", result.error());
}

#[test]
fn test_issuer_mismatch() {
    let config = ValidatorConfig::builder().issuer("https://other.example.com").build().unwrap();
    let f = fixture_with_config(config);
    let token = create_access_token(&f.pair, "client-1", &["read"]);

    let result = f.validator.validate(&bearer_request(&token), &scopes(&["read"]));

    assert_validation_failure!(result, TokenValidationFailed);
    assert_eq!(result.successes().len(), 2);
}

#[test]
fn test_symmetric_algorithm_rejected_after_key_lookup() {
    let f = fixture();
    let now = Utc::now().timestamp();
    let token = craft_raw_jwt(
        &json!({"typ": "JWT", "alg": "HS256"}),
        &json!({"aud": ["client-1"], "exp": now + 600, "scopes": ["read"]}),
    );

    let result = f.validator.validate(&bearer_request(&token), &scopes(&["read"]));

    assert_validation_failure!(result, TokenValidationFailed);
    assert!(result.error().unwrap().contains("HS256"), "got: {:?}", result.error());
}

#[test]
fn test_algorithm_none_rejected_before_lookup() {
    let f = fixture();
    let token = craft_raw_jwt(
        &json!({"typ": "JWT", "alg": "none"}),
        &json!({"aud": ["client-1"], "exp": Utc::now().timestamp() + 600}),
    );

    let result = f.validator.validate(&bearer_request(&token), &scopes(&["read"]));

    assert_validation_failure!(result, MalformedToken);
    assert_eq!(f.repository.lookups(), 0);
}

#[test]
fn test_pem_platform_key_verifies() {
    let pair = TestKeyPair::generate();
    let chain = lti_core_registration::KeyChain::builder()
        .id("pem-key")
        .key_set_name("platformSet")
        .public_key(pair.public_key_pem())
        .build();
    let repository = MemoryRegistrationRepository::new();
    repository
        .insert(
            Registration::builder()
                .id("reg-pem")
                .client_id("client-pem")
                .platform_key_chain(chain)
                .build(),
        )
        .unwrap();
    let validator = AccessTokenRequestValidator::new(Arc::new(repository));
    let token = create_access_token(&pair, "client-pem", &["read"]);

    let result = validator.validate(&bearer_request(&token), &scopes(&["read"]));

    assert!(result.succeeded(), "expected success, got: {result:?}");
}

// ===========================================================================
// 4. Scope intersection
// ===========================================================================

#[test]
fn test_disjoint_scopes() {
    let f = fixture();
    let token = create_access_token(&f.pair, "client-1", &["read"]);

    let result = f.validator.validate(&bearer_request(&token), &scopes(&["admin"]));

    assert_validation_failure!(result, InsufficientScope);
    assert_eq!(result.error(), Some("JWT access token scopes are invalid"));
    assert_eq!(result.successes(), &full_trail("client-1", "reg-1")[..3]);
    assert!(result.registration().is_none());
}

#[test]
fn test_empty_allowed_scopes_always_fail() {
    let f = fixture();
    let token = create_access_token(&f.pair, "client-1", &["read", "write"]);

    let result = f.validator.validate(&bearer_request(&token), &HashSet::new());

    assert_validation_failure!(result, InsufficientScope);
    assert_eq!(result.successes().len(), 3);
}

#[test]
fn test_token_without_scopes_fails() {
    let f = fixture();
    let token = sign_claims(
        &f.pair,
        &json!({"aud": ["client-1"], "exp": Utc::now().timestamp() + 600}),
    );

    let result = f.validator.validate(&bearer_request(&token), &scopes(&["read"]));

    assert_validation_failure!(result, InsufficientScope);
}

// ===========================================================================
// 5. Logging, idempotence and concurrency
// ===========================================================================

#[test]
fn test_each_failure_logged_exactly_once() {
    let f = fixture();
    let token = create_access_token(&f.pair, "client-1", &["read"]);

    let failed = f.validator.validate(&bearer_request(&token), &scopes(&["admin"]));
    let passed = f.validator.validate(&bearer_request(&token), &scopes(&["read"]));

    assert!(failed.has_error());
    assert!(passed.succeeded());
    assert_eq!(f.logger.messages(), ["JWT access token scopes are invalid"]);
}

#[test]
fn test_validation_is_idempotent() {
    let f = fixture();
    let token = create_access_token(&f.pair, "client-1", &["read"]);
    let request = bearer_request(&token);
    let allowed = scopes(&["read"]);

    let first = f.validator.validate(&request, &allowed);
    let second = f.validator.validate(&request, &allowed);

    assert!(first.succeeded());
    assert_eq!(first.successes(), second.successes());
    assert_eq!(first.error(), second.error());
    assert_eq!(f.repository.lookups(), 2);
}

#[test]
fn test_failure_does_not_leak_into_next_call() {
    let f = fixture();
    let token = create_access_token(&f.pair, "client-1", &["read"]);

    let _ = f.validator.validate(&bearer_request("garbage"), &scopes(&["read"]));
    let result = f.validator.validate(&bearer_request(&token), &scopes(&["read"]));

    assert!(result.succeeded());
    assert_eq!(result.successes().len(), 4);
}

#[test]
fn test_concurrent_calls_keep_separate_trails() {
    const CLIENTS: usize = 16;

    let memory = MemoryRegistrationRepository::new();
    let pairs: Vec<TestKeyPair> = (0..CLIENTS).map(|_| TestKeyPair::generate()).collect();
    for (i, pair) in pairs.iter().enumerate() {
        memory.insert(pair.registration(&format!("reg-{i}"), &format!("client-{i}"))).unwrap();
    }
    let validator = AccessTokenRequestValidator::new(Arc::new(memory));
    let allowed = scopes(&["read"]);

    std::thread::scope(|s| {
        let handles: Vec<_> = pairs
            .iter()
            .enumerate()
            .map(|(i, pair)| {
                let validator = &validator;
                let allowed = &allowed;
                s.spawn(move || {
                    let client_id = format!("client-{i}");
                    let token = create_access_token(pair, &client_id, &["read"]);
                    (i, validator.validate(&bearer_request(&token), allowed))
                })
            })
            .collect();

        for handle in handles {
            let (i, result) = handle.join().unwrap();
            assert!(result.succeeded(), "client-{i} failed: {result:?}");
            assert_eq!(
                result.successes(),
                full_trail(&format!("client-{i}"), &format!("reg-{i}")).as_slice()
            );
        }
    });
}

#[test]
fn test_failure_kinds_match_messages() {
    let f = fixture();
    let request = http::Request::builder().body(()).unwrap();

    let result = f.validator.validate(&request, &scopes(&["read"]));

    assert_eq!(result.failure_kind(), Some(ValidationFailureKind::MissingAuthorizationHeader));
    assert_eq!(result.error(), Some("Missing Authorization header"));
}
