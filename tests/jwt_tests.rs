use healthcare_plus_backend::config::JwtConfig;
use healthcare_plus_backend::util::jwt::*;
use chrono::Utc;

// Helper function to create JWT utils for testing
fn create_test_jwt_utils() -> JwtTokenUtilsImpl {
    JwtTokenUtilsImpl::new(JwtConfig::default())
}

struct TestUser {
    id: String,
    email: String,
    role: String,
}

impl TestUser {
    fn new_patient() -> Self {
        Self {
            id: "user123".to_string(),
            email: "patient@example.com".to_string(),
            role: "patient".to_string(),
        }
    }

    fn new_admin() -> Self {
        Self {
            id: "admin456".to_string(),
            email: "admin@example.com".to_string(),
            role: "admin".to_string(),
        }
    }
}

#[test]
fn test_jwt_utils_creation() {
    let jwt_utils = create_test_jwt_utils();
    assert!(!jwt_utils.jwt_config.jwt_secret.is_empty());
    assert_eq!(jwt_utils.expires_in(), 7 * 24 * 60 * 60);
}

#[test]
fn test_generate_token_success() {
    let jwt_utils = create_test_jwt_utils();
    let user = TestUser::new_patient();

    let token = jwt_utils.generate_token(&user.id, &user.email, &user.role).unwrap();
    assert!(!token.is_empty());

    let claims = jwt_utils.validate_token(&token).unwrap();
    assert_eq!(claims.sub, user.id);
    assert_eq!(claims.email, user.email);
    assert_eq!(claims.role, user.role);
    assert_eq!(claims.iss.as_deref(), Some("healthcare-plus-test"));
}

#[test]
fn test_token_expires_after_seven_days() {
    let jwt_utils = create_test_jwt_utils();
    let user = TestUser::new_admin();

    let before = Utc::now().timestamp();
    let token = jwt_utils.generate_token(&user.id, &user.email, &user.role).unwrap();
    let claims = jwt_utils.validate_token(&token).unwrap();

    let seven_days = 7 * 24 * 60 * 60;
    assert!(claims.exp - claims.iat == seven_days);
    assert!(claims.iat >= before);
}

#[test]
fn test_tokens_have_unique_ids() {
    let jwt_utils = create_test_jwt_utils();
    let user = TestUser::new_patient();

    let first = jwt_utils.generate_token(&user.id, &user.email, &user.role).unwrap();
    let second = jwt_utils.generate_token(&user.id, &user.email, &user.role).unwrap();

    let first_claims = jwt_utils.validate_token(&first).unwrap();
    let second_claims = jwt_utils.validate_token(&second).unwrap();
    assert_ne!(first_claims.jti, second_claims.jti);
}

#[test]
fn test_expired_token_rejected() {
    let config = JwtConfig {
        expiration_minutes: -5,
        ..JwtConfig::default()
    };
    let jwt_utils = JwtTokenUtilsImpl::new(config);
    let user = TestUser::new_patient();

    let token = jwt_utils.generate_token(&user.id, &user.email, &user.role).unwrap();
    assert!(matches!(jwt_utils.validate_token(&token), Err(JwtError::TokenExpired)));
}

#[test]
fn test_malformed_token_rejected() {
    let jwt_utils = create_test_jwt_utils();
    assert!(jwt_utils.validate_token("not.a.token").is_err());
    assert!(jwt_utils.validate_token("").is_err());
}

#[test]
fn test_token_signed_with_other_secret_rejected() {
    let other = JwtTokenUtilsImpl::new(JwtConfig {
        jwt_secret: "another_secret_key_that_is_also_long_enough_to_pass".to_string(),
        ..JwtConfig::default()
    });
    let user = TestUser::new_admin();
    let token = other.generate_token(&user.id, &user.email, &user.role).unwrap();

    assert!(create_test_jwt_utils().validate_token(&token).is_err());
}

#[test]
fn test_wrong_issuer_rejected() {
    let other = JwtTokenUtilsImpl::new(JwtConfig {
        jwt_issuer: Some("someone-else".to_string()),
        ..JwtConfig::default()
    });
    let user = TestUser::new_patient();
    let token = other.generate_token(&user.id, &user.email, &user.role).unwrap();

    assert!(create_test_jwt_utils().validate_token(&token).is_err());
}

#[test]
fn test_extract_token_from_header() {
    let jwt_utils = create_test_jwt_utils();

    assert_eq!(jwt_utils.extract_token_from_header("Bearer abc.def.ghi").unwrap(), "abc.def.ghi");
    assert!(matches!(
        jwt_utils.extract_token_from_header("Basic abc"),
        Err(JwtError::InvalidToken)
    ));
    assert!(matches!(
        jwt_utils.extract_token_from_header("Bearer   "),
        Err(JwtError::InvalidToken)
    ));
}
