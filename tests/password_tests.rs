use healthcare_plus_backend::util::password::*;
use std::collections::HashSet;

#[test]
fn test_hash_password_success() {
    let hash = PasswordUtilsImpl::hash_password("Secret1!").unwrap();
    assert!(hash.starts_with("$argon2"));
    assert_ne!(hash, "Secret1!");
}

#[test]
fn test_hash_password_different_results() {
    let hashes: HashSet<String> = (0..3)
        .map(|_| PasswordUtilsImpl::hash_password("SamePassword1!").unwrap())
        .collect();
    // fresh salt per hash
    assert_eq!(hashes.len(), 3);
}

#[test]
fn test_verify_password_correct() {
    let hash = PasswordUtilsImpl::hash_password("Secret1!").unwrap();
    assert!(PasswordUtilsImpl::verify_password("Secret1!", &hash).unwrap());
}

#[test]
fn test_verify_password_incorrect() {
    let hash = PasswordUtilsImpl::hash_password("Secret1!").unwrap();
    assert!(!PasswordUtilsImpl::verify_password("secret1!", &hash).unwrap());
    assert!(!PasswordUtilsImpl::verify_password("", &hash).unwrap());
}

#[test]
fn test_verify_password_unicode() {
    let hash = PasswordUtilsImpl::hash_password("Pässwörd1!").unwrap();
    assert!(PasswordUtilsImpl::verify_password("Pässwörd1!", &hash).unwrap());
}

#[test]
fn test_verify_password_invalid_hash_format() {
    let result = PasswordUtilsImpl::verify_password("Secret1!", "not-a-hash");
    assert!(matches!(result, Err(PasswordError::InvalidHashFormat)));

    let result = PasswordUtilsImpl::verify_password("Secret1!", "");
    assert!(matches!(result, Err(PasswordError::InvalidHashFormat)));
}

#[test]
fn test_validate_password_strength_valid_password() {
    assert!(PasswordUtilsImpl::validate_password_strength("Abc12!").is_ok());
    assert!(PasswordUtilsImpl::validate_password_strength("Longer Passw0rd").is_ok());
}

#[test]
fn test_validate_password_strength_too_short() {
    let errors = PasswordUtilsImpl::validate_password_strength("Ab1!").unwrap_err();
    assert_eq!(errors, vec![format!("Password must be at least {} characters long", MIN_PASSWORD_LENGTH)]);
}

#[test]
fn test_validate_password_strength_specific_errors() {
    let cases = [
        ("abcdef1!", "uppercase"),
        ("ABCDEF1!", "lowercase"),
        ("Abcdefg!", "number"),
        ("Abcdefg1", "special"),
    ];
    for (password, missing) in cases {
        let errors = PasswordUtilsImpl::validate_password_strength(password).unwrap_err();
        assert_eq!(errors.len(), 1, "{password}: {errors:?}");
        assert!(errors[0].contains(missing), "{password}: {errors:?}");
    }
}

#[test]
fn test_validate_password_strength_reports_every_problem() {
    let errors = PasswordUtilsImpl::validate_password_strength("").unwrap_err();
    assert_eq!(errors.len(), 5);
}
