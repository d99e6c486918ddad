use serde::Serialize;
use std::fmt;
use thiserror::Error;

pub const MIN_PASSWORD_CHARS: usize = 6;
pub const MIN_NAME_CHARS: usize = 2;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Every field that failed, in form order.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{}", join_errors(.0))]
pub struct ValidationErrors(pub Vec<FieldError>);

impl ValidationErrors {
    pub fn for_field(&self, field: &str) -> Option<&FieldError> {
        self.0.iter().find(|e| e.field == field)
    }
}

fn join_errors(errors: &[FieldError]) -> String {
    errors.iter().map(ToString::to_string).collect::<Vec<_>>().join("; ")
}

#[derive(Debug, Clone, Serialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SignupForm {
    pub name: String,
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn new(email: &str, password: &str) -> Self {
        Self {
            email: email.trim().to_string(),
            password: password.to_string(),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = Vec::new();
        check_email(&self.email, &mut errors);
        check_password(&self.password, &mut errors);
        finish(errors)
    }
}

impl SignupForm {
    pub fn new(name: &str, email: &str, password: &str) -> Self {
        Self {
            name: name.trim().to_string(),
            email: email.trim().to_string(),
            password: password.to_string(),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = Vec::new();
        if self.name.chars().count() < MIN_NAME_CHARS {
            errors.push(FieldError {
                field: "name",
                message: format!("Name must be at least {} characters", MIN_NAME_CHARS),
            });
        }
        check_email(&self.email, &mut errors);
        check_password(&self.password, &mut errors);
        finish(errors)
    }
}

/// Validate a domain submitted for scanning.
pub fn validate_domain(domain: &str) -> Result<(), ValidationErrors> {
    let domain = domain.trim();
    let mut errors = Vec::new();
    if domain.is_empty() {
        errors.push(FieldError {
            field: "domain",
            message: "Please enter a domain to scan".to_string(),
        });
    } else if domain.chars().any(char::is_whitespace) {
        errors.push(FieldError {
            field: "domain",
            message: "Domain must not contain spaces".to_string(),
        });
    }
    finish(errors)
}

/// `local@domain.tld` shape: one `@`, no whitespace, a dot inside the
/// domain part that is neither its first nor last character.
pub fn is_valid_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    match domain.rfind('.') {
        Some(dot) => dot > 0 && dot < domain.len() - 1 && !domain.starts_with('.'),
        None => false,
    }
}

fn check_email(email: &str, errors: &mut Vec<FieldError>) {
    if !is_valid_email(email) {
        errors.push(FieldError {
            field: "email",
            message: "Please enter a valid email address".to_string(),
        });
    }
}

fn check_password(password: &str, errors: &mut Vec<FieldError>) {
    if password.chars().count() < MIN_PASSWORD_CHARS {
        errors.push(FieldError {
            field: "password",
            message: format!("Password must be at least {} characters", MIN_PASSWORD_CHARS),
        });
    }
}

fn finish(errors: Vec<FieldError>) -> Result<(), ValidationErrors> {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(ValidationErrors(errors))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_email_shapes() {
        assert!(is_valid_email("analyst@example.com"));
        assert!(is_valid_email("a.b+tag@sub.example.org"));
        assert!(!is_valid_email("analyst"));
        assert!(!is_valid_email("@example.com"));
        assert!(!is_valid_email("analyst@example"));
        assert!(!is_valid_email("analyst@.com"));
        assert!(!is_valid_email("analyst@example."));
        assert!(!is_valid_email("an alyst@example.com"));
        assert!(!is_valid_email("a@b@example.com"));
    }

    #[test]
    fn test_login_reports_each_field() {
        let errors = Credentials::new("nope", "123").validate().unwrap_err();
        assert_eq!(errors.0.len(), 2);
        assert_eq!(
            errors.for_field("email").unwrap().message,
            "Please enter a valid email address"
        );
        assert_eq!(
            errors.for_field("password").unwrap().message,
            "Password must be at least 6 characters"
        );
        assert!(Credentials::new(" analyst@example.com ", "hunter22").validate().is_ok());
    }

    #[test]
    fn test_signup_name_length() {
        let errors = SignupForm::new("A", "analyst@example.com", "hunter22")
            .validate()
            .unwrap_err();
        assert_eq!(errors.0.len(), 1);
        assert_eq!(errors.to_string(), "name: Name must be at least 2 characters");
        assert!(SignupForm::new("Al", "analyst@example.com", "hunter22").validate().is_ok());
    }

    #[test]
    fn test_domain_validation() {
        assert!(validate_domain("example.com").is_ok());
        assert!(validate_domain("   ").is_err());
        assert!(validate_domain("exa mple.com").is_err());
    }
}
