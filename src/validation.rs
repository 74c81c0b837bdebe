// Request validation helpers shared by the API handlers

use crate::error::{AppError, FieldError};

/// Collects field errors and turns them into a single `AppError::Validation`.
#[derive(Debug, Default)]
pub struct Validator {
    errors: Vec<FieldError>,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &str, message: &str) -> &mut Self {
        self.errors.push(FieldError::new(field, message));
        self
    }

    pub fn required(&mut self, field: &str, value: &str) -> &mut Self {
        if value.trim().is_empty() {
            self.add(field, "is required");
        }
        self
    }

    /// Like `required`, but only checked when the value is present (partial updates).
    pub fn not_blank(&mut self, field: &str, value: Option<&str>) -> &mut Self {
        if let Some(v) = value {
            if v.trim().is_empty() {
                self.add(field, "must not be empty");
            }
        }
        self
    }

    pub fn max_len(&mut self, field: &str, value: &str, max: usize) -> &mut Self {
        if value.chars().count() > max {
            self.add(field, &format!("must be at most {} characters", max));
        }
        self
    }

    pub fn email(&mut self, field: &str, value: &str) -> &mut Self {
        if !is_valid_email(value) {
            self.add(field, "must be a valid email address");
        }
        self
    }

    pub fn min_len(&mut self, field: &str, value: &str, min: usize) -> &mut Self {
        if value.chars().count() < min {
            self.add(field, &format!("must be at least {} characters", min));
        }
        self
    }

    pub fn non_negative(&mut self, field: &str, value: i64) -> &mut Self {
        if value < 0 {
            self.add(field, "must not be negative");
        }
        self
    }

    pub fn positive(&mut self, field: &str, value: i64) -> &mut Self {
        if value <= 0 {
            self.add(field, "must be greater than zero");
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn finish(self) -> Result<(), AppError> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(AppError::Validation(self.errors))
        }
    }
}

/// Trims and lowercases an email address.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn is_valid_email(email: &str) -> bool {
    let email = email.trim();
    if email.len() > 254 || email.contains(char::is_whitespace) {
        return false;
    }
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
        }
        None => false,
    }
}

/// Turns a title into a URL slug: lowercase ascii alphanumerics joined by dashes.
pub fn slugify(input: &str) -> String {
    let mut slug = String::with_capacity(input.len());
    let mut pending_dash = false;

    for c in input.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            slug.push(c.to_ascii_lowercase());
            pending_dash = false;
        } else {
            pending_dash = true;
        }
    }

    slug
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collects_all_errors() {
        let mut v = Validator::new();
        v.required("title", "  ")
            .email("email", "not-an-email")
            .non_negative("price", -5);

        match v.finish() {
            Err(AppError::Validation(fields)) => {
                let names: Vec<_> = fields.iter().map(|f| f.field.as_str()).collect();
                assert_eq!(names, vec!["title", "email", "price"]);
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_valid_input_passes() {
        let mut v = Validator::new();
        v.required("title", "Portrait basics")
            .email("email", "jane@example.com")
            .positive("amount", 1);
        assert!(v.finish().is_ok());
    }

    #[test]
    fn test_email_rules() {
        assert!(is_valid_email("a@b.co"));
        assert!(!is_valid_email("a@b"));
        assert!(!is_valid_email("@b.com"));
        assert!(!is_valid_email("a b@c.com"));
        assert!(!is_valid_email("a@@b.com"));
    }

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email("  Jane@Example.COM "), "jane@example.com");
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Wedding Photography 101!"), "wedding-photography-101");
        assert_eq!(slugify("  --Lighting & Color--  "), "lighting-color");
        assert_eq!(slugify(""), "");
    }
}
