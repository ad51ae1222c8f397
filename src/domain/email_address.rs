use validator::ValidateEmail;

/// A syntactically valid email address, used for the configured sender and
/// for recipients at send time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailAddress(String);

impl EmailAddress {
    pub fn parse(email: String) -> Result<Self, String> {
        let email = email.trim().to_string();
        match ValidateEmail::validate_email(&email) {
            true => Ok(Self(email)),
            false => Err(format!("Invalid email: {email:?}")),
        }
    }
}

impl AsRef<str> for EmailAddress {
    fn as_ref(&self) -> &str { &self.0 }
}

impl std::fmt::Display for EmailAddress {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Address typed into the "send a test" box. Deliberately looser than
/// `EmailAddress`: it only has to contain an `@` and a `.`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestEmail(String);

impl TestEmail {
    pub fn parse(email: &str) -> Result<Self, String> {
        let email = email.trim();
        match email.contains('@') && email.contains('.') {
            true => Ok(Self(email.to_string())),
            false => Err("A valid test email address is required".to_string()),
        }
    }
}

impl AsRef<str> for TestEmail {
    fn as_ref(&self) -> &str { &self.0 }
}
