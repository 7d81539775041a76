//! Author identity attached to report snapshots.

use crate::error::{LedgerError, LedgerResult};
use careledger_types::NonEmptyText;

/// The clinician or admin performing a report edit.
///
/// Snapshots record the author's display name as `createdBy`; the email is
/// carried for the surrounding application's audit views.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Author {
    name: NonEmptyText,
    email: String,
}

impl Author {
    /// Create an author with a non-empty name and a plausible email.
    pub fn new(name: impl AsRef<str>, email: impl Into<String>) -> LedgerResult<Self> {
        let name = NonEmptyText::new(name)
            .map_err(|_| LedgerError::InvalidInput("author name cannot be empty".into()))?;
        let email = email.into();
        if !email.contains('@') {
            return Err(LedgerError::InvalidInput(
                "author email must contain '@'".into(),
            ));
        }
        Ok(Self { name, email })
    }

    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    pub fn email(&self) -> &str {
        &self.email
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn author_requires_name_and_email_shape() {
        let author = Author::new("Dr Han", "han@clinic.example").expect("author should be valid");
        assert_eq!(author.name(), "Dr Han");
        assert_eq!(author.email(), "han@clinic.example");

        assert!(Author::new(" ", "han@clinic.example").is_err());
        assert!(Author::new("Dr Han", "not-an-email").is_err());
    }
}
