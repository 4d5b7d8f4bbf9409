//! Prefixed, order-stable aggregate of validation messages.

use std::fmt;

/// Ordered list of error messages sharing a prefix.
///
/// Messages keep insertion order so callers can compare whole lists. Merging a
/// child flattens it: each child message is folded in as
/// `"<child prefix>: <message>"`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MultiError {
    prefix: String,
    errors: Vec<String>,
}

impl MultiError {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            errors: Vec::new(),
        }
    }

    pub fn push(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
    }

    /// Pushes the rendering of any displayable error.
    pub fn push_err(&mut self, err: impl fmt::Display) {
        self.errors.push(err.to_string());
    }

    pub fn merge(&mut self, child: MultiError) {
        let MultiError { prefix, errors } = child;
        if prefix.is_empty() {
            self.errors.extend(errors);
        } else {
            self.errors
                .extend(errors.into_iter().map(|e| format!("{}: {}", prefix, e)));
        }
    }

    /// Merges the error side of a child validation result.
    pub fn merge_result(&mut self, result: Result<(), MultiError>) {
        if let Err(child) = result {
            self.merge(child);
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// `Ok(())` when nothing was collected.
    pub fn into_result(self) -> Result<(), MultiError> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for MultiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.prefix.is_empty() {
            write!(f, "{}: ", self.prefix)?;
        }
        match self.errors.as_slice() {
            [] => write!(f, "no errors"),
            [only] => write!(f, "{}", only),
            many => {
                write!(f, "{} errors occurred:", many.len())?;
                for e in many {
                    write!(f, "\n\t* {}", e)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for MultiError {}
