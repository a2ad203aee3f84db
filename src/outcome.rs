//! Fallible result carrier
//!
//! A value that is either a result or an error, with value semantics on
//! both sides. Unlike `Result`, the default state is the error side (an
//! operation that never ran has not succeeded), and the error slot can be
//! inspected without consuming the value even on success.

/// Either a result `R` or an error `E`
///
/// Copying and moving preserve the discriminant and the held value. When
/// `R` and `E` are the same or mutually convertible, the named constructors
/// keep the intended state unambiguous; prefer distinct types for the two
/// sides.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome<R, E> {
    /// The operation produced a result.
    Success(R),
    /// The operation failed with an error.
    Failure(E),
}

impl<R, E> Outcome<R, E> {
    /// Wraps a result.
    pub fn from_result(result: R) -> Self {
        Self::Success(result)
    }

    /// Wraps an error.
    pub fn from_error(error: E) -> Self {
        Self::Failure(error)
    }

    /// Checks whether this outcome holds an error.
    pub fn has_error(&self) -> bool {
        matches!(self, Self::Failure(_))
    }

    /// Borrows the result.
    ///
    /// # Panics
    /// Panics when the outcome holds an error.
    pub fn result(&self) -> &R {
        match self {
            Self::Success(result) => result,
            Self::Failure(_) => panic!("result requested from a failed outcome"),
        }
    }

    /// Consumes the outcome and returns the result.
    ///
    /// # Panics
    /// Panics when the outcome holds an error.
    pub fn into_result(self) -> R {
        match self {
            Self::Success(result) => result,
            Self::Failure(_) => panic!("result requested from a failed outcome"),
        }
    }

    /// Returns the held error, or `E::default()` when this is a success.
    ///
    /// Observers can always inspect the error slot; a success simply has
    /// nothing in it.
    pub fn error(&self) -> E
    where
        E: Clone + Default,
    {
        match self {
            Self::Success(_) => E::default(),
            Self::Failure(error) => error.clone(),
        }
    }
}

impl<R, E: Default> Default for Outcome<R, E> {
    /// An outcome that never received a result: the error state.
    fn default() -> Self {
        Self::Failure(E::default())
    }
}
