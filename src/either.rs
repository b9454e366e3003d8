//! A two-branch value, used as a conversion target for a future's outcome.

use self::Either::*;

/// Either a `Left` or a `Right` value.
///
/// By convention a future converts its failure into `Left` and its value
/// into `Right`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Either<L, R> {
    Left(L),
    Right(R),
}

impl<L, R> Either<L, R> {
    pub fn is_left(&self) -> bool {
        matches!(*self, Left(..))
    }

    pub fn is_right(&self) -> bool {
        matches!(*self, Right(..))
    }

    /// Returns the left value, if present.
    pub fn left(self) -> Option<L> {
        match self {
            Left(l) => Some(l),
            Right(_) => None,
        }
    }

    /// Returns the right value, if present.
    pub fn right(self) -> Option<R> {
        match self {
            Left(_) => None,
            Right(r) => Some(r),
        }
    }

    pub fn left_or(self, fallback: L) -> L {
        self.left().unwrap_or(fallback)
    }

    pub fn right_or(self, fallback: R) -> R {
        self.right().unwrap_or(fallback)
    }

    pub fn swap(self) -> Either<R, L> {
        match self {
            Left(l) => Right(l),
            Right(r) => Left(r),
        }
    }

    /// Maps the right value, leaving a left value untouched.
    pub fn map<S, F>(self, f: F) -> Either<L, S>
        where F: FnOnce(R) -> S
    {
        match self {
            Left(l) => Left(l),
            Right(r) => Right(f(r)),
        }
    }
}

impl<E, T> From<Result<T, E>> for Either<E, T> {
    fn from(res: Result<T, E>) -> Either<E, T> {
        match res {
            Ok(v) => Right(v),
            Err(e) => Left(e),
        }
    }
}

impl<E, T> From<Either<E, T>> for Result<T, E> {
    fn from(either: Either<E, T>) -> Result<T, E> {
        match either {
            Left(e) => Err(e),
            Right(v) => Ok(v),
        }
    }
}
