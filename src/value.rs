use std::any::{type_name, Any};
use std::fmt;

use crate::{PoolError, Result};

/// A container for a value of any `Send` type, produced by a task.
///
/// The value is stored behind `Box<dyn Any>` and extracted with a checked
/// downcast, so a mismatched extraction fails with an error instead of
/// reinterpreting memory. An empty `TaskValue` holds nothing; it is what
/// rejected or never-completed submissions yield.
pub struct TaskValue {
    value: Option<Box<dyn Any + Send>>,
    stored_type: &'static str,
}

impl TaskValue {
    /// Wraps a concrete value.
    pub fn new<T: Any + Send>(value: T) -> Self {
        TaskValue {
            value: Some(Box::new(value)),
            stored_type: type_name::<T>(),
        }
    }

    /// A value holding nothing.
    pub fn empty() -> Self {
        TaskValue {
            value: None,
            stored_type: "",
        }
    }

    /// Returns true if this value holds nothing.
    pub fn is_empty(&self) -> bool {
        self.value.is_none()
    }

    /// Extracts the stored value as `T`, consuming the container.
    ///
    /// # Errors
    ///
    /// `PoolError::Empty` if nothing is stored, `PoolError::TypeMismatch`
    /// if the stored value is not a `T`.
    pub fn downcast<T: Any>(self) -> Result<T> {
        let TaskValue { value, stored_type } = self;
        match value {
            None => Err(PoolError::Empty),
            Some(boxed) => boxed
                .downcast::<T>()
                .map(|value| *value)
                .map_err(|_| PoolError::TypeMismatch {
                    expected: type_name::<T>(),
                    actual: stored_type,
                }),
        }
    }
}

impl fmt::Debug for TaskValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.value {
            Some(_) => write!(f, "TaskValue({})", self.stored_type),
            None => write!(f, "TaskValue(empty)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stores_and_returns_the_value_unchanged() {
        let value = TaskValue::new(0xdead_beef_cafe_f00d_u64);
        assert!(!value.is_empty());
        assert_eq!(value.downcast::<u64>().unwrap(), 0xdead_beef_cafe_f00d);
    }

    #[test]
    fn wrong_type_fails_loudly() {
        let value = TaskValue::new(42i32);
        match value.downcast::<u32>() {
            Err(PoolError::TypeMismatch { expected, actual }) => {
                assert_eq!(expected, "u32");
                assert_eq!(actual, "i32");
            }
            other => panic!("expected a type mismatch, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn empty_value_reports_empty() {
        let value = TaskValue::empty();
        assert!(value.is_empty());
        assert!(matches!(value.downcast::<String>(), Err(PoolError::Empty)));
    }

    #[test]
    fn owned_types_move_through() {
        let value = TaskValue::new(vec![String::from("a"), String::from("b")]);
        let strings = value.downcast::<Vec<String>>().unwrap();
        assert_eq!(strings, ["a", "b"]);
    }
}
