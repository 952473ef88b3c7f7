use std::any::Any;
use std::fmt::{self, Display};

/// Trait for errors that may cross the provider boundary. This just sets up the
/// trait bounds that are required, since the lifecycle operations expose rather
/// opaque boxed error types, and they may need to be sent between threads.
pub trait KubesynthError: std::error::Error + Send + 'static + Any {
    fn as_any(&self) -> &dyn Any;
}
impl<T> KubesynthError for T
where
    T: std::error::Error + Send + 'static + Any,
{
    fn as_any(&self) -> &dyn Any {
        self
    }
}

pub type Error = Box<dyn KubesynthError>;

impl dyn KubesynthError {
    /// convenience function for downcasting the error to a concrete type
    pub fn as_type<T: KubesynthError>(&self) -> Option<&T> {
        let as_any = self.as_any();
        as_any.downcast_ref::<T>()
    }

    /// convenience function for checking whether the error is of the given concrete type.
    /// If `is_type::<MyType>()` returns true, then calling `as_type::<MyType>()` will return
    /// `Some`.
    pub fn is_type<T: KubesynthError>(&self) -> bool {
        let as_any = self.as_any();
        as_any.is::<T>()
    }
}

impl<T> From<T> for Error
where
    T: KubesynthError,
{
    fn from(e: T) -> Error {
        Box::new(e)
    }
}

/// Error returned when a lifecycle operation names a resource type that was
/// never registered with the provider
#[derive(Debug, PartialEq, Clone)]
pub struct UnknownResourceTypeError {
    pub type_name: String,
}

impl UnknownResourceTypeError {
    pub fn new(type_name: impl Into<String>) -> UnknownResourceTypeError {
        UnknownResourceTypeError {
            type_name: type_name.into(),
        }
    }
}

impl Display for UnknownResourceTypeError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "no resource type named '{}' is registered with this provider",
            self.type_name
        )
    }
}

impl std::error::Error for UnknownResourceTypeError {}
