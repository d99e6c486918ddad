pub mod context;
pub mod store;
pub mod validation;

pub use context::{Session, User};
pub use store::{SessionError, SessionStore};
pub use validation::{Credentials, FieldError, SignupForm, ValidationErrors};
