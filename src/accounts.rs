pub mod passwords;
pub mod subscriptions;
pub mod tokens;
pub mod users;

pub use passwords::PasswordHasher;
pub use users::UserView;
