mod json;
mod user;
mod valid;

pub use json::Json;
pub use user::CurrentUser;
pub use valid::Valid;
