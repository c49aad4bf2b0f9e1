pub mod user;
pub mod web_app;

pub use user::UserRepository;
pub use web_app::WebAppRepository;
