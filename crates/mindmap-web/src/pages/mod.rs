//! Page Components

mod dashboard;
mod home;
mod login;
mod pricing;

pub use dashboard::DashboardPage;
pub use home::HomePage;
pub use login::LoginPage;
pub use pricing::PricingPage;
