pub mod fake_platform;
pub mod logging;

pub use fake_platform::{FakePlatformServer, PlatformState};
pub use logging::init_test_logging;
