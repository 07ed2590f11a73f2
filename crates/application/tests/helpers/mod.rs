pub mod fake_subscription;
pub mod mock_ports;

#[allow(unused_imports)]
pub use fake_subscription::FakeSubscription;
#[allow(unused_imports)]
pub use mock_ports::*;
