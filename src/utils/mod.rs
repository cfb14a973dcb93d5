pub mod constants;
mod pacing;
mod timeout;
mod wait_for_element;

pub use pacing::{human_delay, sample_delay_ms};
pub use timeout::{validate_interaction_timeout, validate_navigation_timeout};
pub use wait_for_element::wait_for_element;
