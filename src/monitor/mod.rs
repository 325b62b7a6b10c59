pub mod controller;
mod live;

pub use controller::RumMonitor;
pub use live::LiveSession;
