pub mod driver;
pub mod pipeline;
pub mod publisher;

pub use driver::ListingDriver;
pub use publisher::ListingPublisher;
