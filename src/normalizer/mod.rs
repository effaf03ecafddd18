pub mod handler;

pub use handler::{
    Collaborators, EventNormalizer, NAV_END_TIMEOUT_ACTION, STREET_RESET_ACTION, VENDOR_SOURCE,
};
