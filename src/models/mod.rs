// Models module - Database entity representations

pub mod admin;
pub mod analytics;
pub mod booking;
pub mod catering_service;
pub mod course;
pub mod email_verification;
pub mod equipment;
pub mod event;
pub mod hero_section;
pub mod marketplace_item;
pub mod media;
pub mod pagination;
pub mod plan;
pub mod user;
pub mod withdrawal;

pub use admin::Admin;
pub use booking::Booking;
pub use course::Course;
pub use event::Event;
pub use media::Media;
pub use pagination::Page;
pub use user::User;
pub use withdrawal::Withdrawal;
