pub mod app_settings;
pub mod app_state;
pub mod bookings;
pub mod chat;
pub mod collection;
pub mod events;
pub mod filters;
pub mod geo;
pub mod local_store;
pub mod location;
pub mod matches;
pub mod messages;
pub mod network;
pub mod refresher;
pub mod remote;
pub mod stadiums;
