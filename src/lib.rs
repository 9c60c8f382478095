//! Schedule, presenter and sponsor data for the conference companion app,
//! normalized from the CMS's WordPress REST + ACF content.

pub mod config;
pub mod events;
pub mod fallback;
pub mod presenters;
pub mod relationship;
pub mod schedule;
pub mod sections;
pub mod sponsors;
pub mod state;
pub mod text;
pub mod wp;
