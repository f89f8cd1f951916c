//! Data access for the business-card directory.
//!
//! [`Datastore`] is the seam: the web server, the registration flow and the
//! purge job all hold a [`SharedDatastore`] built by [`connect`]. Two
//! implementations exist, [`RestDatastore`] for the hosted PostgREST backend
//! and [`EmbeddedDatastore`] for a local libmdbx environment.

pub mod basic_db;
pub mod connection;
pub mod error;
pub mod model;
pub mod rest;
pub mod store;

pub use basic_db::EmbeddedDatastore;
pub use connection::connect;
pub use error::DatastoreError;
pub use model::{
    NewProfile, ProfileRecord, Skill, SkillAttachment, UserSkill, PROFILE_SELECT, SKILLS_TABLE,
    USERS_TABLE, USER_SKILL_TABLE,
};
pub use rest::RestDatastore;
pub use store::{Datastore, SharedDatastore};
