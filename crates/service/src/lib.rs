pub mod error;
pub mod form;
pub mod links;
pub mod lookup;
pub mod notice;
pub mod purge;
pub mod query;
pub mod registration;

#[cfg(test)]
mod testing;

pub use error::{PurgeError, QueryError, RegistrationError, ValidationError};
pub use form::{validate_field, Field, FieldErrors, RegistrationForm, ValidRegistration};
pub use links::{create_profile_link, Network, PLACEHOLDER_LINK};
pub use lookup::{Card, CardView, ProfileQueries, SocialLink};
pub use notice::{Notice, NoticeLevel};
pub use purge::{previous_day, PurgeJob, PurgeReport};
pub use query::{QueryCache, QueryKey, QueryOptions, QueryState};
pub use registration::{RegistrationPage, RegistrationPhase, RegistrationService};
