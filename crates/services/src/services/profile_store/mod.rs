//! Profile Store Service
//!
//! Loads, lists, validates, creates and resolves profiles kept as directories
//! under a root directory:
//!
//! ```text
//! <root>/<profile-name>/
//!     profile.yaml        # required configuration
//!     requirements.txt
//!     workflows/
//!     *.yaml              # syntax-checked by validation
//! ```
//!
//! Profiles compose through `extends`; resolution flattens the inheritance
//! graph into a set of profile names and tolerates cycles.

mod error;
mod store;
mod types;

pub use error::{ProfileError, ProfileErrorKind};
pub use store::{PROFILE_CONFIG_FILE, ProfileStore, REQUIREMENTS_FILE, WORKFLOWS_DIR, check_name};
pub use types::*;
