//! Constants used throughout the Saúde core crate.
//!
//! Collection names, stored field names and file names live here so the services, adapters and
//! tests agree on them.

/// Default directory for the filesystem document store when none is configured.
pub const DEFAULT_DATA_DIR: &str = "saude_data";

/// Filename of a stored document inside its sharded directory.
pub const DOCUMENT_FILE_NAME: &str = "document.json";

/// Suffix used while a document is being written, before the atomic rename.
pub const DOCUMENT_TMP_SUFFIX: &str = "tmp";

/// Minimum password length accepted by the auth provider.
pub const MIN_PASSWORD_LEN: usize = 6;

/// Hours a session token stays valid after sign-in.
pub const SESSION_TTL_HOURS: i64 = 12;

/// Maximum length of a recommendation text.
pub const MAX_RECOMMENDATION_LEN: usize = 4_000;

/// Field holding the document identifier once a document is decoded.
pub const ID_FIELD: &str = "id";

/// Profile field holding the account role.
pub const ROLE_FIELD: &str = "role";

/// Patient profile field holding the sharing code.
pub const SHARING_CODE_FIELD: &str = "sharing_code";

/// Doctor profile field holding the linked patient identifiers.
pub const LINKED_PATIENTS_FIELD: &str = "linked_patient_ids";

/// Field referencing the owning patient on vitals and recommendations.
pub const PATIENT_ID_FIELD: &str = "patient_id";

/// Vital record timestamp field (epoch milliseconds).
pub const RECORDED_AT_FIELD: &str = "recorded_at";

/// Recommendation timestamp field (epoch milliseconds).
pub const SENT_AT_FIELD: &str = "sent_at";

/// Credential field holding the normalised email address.
pub const EMAIL_FIELD: &str = "email";

/// Session field referencing the authenticated account.
pub const ACCOUNT_ID_FIELD: &str = "account_id";
