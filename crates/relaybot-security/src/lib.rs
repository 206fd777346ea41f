pub mod credentials;
pub mod redaction;

pub use credentials::{CircularRotation, Credential, CredentialError, CredentialPool, RotationPolicy};
pub use redaction::{RedactingWriter, redact_secrets};
