use secrecy::{ExposeSecret, SecretString};
use std::fmt;
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

/// A single API key together with its position in the pool.
///
/// The secret is only reachable through [`Credential::expose`]; `Debug`
/// prints the slot and never the key.
#[derive(Clone)]
pub struct Credential {
    slot: usize,
    secret: Arc<SecretString>,
}

impl Credential {
    fn new(slot: usize, secret: String) -> Self {
        Self {
            slot,
            secret: Arc::new(SecretString::from(secret)),
        }
    }

    /// Zero-based position of this credential in its pool.
    pub fn slot(&self) -> usize {
        self.slot
    }

    /// Raw key, for building the `Authorization` header.
    pub fn expose(&self) -> &str {
        self.secret.expose_secret()
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("slot", &self.slot)
            .field("secret", &"[REDACTED]")
            .finish()
    }
}

impl fmt::Display for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "key #{}", self.slot + 1)
    }
}

/// Chooses the slot that becomes active after a rotation.
pub trait RotationPolicy: Send + Sync {
    fn name(&self) -> &str;

    /// Next active slot given the current one. Result is taken modulo `len`.
    fn next_slot(&self, current: usize, len: usize) -> usize;
}

/// Walks the pool in order and wraps around after the last key.
#[derive(Debug, Clone, Copy, Default)]
pub struct CircularRotation;

impl RotationPolicy for CircularRotation {
    fn name(&self) -> &str {
        "circular"
    }

    fn next_slot(&self, current: usize, len: usize) -> usize {
        (current + 1) % len
    }
}

/// Ordered set of interchangeable API keys with one active key.
///
/// The active slot is guarded by a mutex so that each [`rotate`] call is a
/// single read-modify-write: concurrent rotations each advance exactly once.
///
/// [`rotate`]: CredentialPool::rotate
pub struct CredentialPool {
    credentials: Vec<Credential>,
    current: Mutex<usize>,
    policy: Box<dyn RotationPolicy>,
}

impl CredentialPool {
    /// Build a pool with circular rotation starting at the first key.
    pub fn new<I, S>(keys: I) -> Result<Self, CredentialError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::with_policy(keys, Box::new(CircularRotation))
    }

    pub fn with_policy<I, S>(
        keys: I,
        policy: Box<dyn RotationPolicy>,
    ) -> Result<Self, CredentialError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut credentials = Vec::new();
        for (slot, key) in keys.into_iter().enumerate() {
            let key = key.into();
            if key.trim().is_empty() {
                return Err(CredentialError::Blank(slot + 1));
            }
            credentials.push(Credential::new(slot, key));
        }

        if credentials.is_empty() {
            return Err(CredentialError::EmptyPool);
        }

        info!(
            "credential pool ready: {} keys, {} rotation",
            credentials.len(),
            policy.name()
        );

        Ok(Self {
            credentials,
            current: Mutex::new(0),
            policy,
        })
    }

    /// The active credential.
    pub fn current(&self) -> Credential {
        let slot = *self.current.lock().unwrap_or_else(|e| e.into_inner());
        self.credentials[slot].clone()
    }

    /// Zero-based slot of the active credential.
    pub fn current_slot(&self) -> usize {
        *self.current.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Advance to the next credential and return it.
    pub fn rotate(&self) -> Credential {
        let mut current = self.current.lock().unwrap_or_else(|e| e.into_inner());
        let len = self.credentials.len();
        *current = self.policy.next_slot(*current, len) % len;
        debug!("rotated to API key #{}", *current + 1);
        self.credentials[*current].clone()
    }

    /// Credential at `slot`, without changing the active one.
    pub fn get(&self, slot: usize) -> Option<Credential> {
        self.credentials.get(slot).cloned()
    }

    pub fn size(&self) -> usize {
        self.credentials.len()
    }
}

impl fmt::Debug for CredentialPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialPool")
            .field("size", &self.size())
            .field("current", &self.current_slot())
            .field("policy", &self.policy.name())
            .finish()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    #[error("no API keys configured")]
    EmptyPool,

    #[error("API key #{0} is blank")]
    Blank(usize),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool(keys: &[&str]) -> CredentialPool {
        CredentialPool::new(keys.iter().copied()).expect("pool should build")
    }

    #[test]
    fn starts_at_first_key() {
        let pool = pool(&["k1", "k2", "k3"]);
        assert_eq!(pool.size(), 3);
        assert_eq!(pool.current_slot(), 0);
        assert_eq!(pool.current().expose(), "k1");
    }

    #[test]
    fn rotation_wraps_around() {
        let pool = pool(&["k1", "k2", "k3"]);
        assert_eq!(pool.rotate().expose(), "k2");
        assert_eq!(pool.rotate().expose(), "k3");
        assert_eq!(pool.rotate().expose(), "k1");
        assert_eq!(pool.current_slot(), 0);
    }

    #[test]
    fn n_rotations_return_to_start_for_any_size() {
        for n in 1..=6 {
            let keys: Vec<String> = (0..n).map(|i| format!("key-{i}")).collect();
            let pool = CredentialPool::new(keys).unwrap();
            pool.rotate();
            let start = pool.current().expose().to_string();
            for _ in 0..n {
                pool.rotate();
            }
            assert_eq!(pool.current().expose(), start, "pool of size {n}");
        }
    }

    #[test]
    fn single_key_pool_rotates_onto_itself() {
        let pool = pool(&["only"]);
        assert_eq!(pool.rotate().expose(), "only");
        assert_eq!(pool.current_slot(), 0);
    }

    #[test]
    fn empty_pool_is_rejected() {
        let err = CredentialPool::new(Vec::<String>::new()).unwrap_err();
        assert!(matches!(err, CredentialError::EmptyPool));
    }

    #[test]
    fn blank_key_is_rejected() {
        let err = CredentialPool::new(["k1", "  "]).unwrap_err();
        assert!(matches!(err, CredentialError::Blank(2)));
    }

    #[test]
    fn concurrent_rotations_each_advance_once() {
        let pool = pool(&["a", "b", "c", "d", "e"]);
        let threads = 8;
        let per_thread = 37;

        std::thread::scope(|scope| {
            for _ in 0..threads {
                scope.spawn(|| {
                    for _ in 0..per_thread {
                        pool.rotate();
                    }
                });
            }
        });

        assert_eq!(pool.current_slot(), (threads * per_thread) % pool.size());
    }

    #[test]
    fn debug_output_hides_secret() {
        let pool = pool(&["sk-or-v1-supersecret"]);
        let rendered = format!("{:?} {:?}", pool.current(), pool);
        assert!(!rendered.contains("supersecret"));
        assert!(rendered.contains("[REDACTED]"));
        assert_eq!(pool.current().to_string(), "key #1");
    }

    #[test]
    fn custom_policy_is_used() {
        struct StayPut;
        impl RotationPolicy for StayPut {
            fn name(&self) -> &str {
                "stay"
            }
            fn next_slot(&self, current: usize, _len: usize) -> usize {
                current
            }
        }

        let pool = CredentialPool::with_policy(["k1", "k2"], Box::new(StayPut)).unwrap();
        assert_eq!(pool.rotate().expose(), "k1");
    }

    #[test]
    fn get_does_not_change_active_slot() {
        let pool = pool(&["k1", "k2"]);
        assert_eq!(pool.get(1).unwrap().expose(), "k2");
        assert!(pool.get(2).is_none());
        assert_eq!(pool.current_slot(), 0);
    }
}
