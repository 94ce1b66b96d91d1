use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use turnloop_core::tool::Error as ToolError;

/// The topics offered when no catalog is given.
pub const DEFAULT_TOPICS: &[&str] = &[
    "Rust in Production",
    "Async Programming with Tokio",
    "Cloud Native Architecture",
    "Testing Strategies",
    "Machine Learning Operations",
];

/// An error reported by the [`RegistrationDesk`].
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum DeskError {
    /// The attendee name is blank.
    #[error("the attendee name must not be empty")]
    MissingAttendee,
    /// The topic is not in the catalog.
    #[error("`{0}` is not offered at this seminar")]
    UnknownTopic(String),
    /// A cancellation for a registration that doesn't exist.
    #[error("{attendee} is not registered for {topic}")]
    NotRegistered {
        /// The attendee.
        attendee: String,
        /// The catalog name of the topic.
        topic: String,
    },
}

impl From<DeskError> for ToolError {
    fn from(err: DeskError) -> Self {
        ToolError::execution_error().with_reason(err.to_string())
    }
}

/// The outcome of [`RegistrationDesk::register`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Registration {
    /// A new registration for the topic, by its catalog name.
    Added(String),
    /// The attendee was registered for the topic before.
    AlreadyRegistered(String),
}

#[derive(Debug)]
struct Inner {
    topics: Vec<String>,
    // Attendee name to topics, in registration order.
    registrations: BTreeMap<String, Vec<String>>,
}

/// The shared state of the seminar: a fixed topic catalog and the
/// registrations per attendee.
///
/// Clones share the same state. Topics are matched case-insensitively and
/// attendees are keyed by their trimmed name.
#[derive(Clone, Debug)]
pub struct RegistrationDesk {
    inner: Arc<Mutex<Inner>>,
}

impl Default for RegistrationDesk {
    fn default() -> Self {
        Self::with_topics(DEFAULT_TOPICS.iter().copied())
    }
}

impl RegistrationDesk {
    /// Creates a desk offering the given topics.
    pub fn with_topics<I, S>(topics: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let inner = Inner {
            topics: topics.into_iter().map(Into::into).collect(),
            registrations: BTreeMap::new(),
        };
        Self {
            inner: Arc::new(Mutex::new(inner)),
        }
    }

    /// Returns the topic catalog.
    pub fn topics(&self) -> Vec<String> {
        self.lock().topics.clone()
    }

    /// Registers an attendee for a topic.
    pub fn register(
        &self,
        attendee: &str,
        topic: &str,
    ) -> Result<Registration, DeskError> {
        let attendee = attendee_key(attendee)?;
        let mut inner = self.lock();
        let topic = inner.find_topic(topic)?;

        let topics = inner.registrations.entry(attendee.clone()).or_default();
        if topics.contains(&topic) {
            return Ok(Registration::AlreadyRegistered(topic));
        }
        topics.push(topic.clone());
        debug!("registered {attendee} for {topic}");
        Ok(Registration::Added(topic))
    }

    /// Cancels a registration and returns the catalog name of the topic.
    pub fn cancel(
        &self,
        attendee: &str,
        topic: &str,
    ) -> Result<String, DeskError> {
        let attendee = attendee_key(attendee)?;
        let mut inner = self.lock();
        let topic = inner.find_topic(topic)?;

        let topics = inner.registrations.get_mut(&attendee);
        let Some(topics) = topics.filter(|topics| topics.contains(&topic))
        else {
            return Err(DeskError::NotRegistered { attendee, topic });
        };
        topics.retain(|t| t != &topic);
        if topics.is_empty() {
            inner.registrations.remove(&attendee);
        }
        debug!("cancelled {attendee} for {topic}");
        Ok(topic)
    }

    /// Returns the topics an attendee is registered for.
    pub fn registrations(&self, attendee: &str) -> Vec<String> {
        let attendee = attendee.trim();
        self.lock()
            .registrations
            .get(attendee)
            .cloned()
            .unwrap_or_default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Inner {
    fn find_topic(&self, topic: &str) -> Result<String, DeskError> {
        let wanted = topic.trim();
        self.topics
            .iter()
            .find(|t| t.eq_ignore_ascii_case(wanted))
            .cloned()
            .ok_or_else(|| DeskError::UnknownTopic(wanted.to_owned()))
    }
}

fn attendee_key(attendee: &str) -> Result<String, DeskError> {
    let attendee = attendee.trim();
    if attendee.is_empty() {
        return Err(DeskError::MissingAttendee);
    }
    Ok(attendee.to_owned())
}
