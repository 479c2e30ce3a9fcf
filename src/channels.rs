//! The ordered set of named acquisition channels.

use std::fmt;

/// Why a [`ChannelSet`] could not be built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelSetError {
    /// No channels were configured; there is nothing to acquire.
    Empty,
    /// The same channel name appeared twice.
    Duplicate(String),
}

impl fmt::Display for ChannelSetError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ChannelSetError::Empty => write!(f, "no channels configured"),
            ChannelSetError::Duplicate(name) => {
                write!(f, "duplicate channel name {:?}", name)
            }
        }
    }
}

impl std::error::Error for ChannelSetError {}

/// Ordered list of unique channel names, fixed once the device is
/// initialized. The position of a name is the position of its value in
/// every raw and normalized sample vector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelSet {
    names: Vec<String>,
}

impl ChannelSet {
    /// Builds the set, rejecting empty or duplicated name lists.
    pub fn new(names: Vec<String>) -> Result<Self, ChannelSetError> {
        if names.is_empty() {
            return Err(ChannelSetError::Empty);
        }
        for (i, name) in names.iter().enumerate() {
            if names[..i].contains(name) {
                return Err(ChannelSetError::Duplicate(name.clone()));
            }
        }
        Ok(ChannelSet { names })
    }

    /// Number of channels; always at least one.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Provided for completeness; a constructed set is never empty.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// The names, in acquisition order.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Position of `name` in the sample vectors, if it is a known channel.
    pub fn index(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }
}
