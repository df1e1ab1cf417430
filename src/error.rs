/// A codec method was called while the codec was in a state that does
/// not allow it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum PreconditionError {
    #[error("{operation} needs the header to be read or written first")]
    HeaderUnknown { operation: &'static str },
    #[error("{operation} called on a closed file")]
    Closed { operation: &'static str },
}

/// Lifecycle shared by both codecs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum State {
    Opened,
    HeaderKnown,
    Closed,
}

impl State {
    pub(crate) fn ensure_open(self, operation: &'static str) -> Result<(), PreconditionError> {
        match self {
            State::Closed => Err(PreconditionError::Closed { operation }),
            State::Opened | State::HeaderKnown => Ok(()),
        }
    }

    pub(crate) fn ensure_header_known(
        self,
        operation: &'static str,
    ) -> Result<(), PreconditionError> {
        match self {
            State::HeaderKnown => Ok(()),
            State::Opened => Err(PreconditionError::HeaderUnknown { operation }),
            State::Closed => Err(PreconditionError::Closed { operation }),
        }
    }
}
