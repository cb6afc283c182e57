pub mod events;
pub mod participant;
pub mod session;

pub use events::{ConferenceErrorKind, ConferenceEvent};
pub use participant::{Participant, ParticipantId};
pub use session::{ConferenceId, ConferenceSession, ListenerId};
