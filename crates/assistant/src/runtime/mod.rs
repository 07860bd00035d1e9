pub mod session_lock;
pub mod turn;

pub use session_lock::{ConversationBusy, ConversationLockMap};
pub use turn::{TurnInput, TurnOutcome};
