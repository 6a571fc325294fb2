use crate::state::AppState;
use crate::toast::ToastEvent;
use crate::AppAction;

#[derive(uniffi::Enum, Clone, Debug)]
pub enum AppUpdate {
    /// Every change ships a full snapshot; hosts reconcile by `rev`.
    FullState(AppState),
}

impl AppUpdate {
    pub fn rev(&self) -> u64 {
        match self {
            AppUpdate::FullState(s) => s.rev,
        }
    }
}

#[derive(Debug)]
pub enum CoreMsg {
    Action(AppAction),
    Internal(Box<InternalEvent>),
    Shutdown,
}

#[derive(Debug)]
pub enum InternalEvent {
    // Arrived on the toast broadcast channel.
    ToastRequested(ToastEvent),
    // A toast's expiry timer fired.
    ToastExpired { id: String },
}
