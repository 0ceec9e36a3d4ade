//! Message budgets: one per folder and one for the whole run.

/// Result of asking for permission to fetch one more message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reservation {
    Granted,
    /// The current folder's budget is used up; move on to the next folder.
    FolderExhausted,
    /// The run's budget is used up; stop everything.
    GlobalExhausted,
}

/// Tracks the remaining budgets. `None` means unlimited.
///
/// Counters only ever go down, except the folder budget which is refilled
/// by [`enter_folder`](Self::enter_folder).
#[derive(Debug, Clone)]
pub struct LimitCoordinator {
    folder_limit: Option<u64>,
    folder_remaining: Option<u64>,
    global_remaining: Option<u64>,
}

impl LimitCoordinator {
    pub fn new(folder_limit: Option<u64>, global_limit: Option<u64>) -> Self {
        Self {
            folder_limit,
            folder_remaining: folder_limit,
            global_remaining: global_limit,
        }
    }

    /// Refill the per-folder budget.
    pub fn enter_folder(&mut self) {
        self.folder_remaining = self.folder_limit;
    }

    /// Take one message from both budgets, if both allow it.
    pub fn try_reserve(&mut self) -> Reservation {
        if self.global_remaining == Some(0) {
            return Reservation::GlobalExhausted;
        }
        if self.folder_remaining == Some(0) {
            return Reservation::FolderExhausted;
        }
        if let Some(n) = self.global_remaining.as_mut() {
            *n -= 1;
        }
        if let Some(n) = self.folder_remaining.as_mut() {
            *n -= 1;
        }
        Reservation::Granted
    }

    pub fn global_exhausted(&self) -> bool {
        self.global_remaining == Some(0)
    }
}
