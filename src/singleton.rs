use once_cell::sync::OnceCell;

/// Initialize-once holder for a handle shared across concurrent callers.
///
/// The first caller to reach `get_or_init` constructs the value; everyone
/// else gets a reference to that same value, including callers racing on
/// first access. A failed fallible construction leaves the holder empty
/// so a later caller can retry.
///
/// Owned by the composition root and handed out by reference rather than
/// living in a process-wide global.
#[derive(Debug, Default)]
pub struct Lazy<T> {
    cell: OnceCell<T>,
}

impl<T> Lazy<T> {
    pub fn new() -> Self {
        Self {
            cell: OnceCell::new(),
        }
    }

    /// Returns the held value if it has been constructed.
    #[allow(dead_code)]
    pub fn get(&self) -> Option<&T> {
        self.cell.get()
    }

    /// Returns the held value, constructing it on first access. `init`
    /// runs at most once across the process lifetime.
    pub fn get_or_init<F>(&self, init: F) -> &T
    where
        F: FnOnce() -> T,
    {
        self.cell.get_or_init(init)
    }

    /// Fallible variant. On error the holder stays empty and construction
    /// can be retried by a subsequent caller.
    #[allow(dead_code)]
    pub fn get_or_try_init<F, E>(&self, init: F) -> Result<&T, E>
    where
        F: FnOnce() -> Result<T, E>,
    {
        self.cell.get_or_try_init(init)
    }
}
