//! Thread-local storage for team context
//!
//! The free query functions (`get_thread_num`, `get_num_threads`) read the
//! calling OS thread's ICV view from here. Constructs themselves take the
//! explicit `Thread` context instead.

use omprt_core::IcvView;
use std::cell::Cell;

thread_local! {
    /// View of the team this OS thread is a member of, if any
    static TEAM_VIEW: Cell<Option<IcvView>> = const { Cell::new(None) };
}

/// Restores the previous view when dropped
pub(crate) struct ViewGuard {
    previous: Option<IcvView>,
}

impl Drop for ViewGuard {
    fn drop(&mut self) {
        TEAM_VIEW.with(|cell| cell.set(self.previous));
    }
}

/// Install `view` for the current OS thread until the guard drops
pub(crate) fn enter(view: IcvView) -> ViewGuard {
    let previous = TEAM_VIEW.with(|cell| cell.replace(Some(view)));
    ViewGuard { previous }
}

/// Current view; outside any team this is rank 0 of a team of 1
#[inline]
pub fn current_view() -> IcvView {
    TEAM_VIEW.with(|cell| cell.get()).unwrap_or_else(IcvView::initial)
}

/// Whether the calling OS thread is a member of a running team
#[inline]
pub fn in_team() -> bool {
    TEAM_VIEW.with(|cell| cell.get().is_some())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outside_team() {
        assert!(!in_team());
        assert_eq!(current_view(), IcvView::initial());
    }

    #[test]
    fn test_enter_and_restore() {
        {
            let _outer = enter(IcvView { thread_num: 2, team_size: 4 });
            assert!(in_team());
            assert_eq!(current_view().thread_num, 2);
            {
                let _inner = enter(IcvView { thread_num: 0, team_size: 1 });
                assert_eq!(current_view().team_size, 1);
            }
            assert_eq!(current_view(), IcvView { thread_num: 2, team_size: 4 });
        }
        assert!(!in_team());
    }
}
