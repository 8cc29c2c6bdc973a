// Action system for grid interaction
// Keys are mapped to actions first, then the app dispatches them

/// All possible actions that can be triggered while browsing the grid
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    // Navigation actions
    Navigate(NavigateAction),

    // Data operations
    Sort(Option<usize>), // None = selected column
    StartFilter,
    ClearFilter,
    Refresh,

    // Search operations
    StartFind,
    FindNext,

    // View operations
    ToggleLogs,
    ShowHelp,

    // Application control
    Quit,
}

/// Navigation actions with optional counts for vim-style motions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigateAction {
    Up(usize),
    Down(usize),
    Left(usize),
    Right(usize),
    PageUp,
    PageDown,
    Home,
    End,
}

/// Result of dispatching an action
#[derive(Debug, Clone, PartialEq)]
pub enum ActionResult {
    /// Action was handled
    Handled,
    /// Action was not applicable in this context
    NotHandled,
    /// Application should exit
    Exit,
}
