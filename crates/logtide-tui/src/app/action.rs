/// All possible actions in the application (command pattern)
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Action {
    Quit,

    // Session control
    Connect,
    Disconnect,
    TogglePause,

    // UI toggles
    ToggleHelp,
    ToggleTimestamps,
    ToggleLocalTime,

    // Log viewer navigation
    ScrollUp(usize),
    ScrollDown(usize),
    ScrollToTop,
    ScrollToBottom,
    PageUp,
    PageDown,

    ExportLogs,

    // Error handling
    DismissError,

    // Render request
    Render,
}
