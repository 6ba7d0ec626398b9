use thiserror::Error;

/// Local input problems. These never reach the network; the `Display`
/// text is what the widget shows the user.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Please enter your name and email to start a chat.")]
    MissingIdentity,
    #[error("Please enter a name to join as an agent.")]
    MissingAgentName,
}
