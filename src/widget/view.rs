use crate::chat::ChatMessage;

/// Rendering surface owned by the chat widget: the chat window, its
/// message list, the input controls and the status label. The widget
/// drives it but does not own its initial layout.
pub trait ChatView {
    fn set_visible(&mut self, visible: bool);

    fn set_status(&mut self, status: &str);

    fn append_message(&mut self, message: &ChatMessage);

    /// Empty the message list back to its welcome state.
    fn clear_transcript(&mut self);

    fn set_input_enabled(&mut self, enabled: bool);

    fn clear_input(&mut self);

    fn set_peer_typing(&mut self, typing: bool);

    /// In-place prompt or transient notice, e.g. a validation failure.
    fn notify(&mut self, notice: &str);

    /// Fallback contact details when no agent can take the chat.
    fn show_offline(&mut self, message: &str, email: &str);
}
