pub mod controller;
pub mod timer;
pub mod view;

pub use controller::ChatController;
pub use view::ChatView;
