pub mod telegram;
pub mod traits;

pub use telegram::{TelegramChannel, TelegramSender};
pub use traits::{ChannelLifecycle, ChannelSender, ChannelStatus};
