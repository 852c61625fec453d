//! Notification hooks an application can register on a [`Connection`](super::connection::Connection)
//! or [`Channel`](super::channel::Channel) for events that are not the direct
//! result of one of its own calls — server-initiated close, an unroutable
//! publish bounced back as `basic.return`, a server-initiated `basic.cancel`.
//! Mirrors the teacher's own callback pattern rather than forcing every such
//! event through the bare `Result` of an unrelated call.

use async_trait::async_trait;

use super::consumer::ReturnedMessage;

#[async_trait]
pub trait ConnectionCallback: Send + Sync {
    /// The broker initiated the close; `reply_code`/`reply_text` would be its
    /// stated reason. Not currently invoked: `Connection::register_callback`
    /// is a documented no-op, since the connection actor has no stored
    /// callback slot of its own (unlike the channel actor's `ChannelCallback`).
    async fn close(&self, reply_code: u16, reply_text: &str) {
        let _ = (reply_code, reply_text);
    }
}

#[async_trait]
pub trait ChannelCallback: Send + Sync {
    /// A mandatory or immediate publish the broker could not route.
    async fn basic_return(&self, returned: ReturnedMessage) {
        let _ = returned;
    }

    /// The broker cancelled a consumer on this channel (e.g. the queue it
    /// was consuming from was deleted).
    async fn basic_cancel(&self, consumer_tag: &str) {
        let _ = consumer_tag;
    }

    /// The broker initiated the channel close.
    async fn close(&self, reply_code: u16, reply_text: &str) {
        let _ = (reply_code, reply_text);
    }
}
