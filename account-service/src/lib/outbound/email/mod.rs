pub mod outbox;
pub mod relay;
pub mod sealing;

pub use outbox::PostgresEmailOutbox;
pub use relay::spawn_outbox_relay;
pub use relay::LogEmailSender;
pub use relay::RelayConfig;
pub use sealing::OutboxCipher;
