/// Errors that can occur in the transport layer.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The connection was closed.
    #[error("connection closed: {0}")]
    ConnectionClosed(String),

    /// Sending data failed.
    #[error("send failed: {0}")]
    SendFailed(#[source] std::io::Error),

    /// Receiving data failed.
    #[error("receive failed: {0}")]
    ReceiveFailed(#[source] std::io::Error),

    /// Binding, accepting, or upgrading a connection failed.
    #[error("accept failed: {0}")]
    AcceptFailed(#[source] std::io::Error),
}

#[cfg_attr(not(feature = "websocket"), allow(dead_code))]
impl TransportError {
    /// Wraps a foreign error as a failed send.
    pub(crate) fn send<E>(err: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Self::SendFailed(std::io::Error::new(
            std::io::ErrorKind::BrokenPipe,
            err,
        ))
    }

    /// Wraps a foreign error as a failed receive.
    pub(crate) fn recv<E>(err: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Self::ReceiveFailed(std::io::Error::new(
            std::io::ErrorKind::ConnectionReset,
            err,
        ))
    }
}
