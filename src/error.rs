#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Couldn't start the worker thread of queue '{0}': {1}")]
    QueueSpawn(String, #[source] std::io::Error),

    #[error("Queue '{0}' is closed.")]
    QueueClosed(String),

    #[error("Handler for topic '{expected}' received an event of type '{actual}'")]
    TopicMismatch {
        expected: &'static str,
        actual: &'static str,
    },
}
