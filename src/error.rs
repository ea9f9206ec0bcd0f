use thiserror::Error;

/// Input problems caught before anything is sent over the network.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("credential required")]
    MissingCredential,

    #[error("file required")]
    MissingFile,

    #[error("Invalid file type. Please upload a .jpg, .jpeg, or .png file.")]
    UnsupportedMediaType(String),
}

/// Failures of a submitted caption request.
///
/// The `Display` text is what the user sees; transport and parse details are
/// kept for logging only.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CaptionError {
    #[error("Unable to reach the captioning service.")]
    Transport(String),

    #[error("{}", protocol_message(*status, message.as_deref()))]
    Protocol { status: u16, message: Option<String> },

    #[error("The captioning service returned an unreadable response.")]
    Parse(String),
}

impl CaptionError {
    pub fn detail(&self) -> Option<&str> {
        match self {
            CaptionError::Transport(detail) | CaptionError::Parse(detail) => Some(detail),
            CaptionError::Protocol { .. } => None,
        }
    }
}

fn protocol_message(status: u16, message: Option<&str>) -> String {
    match message {
        Some(message) => message.to_string(),
        None => format!("HTTP error {status}"),
    }
}
