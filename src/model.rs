use std::{fmt, sync::Arc};

use serde::Serialize;

pub const NO_ALT_TEXT_PLACEHOLDER: &str = "No alt text generated.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestState {
    Idle,
    Validating,
    InFlight,
    Succeeded,
    Failed,
}

impl RequestState {
    pub fn label(&self) -> &'static str {
        match self {
            RequestState::Idle => "Idle",
            RequestState::Validating => "Validating",
            RequestState::InFlight => "InFlight",
            RequestState::Succeeded => "Succeeded",
            RequestState::Failed => "Failed",
        }
    }
}

/// Image media types the caption service accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageMediaType {
    Jpeg,
    Png,
    /// Non-standard `image/jpg`, reported by some platforms for `.jpg` files.
    Jpg,
}

impl ImageMediaType {
    pub const ALLOWED: [ImageMediaType; 3] = [Self::Jpeg, Self::Png, Self::Jpg];

    pub fn parse(declared: &str) -> Option<Self> {
        Self::ALLOWED
            .into_iter()
            .find(|candidate| candidate.as_str() == declared)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ImageMediaType::Jpeg => "image/jpeg",
            ImageMediaType::Png => "image/png",
            ImageMediaType::Jpg => "image/jpg",
        }
    }
}

impl fmt::Display for ImageMediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A file as picked by the user, before any validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileInput {
    pub name: String,
    pub media_type: String,
    pub data: Vec<u8>,
}

impl FileInput {
    pub fn new(name: impl Into<String>, media_type: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            media_type: media_type.into(),
            data,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedFile {
    pub name: String,
    pub media_type: ImageMediaType,
    pub data: Arc<[u8]>,
}

impl SelectedFile {
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubmissionId(pub u64);

impl SubmissionId {
    pub fn next(self) -> Self {
        SubmissionId(self.0 + 1)
    }
}

impl fmt::Display for SubmissionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// What gets sent to the caption service for one submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptionRequest {
    pub credential: String,
    pub file: SelectedFile,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub id: SubmissionId,
    pub request: CaptionRequest,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AltText {
    pub en: Option<String>,
    pub ms: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CaptionResult {
    pub alt_text: Option<AltText>,
}

impl CaptionResult {
    pub fn new(en: Option<&str>, ms: Option<&str>) -> Self {
        Self {
            alt_text: Some(AltText {
                en: en.map(str::to_string),
                ms: ms.map(str::to_string),
            }),
        }
    }

    pub fn missing() -> Self {
        Self { alt_text: None }
    }

    pub fn en(&self) -> Option<&str> {
        self.alt_text.as_ref().and_then(|alt| alt.en.as_deref())
    }

    pub fn ms(&self) -> Option<&str> {
        self.alt_text.as_ref().and_then(|alt| alt.ms.as_deref())
    }

    /// Caption lines as displayed: English then Malay, or the placeholder
    /// when the service produced no alt text at all.
    pub fn display_lines(&self) -> Vec<String> {
        match &self.alt_text {
            Some(alt) => vec![
                alt.en.clone().unwrap_or_default(),
                alt.ms.clone().unwrap_or_default(),
            ],
            None => vec![NO_ALT_TEXT_PLACEHOLDER.to_string()],
        }
    }
}
