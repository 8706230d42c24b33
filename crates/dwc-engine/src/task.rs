use std::fmt;

/// The three pipeline steps an engine may implement (§4.1, §4.6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Task {
    ImageToText,
    TextToDwc,
    ImageToDwc,
}

impl Task {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Task::ImageToText => "image_to_text",
            Task::TextToDwc => "text_to_dwc",
            Task::ImageToDwc => "image_to_dwc",
        }
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
