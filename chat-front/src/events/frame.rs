//! Wire frames and their data-stream encoding.

use crate::annotation::Annotation;
use crate::error::ChatFrontError;
use serde::Serialize;

/// Header announcing the data-stream protocol version
pub const DATA_STREAM_HEADER: &str = "x-vercel-ai-data-stream";
pub const DATA_STREAM_VERSION: &str = "v1";
pub const DATA_STREAM_CONTENT_TYPE: &str = "text/plain; charset=utf-8";

/// Terminal error indicator
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorFrame {
    pub code: String,
    pub message: String,
}

/// One unit of the response stream.
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    Text(String),
    Annotation(Annotation),
    /// Always the last frame of a failed stream
    Error(ErrorFrame),
}

impl Frame {
    pub fn text(content: impl Into<String>) -> Self {
        Frame::Text(content.into())
    }

    pub fn error(code: impl Into<String>, message: impl Into<String>) -> Self {
        Frame::Error(ErrorFrame {
            code: code.into(),
            message: message.into(),
        })
    }

    pub fn from_error(error: &ChatFrontError) -> Self {
        Self::error(error.error_code(), error.to_string())
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Frame::Error(_))
    }
}

/// Renders frames as newline-delimited data-stream parts:
/// `0:` text, `8:` annotations, `3:` error.
pub struct FrameEncoder;

impl FrameEncoder {
    pub fn encode(frame: &Frame) -> Result<String, serde_json::Error> {
        let line = match frame {
            Frame::Text(text) => format!("0:{}\n", serde_json::to_string(text)?),
            Frame::Annotation(annotation) => {
                format!("8:{}\n", serde_json::to_string(&[annotation])?)
            }
            Frame::Error(error) => {
                let message = format!("[{}] {}", error.code, error.message);
                format!("3:{}\n", serde_json::to_string(&message)?)
            }
        };
        Ok(line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_encode_text() {
        let line = FrameEncoder::encode(&Frame::text("Hi \"there\"\n")).unwrap();
        assert_eq!(line, "0:\"Hi \\\"there\\\"\\n\"\n");
    }

    #[test]
    fn test_encode_annotation() {
        let frame = Frame::Annotation(Annotation::new("agent", json!({"agent": "a", "text": "t"})));
        let line = FrameEncoder::encode(&frame).unwrap();
        assert_eq!(
            line,
            "8:[{\"type\":\"agent\",\"data\":{\"agent\":\"a\",\"text\":\"t\"}}]\n"
        );
    }

    #[test]
    fn test_encode_error() {
        let frame = Frame::from_error(&ChatFrontError::Stream("boom".to_string()));
        assert!(frame.is_error());
        let line = FrameEncoder::encode(&frame).unwrap();
        assert!(line.starts_with("3:\"[STREAM_ERROR] "));
        assert!(line.contains("boom"));
        assert!(line.ends_with("\"\n"));
    }
}
