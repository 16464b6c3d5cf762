//! Provider-neutral request types for the generative API.

use serde_json::Value;

use super::EncodedImage;

/// One piece of user content.
#[derive(Debug, Clone, PartialEq)]
pub enum Part {
    Text(String),
    Image(EncodedImage),
}

/// A single text-generation request.
///
/// Built with the chained setters:
///
/// ```
/// use kisan_mitra::genai::ContentRequest;
/// use serde_json::json;
///
/// let req = ContentRequest::new("gemini-2.5-flash")
///     .text("How do I treat leaf curl?")
///     .system_instruction("You are an agricultural advisor.")
///     .response_schema(json!({ "type": "OBJECT" }));
/// assert!(req.expects_json());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ContentRequest {
    pub model: String,
    pub parts: Vec<Part>,
    pub system_instruction: Option<String>,
    /// When set, the model is constrained to JSON matching this schema.
    pub response_schema: Option<Value>,
}

impl ContentRequest {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            parts: Vec::new(),
            system_instruction: None,
            response_schema: None,
        }
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.parts.push(Part::Text(text.into()));
        self
    }

    pub fn image(mut self, image: EncodedImage) -> Self {
        self.parts.push(Part::Image(image));
        self
    }

    pub fn system_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.system_instruction = Some(instruction.into());
        self
    }

    pub fn response_schema(mut self, schema: Value) -> Self {
        self.response_schema = Some(schema);
        self
    }

    /// `true` when structured (JSON) output was requested.
    pub fn expects_json(&self) -> bool {
        self.response_schema.is_some()
    }
}

/// A single image-generation request. Always asks for exactly one image.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageRequest {
    pub model: String,
    pub prompt: String,
    pub aspect_ratio: String,
    pub mime_type: String,
}

impl ImageRequest {
    pub fn new(model: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            prompt: prompt.into(),
            aspect_ratio: "16:9".into(),
            mime_type: "image/jpeg".into(),
        }
    }

    pub fn aspect_ratio(mut self, ratio: impl Into<String>) -> Self {
        self.aspect_ratio = ratio.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_request_does_not_expect_json() {
        let req = ContentRequest::new("m").text("hi");
        assert!(!req.expects_json());
        assert_eq!(req.parts, vec![Part::Text("hi".into())]);
        assert!(req.system_instruction.is_none());
    }

    #[test]
    fn parts_keep_insertion_order() {
        let img = EncodedImage::from_bytes("image/jpeg", b"x");
        let req = ContentRequest::new("m").image(img.clone()).text("analyse");
        assert_eq!(req.parts[0], Part::Image(img));
        assert_eq!(req.parts[1], Part::Text("analyse".into()));
    }

    #[test]
    fn image_request_defaults() {
        let req = ImageRequest::new("imagen", "a tomato leaf");
        assert_eq!(req.aspect_ratio, "16:9");
        assert_eq!(req.mime_type, "image/jpeg");
        let req = req.aspect_ratio("1:1");
        assert_eq!(req.aspect_ratio, "1:1");
    }
}
