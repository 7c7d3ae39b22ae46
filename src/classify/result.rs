/// One entry of the classifier's ranked output.
#[derive(Clone, Debug, PartialEq)]
pub struct Category {
    /// Opaque model label (e.g. "0".."5").
    pub label: String,
    /// Confidence score as reported by the model.
    pub score: f32,
}

impl Category {
    pub fn new(label: impl Into<String>, score: f32) -> Self {
        Self {
            label: label.into(),
            score,
        }
    }
}
