use anyhow::Result;
use sha2::{Digest, Sha256};

use crate::classify::backend::ClassifierBackend;
use crate::classify::labels::MODEL_LABELS;
use crate::classify::result::Category;
use crate::ingest::InputTensor;

/// Stub classifier for testing and the synthetic demo.
///
/// By default it hashes the tensor bytes and turns the digest into a score per
/// model label, so identical tensors always rank identically. A scripted stub
/// replays fixed outputs instead (the last one repeats once the script runs out).
pub struct StubClassifier {
    script: Vec<Vec<Category>>,
    cursor: usize,
}

impl StubClassifier {
    pub fn new() -> Self {
        Self {
            script: Vec::new(),
            cursor: 0,
        }
    }

    pub fn scripted(script: Vec<Vec<Category>>) -> Self {
        Self { script, cursor: 0 }
    }

    fn hashed_scores(tensor: &InputTensor) -> Vec<Category> {
        let digest: [u8; 32] = Sha256::digest(tensor.data()).into();
        let raw: Vec<f32> = MODEL_LABELS
            .iter()
            .enumerate()
            .map(|(i, _)| digest[i] as f32 + 1.0)
            .collect();
        let total: f32 = raw.iter().sum();
        MODEL_LABELS
            .iter()
            .zip(raw)
            .map(|(label, score)| Category::new(*label, score / total))
            .collect()
    }
}

impl Default for StubClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl ClassifierBackend for StubClassifier {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn classify(&mut self, tensor: &InputTensor) -> Result<Vec<Category>> {
        if self.script.is_empty() {
            return Ok(Self::hashed_scores(tensor));
        }
        let index = self.cursor.min(self.script.len() - 1);
        self.cursor = self.cursor.saturating_add(1);
        Ok(self.script[index].clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::QuantParams;

    fn tensor(fill: u8) -> InputTensor {
        InputTensor::new([1, 2, 2, 3], vec![fill; 12], QuantParams::default()).unwrap()
    }

    #[test]
    fn hashed_scores_are_deterministic_and_sum_to_one() -> Result<()> {
        let mut stub = StubClassifier::new();
        let first = stub.classify(&tensor(7))?;
        let second = stub.classify(&tensor(7))?;
        assert_eq!(first, second);
        assert_eq!(first.len(), MODEL_LABELS.len());
        let total: f32 = first.iter().map(|c| c.score).sum();
        assert!((total - 1.0).abs() < 1e-4);
        Ok(())
    }

    #[test]
    fn script_replays_then_repeats_last() -> Result<()> {
        let mut stub = StubClassifier::scripted(vec![
            vec![Category::new("1", 1.0)],
            vec![Category::new("2", 1.0)],
        ]);
        assert_eq!(stub.classify(&tensor(0))?[0].label, "1");
        assert_eq!(stub.classify(&tensor(0))?[0].label, "2");
        assert_eq!(stub.classify(&tensor(0))?[0].label, "2");
        Ok(())
    }
}
