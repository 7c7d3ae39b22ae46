use crate::GarbageType;

/// Labels emitted by the garbage classifier, in output-index order.
pub const MODEL_LABELS: [&str; 6] = ["0", "1", "2", "3", "4", "5"];

/// Map an opaque model label onto a domain category.
///
/// The label space is larger than the domain: "0" and "3" both resolve to
/// `Paper`, and every label without an entry falls through to `Organic`.
pub fn garbage_type_for_label(label: &str) -> GarbageType {
    match label {
        "0" => GarbageType::Paper,
        "1" => GarbageType::Glass,
        "2" => GarbageType::Metal,
        "3" => GarbageType::Paper,
        "4" => GarbageType::Plastic,
        _ => GarbageType::Organic,
    }
}
